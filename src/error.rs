use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures that escape the engine. Everything else degrades to a
/// best-effort result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid campaign input: {0}")]
    InputInvalid(String),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InputInvalid(message.into())
    }
}
