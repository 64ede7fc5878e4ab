use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::scoring::FeatureRow;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("feature column missing: {0}")]
    MissingFeature(String),

    #[error("model produced a non-finite prediction: {0}")]
    NonFinite(f64),

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("invalid model definition: {0}")]
    Definition(String),
}

/// A trained predictor mapping one candidate's features to expected revenue.
///
/// Implementations are owned and loaded outside the engine; the optimizer only
/// calls `predict`.
pub trait RevenueModel: Send + Sync {
    fn name(&self) -> &str {
        "revenue-model"
    }

    fn predict(&self, features: &FeatureRow) -> Result<f64, ModelError>;
}

/// Linear revenue model: `intercept + sum(coefficient * feature)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRevenueModel {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default)]
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
    /// Columns that must be present in every row.
    #[serde(default)]
    pub required_columns: Vec<String>,
}

fn default_model_name() -> String {
    "linear".to_string()
}

impl LinearRevenueModel {
    pub fn new(intercept: f64, coefficients: BTreeMap<String, f64>) -> Self {
        Self {
            name: default_model_name(),
            intercept,
            coefficients,
            required_columns: Vec::new(),
        }
    }

    pub fn from_json(payload: &str) -> Result<Self, ModelError> {
        let model: LinearRevenueModel = serde_json::from_str(payload)
            .map_err(|err| ModelError::Definition(err.to_string()))?;
        if !model.intercept.is_finite() {
            return Err(ModelError::Definition("intercept must be finite".to_string()));
        }
        if let Some((column, _)) = model.coefficients.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ModelError::Definition(format!(
                "coefficient for {} must be finite",
                column
            )));
        }
        Ok(model)
    }
}

impl RevenueModel for LinearRevenueModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureRow) -> Result<f64, ModelError> {
        if let Some(missing) = self
            .required_columns
            .iter()
            .find(|column| !features.contains(column))
        {
            return Err(ModelError::MissingFeature(missing.clone()));
        }

        let prediction = self
            .coefficients
            .iter()
            .fold(self.intercept, |acc, (column, weight)| {
                acc + weight * features.get(column)
            });

        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err(ModelError::NonFinite(prediction))
        }
    }
}
