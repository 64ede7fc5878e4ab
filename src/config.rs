use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::optimizer::{OptimizerConfig, SamplerKind};
use crate::scoring::HeuristicConfig;
use crate::suggestions::SuggestionPolicy;

const CONFIG_PATH_VAR: &str = "CAMPAIGN_SIM_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub optimizer: OptimizerConfig,
    pub heuristic: HeuristicConfig,
    pub suggestions: SuggestionPolicy,
}

impl EngineConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                Self::from_toml(&contents)?
            }
            _ => EngineConfig::default(),
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = self.to_toml()?;
        std::fs::write(path, payload).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Applies `CAMPAIGN_SIM_*` overrides; unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(seed) = lookup("CAMPAIGN_SIM_SEED") {
            if let Ok(value) = seed.trim().parse::<u64>() {
                self.optimizer.seed = value;
            }
        }
        if let Some(count) = lookup("CAMPAIGN_SIM_CANDIDATES") {
            if let Ok(value) = count.trim().parse::<usize>() {
                self.optimizer.candidate_count = value;
            }
        }
        if let Some(sampler) = lookup("CAMPAIGN_SIM_SAMPLER") {
            if let Some(value) = SamplerKind::from_str(&sampler) {
                self.optimizer.sampler = value;
            }
        }
        if let Some(floor) = lookup("CAMPAIGN_SIM_CONFIDENCE_FLOOR") {
            if let Ok(value) = floor.trim().parse::<f64>() {
                self.optimizer.confidence_floor = value.clamp(0.0, 1.0);
            }
        }
        if let Some(threshold) = lookup("CAMPAIGN_SIM_SUGGESTION_THRESHOLD") {
            if let Ok(value) = threshold.trim().parse::<f64>() {
                if value.is_finite() && value >= 0.0 {
                    self.suggestions.reallocation_threshold = value;
                }
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var(CONFIG_PATH_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_PATH)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [optimizer]
            seed = 7
            sampler = "uniform"

            [suggestions]
            reallocation_threshold = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.optimizer.seed, 7);
        assert_eq!(config.optimizer.sampler, SamplerKind::Uniform);
        assert_eq!(config.optimizer.candidate_count, 500);
        assert_eq!(config.suggestions.reallocation_threshold, 0.1);
        assert_eq!(config.heuristic, HeuristicConfig::default());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let vars: HashMap<&str, &str> = [
            ("CAMPAIGN_SIM_SEED", "99"),
            ("CAMPAIGN_SIM_CANDIDATES", "120"),
            ("CAMPAIGN_SIM_SAMPLER", "fallback"),
            ("CAMPAIGN_SIM_CONFIDENCE_FLOOR", "1.7"),
            ("CAMPAIGN_SIM_SUGGESTION_THRESHOLD", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.optimizer.seed, 99);
        assert_eq!(config.optimizer.candidate_count, 120);
        assert_eq!(config.optimizer.sampler, SamplerKind::Uniform);
        assert_eq!(config.optimizer.confidence_floor, 1.0);
        assert_eq!(config.suggestions.reallocation_threshold, 0.05);
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = EngineConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[optimizer]"));
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = EngineConfig::from_toml("[optimizer\nseed = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
