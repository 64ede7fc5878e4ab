use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// Allocations reconcile to their stated total within one cent.
pub const CENT_TOLERANCE: f64 = 0.01;

const UNSCORED_CREATIVE: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[serde(alias = "man", alias = "men")]
    Male,
    #[serde(alias = "woman", alias = "women")]
    Female,
    #[default]
    #[serde(alias = "any")]
    All,
}

impl Gender {
    /// Category label the revenue model was trained with.
    pub fn model_label(self) -> &'static str {
        match self {
            Gender::Male => "man",
            Gender::Female => "woman",
            Gender::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeTier {
    Low,
    #[serde(alias = "mid")]
    Medium,
    High,
    #[default]
    #[serde(alias = "any")]
    All,
}

impl IncomeTier {
    /// The model only distinguishes low from everything else.
    pub fn model_label(self) -> &'static str {
        match self {
            IncomeTier::Low => "low",
            IncomeTier::Medium | IncomeTier::High | IncomeTier::All => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn average(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self { min: 25, max: 45 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetingProfile {
    #[serde(default)]
    pub age_range: AgeRange,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub income: IncomeTier,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProfile {
    #[serde(default)]
    pub name: String,
    pub category: String,
    /// Average order value.
    pub price: f64,
    /// Percent, e.g. `30.0` for a 30% margin.
    #[serde(default)]
    pub target_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub total: f64,
    pub duration_days: u32,
    /// Current per-channel split. Empty when the campaign has none yet.
    #[serde(default)]
    pub channels: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelPreferences {
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub avoided: Vec<String>,
}

impl ChannelPreferences {
    pub fn avoids(&self, channel: &str) -> bool {
        self.avoided.iter().any(|avoided| avoided == channel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creative {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel: String,
    /// Overall score on a 0..=100 scale, when one has been computed.
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub product: ProductProfile,
    #[serde(default)]
    pub targeting: TargetingProfile,
    pub budget: BudgetAllocation,
    #[serde(default)]
    pub channels: ChannelPreferences,
    #[serde(default)]
    pub creatives: Vec<Creative>,
}

impl Campaign {
    pub fn validate(&self) -> EngineResult<()> {
        let budget = &self.budget;
        if !budget.total.is_finite() || budget.total < 0.0 {
            return Err(EngineError::invalid(format!(
                "total budget must be a non-negative amount, got {}",
                budget.total
            )));
        }
        if budget.duration_days == 0 {
            return Err(EngineError::invalid("duration must be at least one day"));
        }

        let mut allocated = 0.0;
        for (channel, amount) in &budget.channels {
            if !amount.is_finite() || *amount < 0.0 {
                return Err(EngineError::invalid(format!(
                    "allocation for {} must be non-negative, got {}",
                    channel, amount
                )));
            }
            allocated += amount;
        }
        if !budget.channels.is_empty() && (allocated - budget.total).abs() > CENT_TOLERANCE {
            return Err(EngineError::invalid(format!(
                "channel allocations sum to {:.2} but the total budget is {:.2}",
                allocated, budget.total
            )));
        }

        let age = &self.targeting.age_range;
        if age.min >= age.max {
            return Err(EngineError::invalid(format!(
                "age range minimum ({}) must be below maximum ({})",
                age.min, age.max
            )));
        }

        if !self.product.price.is_finite() || self.product.price < 0.0 {
            return Err(EngineError::invalid(format!(
                "product price must be non-negative, got {}",
                self.product.price
            )));
        }
        if !self.product.target_margin.is_finite() {
            return Err(EngineError::invalid("target margin must be a finite number"));
        }

        for creative in &self.creatives {
            if let Some(score) = creative.score {
                if !(0.0..=100.0).contains(&score) {
                    return Err(EngineError::invalid(format!(
                        "creative score must be within 0..=100, got {}",
                        score
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn average_age(&self) -> f64 {
        self.targeting.age_range.average()
    }

    /// Mean creative score scaled to 0..1; `default` when there are no creatives.
    pub fn creative_quality(&self, default: f64) -> f64 {
        if self.creatives.is_empty() {
            return default;
        }
        let total: f64 = self
            .creatives
            .iter()
            .map(|creative| creative.score.unwrap_or(UNSCORED_CREATIVE))
            .sum();
        total / self.creatives.len() as f64 / 100.0
    }

    /// Mean of the creatives that carry a score, if any do.
    pub fn scored_creative_average(&self) -> Option<f64> {
        let scores: Vec<f64> = self.creatives.iter().filter_map(|c| c.score).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

/// Stable identifier for campaign records that arrive without one.
pub fn derive_campaign_id(name: &str) -> String {
    format!("campaign_{:x}", stable_hash64(name.trim()))
}

fn stable_hash64(value: &str) -> u64 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
