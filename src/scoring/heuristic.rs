use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::optimizer::candidates::{scale_to_budget, Candidate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Static channel weights: search intent first, then visual/video, then niche.
    pub weights: BTreeMap<String, f64>,
    pub youth_age_cutoff: f64,
    pub youth_shift: f64,
    pub youth_boost_channels: Vec<String>,
    pub youth_cut_channels: Vec<String>,
    pub revenue_multiplier: f64,
    /// Fraction, `1.5` meaning 150%.
    pub predicted_roi: f64,
    pub confidence: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        let weights = [
            ("google-ads", 0.30),
            ("facebook", 0.25),
            ("instagram", 0.20),
            ("youtube", 0.15),
            ("linkedin", 0.05),
            ("tiktok", 0.05),
        ]
        .into_iter()
        .map(|(channel, weight)| (channel.to_string(), weight))
        .collect();

        Self {
            weights,
            youth_age_cutoff: 30.0,
            youth_shift: 0.1,
            youth_boost_channels: vec!["tiktok".to_string(), "instagram".to_string()],
            youth_cut_channels: vec!["facebook".to_string(), "google-ads".to_string()],
            revenue_multiplier: 2.5,
            predicted_roi: 1.5,
            confidence: 0.6,
        }
    }
}

/// Rule-based allocation used when no revenue model can score candidates.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    config: HeuristicConfig,
}

impl HeuristicScorer {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Normalized weights over `channels`, shifted toward younger-skewing
    /// channels when the audience is young.
    pub fn channel_weights(&self, channels: &[String], average_age: f64) -> Vec<(String, f64)> {
        let young = average_age < self.config.youth_age_cutoff;
        let raw: Vec<(String, f64)> = channels
            .iter()
            .map(|channel| {
                let mut weight = self.config.weights.get(channel).copied().unwrap_or(0.0);
                if young {
                    if self.config.youth_boost_channels.contains(channel) {
                        weight += self.config.youth_shift;
                    }
                    if self.config.youth_cut_channels.contains(channel) {
                        weight -= self.config.youth_shift;
                    }
                }
                (channel.clone(), weight.max(0.0))
            })
            .collect();

        let sum: f64 = raw.iter().map(|(_, weight)| weight).sum();
        if sum <= 0.0 {
            let even = 1.0 / raw.len().max(1) as f64;
            return raw.into_iter().map(|(channel, _)| (channel, even)).collect();
        }
        raw.into_iter()
            .map(|(channel, weight)| (channel, weight / sum))
            .collect()
    }

    pub fn allocate(&self, total_budget: f64, channels: &[String], average_age: f64) -> Candidate {
        let weights = self.channel_weights(channels, average_age);
        scale_to_budget(
            total_budget,
            weights.iter().map(|(channel, weight)| (channel.as_str(), *weight)),
        )
    }

    pub fn predicted_revenue(&self, total_budget: f64) -> f64 {
        total_budget * self.config.revenue_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::MODEL_CHANNELS;

    fn model_channels() -> Vec<String> {
        MODEL_CHANNELS.iter().map(|channel| channel.to_string()).collect()
    }

    #[test]
    fn default_weights_favor_search() {
        let scorer = HeuristicScorer::new(HeuristicConfig::default());
        let split = scorer.allocate(1000.0, &model_channels(), 40.0);
        assert!((split.amount("google-ads") - 300.0).abs() < 1e-9);
        assert!((split.amount("tiktok") - 50.0).abs() < 1e-9);
        assert!((split.total() - 1000.0).abs() <= 0.01);
    }

    #[test]
    fn young_audiences_shift_toward_short_video() {
        let scorer = HeuristicScorer::new(HeuristicConfig::default());
        let split = scorer.allocate(1000.0, &model_channels(), 24.0);
        assert!((split.amount("tiktok") - 150.0).abs() < 1e-9);
        assert!((split.amount("instagram") - 300.0).abs() < 1e-9);
        assert!((split.amount("facebook") - 150.0).abs() < 1e-9);
        assert!((split.amount("google-ads") - 200.0).abs() < 1e-9);
    }

    #[test]
    fn weights_renormalize_over_a_subset() {
        let scorer = HeuristicScorer::new(HeuristicConfig::default());
        let channels = vec!["google-ads".to_string(), "facebook".to_string()];
        let weights = scorer.channel_weights(&channels, 40.0);
        let total: f64 = weights.iter().map(|(_, weight)| weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(weights[0].1 > weights[1].1);
    }
}
