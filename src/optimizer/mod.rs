pub mod candidates;

pub use candidates::{Candidate, CandidateGenerator, SamplerKind};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::campaign::Campaign;
use crate::channels::MODEL_CHANNELS;
use crate::error::EngineResult;
use crate::scoring::{
    score_with_model, AllocationScorer, FeatureContext, HeuristicConfig, HeuristicScorer,
    RevenueModel, ScoredCandidate, ScoringSource,
};
use crate::{round_cents, round_to};

const UNPROFITABLE_WARNING: &str =
    "Model predicts this campaign may be unprofitable under the given inputs.";
const RULE_BASED_WARNING: &str =
    "Using rule-based optimization (campaign revenue model not available).";
const MODEL_FAILED_WARNING: &str =
    "Using rule-based optimization (revenue model could not score any candidate).";
const NO_CHANNELS_WARNING: &str = "No optimizable channels remain after exclusions.";
const NO_BUDGET_WARNING: &str = "Total budget is zero; nothing to allocate.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub candidate_count: usize,
    pub seed: u64,
    pub sampler: SamplerKind,
    /// Candidate cap for the uniform sampler.
    pub fallback_cap: usize,
    pub confidence_floor: f64,
    pub confidence_top_k: usize,
    pub default_creative_quality: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            candidate_count: 500,
            seed: 42,
            sampler: SamplerKind::Dirichlet,
            fallback_cap: 50,
            confidence_floor: 0.5,
            confidence_top_k: 5,
            default_creative_quality: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub recommended_split: BTreeMap<String, f64>,
    pub predicted_revenue: f64,
    /// Raw fraction; may be negative, in which case `warning` is set.
    pub predicted_roi: f64,
    pub confidence_score: f64,
    pub warning: Option<String>,
    pub source: ScoringSource,
    pub candidates_scored: usize,
}

impl OptimizationResult {
    /// Predicted ROI floored at zero for presentation.
    pub fn display_roi(&self) -> f64 {
        self.predicted_roi.max(0.0)
    }

    pub fn is_profitable(&self) -> bool {
        self.predicted_roi >= 0.0
    }

    fn degenerate(split: BTreeMap<String, f64>, warning: &str, source: ScoringSource) -> Self {
        Self {
            recommended_split: split,
            predicted_revenue: 0.0,
            predicted_roi: 0.0,
            confidence_score: 0.0,
            warning: Some(warning.to_string()),
            source,
            candidates_scored: 0,
        }
    }
}

/// Random-search budget optimizer over the model's channel set.
#[derive(Debug, Clone)]
pub struct Optimizer {
    config: OptimizerConfig,
    scorer: AllocationScorer,
    heuristic: HeuristicScorer,
    generator: CandidateGenerator,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig, heuristic: HeuristicConfig, scorer: AllocationScorer) -> Self {
        let generator = CandidateGenerator::new(config.sampler, config.fallback_cap);
        Self {
            config,
            scorer,
            heuristic: HeuristicScorer::new(heuristic),
            generator,
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn scorer(&self) -> &AllocationScorer {
        &self.scorer
    }

    pub fn optimize(&self, campaign: &Campaign) -> EngineResult<OptimizationResult> {
        self.optimize_with_seed(campaign, self.config.seed)
    }

    pub fn optimize_with_seed(
        &self,
        campaign: &Campaign,
        seed: u64,
    ) -> EngineResult<OptimizationResult> {
        campaign.validate()?;
        let channels = optimization_channels(campaign);
        let total = campaign.budget.total;

        if channels.is_empty() {
            return Ok(OptimizationResult::degenerate(
                BTreeMap::new(),
                NO_CHANNELS_WARNING,
                self.scorer.source(),
            ));
        }
        if total <= 0.0 {
            let split = channels.iter().map(|channel| (channel.clone(), 0.0)).collect();
            return Ok(OptimizationResult::degenerate(
                split,
                NO_BUDGET_WARNING,
                self.scorer.source(),
            ));
        }

        let result = match &self.scorer {
            AllocationScorer::ModelBacked(model) => self
                .optimize_with_model(model.as_ref(), campaign, &channels, seed)
                .unwrap_or_else(|| {
                    warn!(campaign = %campaign.id, "revenue model failed on every candidate, using rules");
                    self.optimize_with_rules(campaign, &channels, MODEL_FAILED_WARNING)
                }),
            AllocationScorer::Heuristic => {
                self.optimize_with_rules(campaign, &channels, RULE_BASED_WARNING)
            }
        };

        debug!(
            campaign = %campaign.id,
            source = result.source.label(),
            roi = result.predicted_roi,
            confidence = result.confidence_score,
            "optimization complete"
        );
        Ok(result)
    }

    fn optimize_with_model(
        &self,
        model: &dyn RevenueModel,
        campaign: &Campaign,
        channels: &[String],
        seed: u64,
    ) -> Option<OptimizationResult> {
        let total = campaign.budget.total;
        let candidates =
            self.generator
                .generate(total, channels, self.config.candidate_count, seed);
        let generated = candidates.len();
        let context = FeatureContext::from_campaign(campaign, self.config.default_creative_quality);
        let mut scored = score_with_model(model, &context, candidates);

        if scored.len() < generated {
            warn!(
                campaign = %campaign.id,
                dropped = generated - scored.len(),
                generated,
                "some candidates could not be scored"
            );
        }
        if scored.is_empty() {
            return None;
        }

        rank_by_roi(&mut scored);
        let top: Vec<f64> = scored
            .iter()
            .take(self.config.confidence_top_k.max(1))
            .map(|entry| entry.predicted_roi)
            .collect();
        let confidence = confidence_from_spread(&top, self.config.confidence_floor);
        let candidates_scored = scored.len();
        let best = scored.swap_remove(0);

        let warning = if best.predicted_roi < 0.0 {
            Some(UNPROFITABLE_WARNING.to_string())
        } else {
            None
        };

        Some(OptimizationResult {
            recommended_split: best.candidate.split,
            predicted_revenue: round_cents(best.predicted_revenue.max(0.0)),
            predicted_roi: round_to(best.predicted_roi, 4),
            confidence_score: confidence,
            warning,
            source: ScoringSource::Model,
            candidates_scored,
        })
    }

    fn optimize_with_rules(
        &self,
        campaign: &Campaign,
        channels: &[String],
        warning: &str,
    ) -> OptimizationResult {
        info!(campaign = %campaign.id, "rule-based budget optimization active");
        let total = campaign.budget.total;
        let config = self.heuristic.config();
        let split = self.heuristic.allocate(total, channels, campaign.average_age());

        OptimizationResult {
            recommended_split: split.split,
            predicted_revenue: round_cents(self.heuristic.predicted_revenue(total)),
            predicted_roi: config.predicted_roi,
            confidence_score: config.confidence.clamp(0.0, 1.0),
            warning: Some(warning.to_string()),
            source: ScoringSource::Heuristic,
            candidates_scored: 0,
        }
    }
}

/// Model channels the campaign does not explicitly avoid.
pub fn optimization_channels(campaign: &Campaign) -> Vec<String> {
    MODEL_CHANNELS
        .iter()
        .filter(|channel| !campaign.channels.avoids(channel))
        .map(|channel| channel.to_string())
        .collect()
}

/// Highest predicted ROI first; ties keep generation order.
fn rank_by_roi(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| {
        b.predicted_roi
            .partial_cmp(&a.predicted_roi)
            .unwrap_or(Ordering::Equal)
    });
}

/// Agreement among the top candidates: `1 - 2 * stddev`, held within
/// `[floor, 1]` and rounded to two decimals.
pub fn confidence_from_spread(top_rois: &[f64], floor: f64) -> f64 {
    let floor = floor.clamp(0.0, 1.0);
    if top_rois.is_empty() {
        return floor;
    }
    let mean = top_rois.iter().sum::<f64>() / top_rois.len() as f64;
    let variance = top_rois
        .iter()
        .map(|roi| (roi - mean).powi(2))
        .sum::<f64>()
        / top_rois.len() as f64;
    let raw = 1.0 - 2.0 * variance.sqrt();
    round_to(raw.clamp(floor, 1.0), 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_top_candidates_give_high_confidence() {
        let confidence = confidence_from_spread(&[1.20, 1.20, 1.19, 1.19, 1.18], 0.5);
        assert!(confidence >= 0.98 && confidence <= 1.0);
    }

    #[test]
    fn dispersed_top_candidates_hit_the_floor() {
        assert_eq!(confidence_from_spread(&[3.0, 1.0, -1.0, -2.0, 0.5], 0.5), 0.5);
        assert_eq!(confidence_from_spread(&[3.0, -3.0], 0.35), 0.35);
    }

    #[test]
    fn single_candidate_is_fully_confident() {
        assert_eq!(confidence_from_spread(&[0.4], 0.5), 1.0);
    }

    #[test]
    fn ranking_is_descending() {
        let mut scored: Vec<ScoredCandidate> = [0.2, 1.4, -0.3]
            .iter()
            .map(|roi| ScoredCandidate {
                candidate: Candidate {
                    split: BTreeMap::new(),
                },
                predicted_revenue: 0.0,
                predicted_roi: *roi,
            })
            .collect();
        rank_by_roi(&mut scored);
        let order: Vec<f64> = scored.iter().map(|s| s.predicted_roi).collect();
        assert_eq!(order, vec![1.4, 0.2, -0.3]);
    }
}
