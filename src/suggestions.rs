//! Turns the gap between the baseline plan and the optimizer's recommendation
//! into actionable suggestions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::campaign::Campaign;
use crate::optimizer::OptimizationResult;
use crate::round_cents;
use crate::scoring::ScoringSource;
use crate::simulator::SimulationResult;

/// Declaration order is presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    BudgetReallocation,
    ChannelAddition,
    CreativeImprovement,
}

impl SuggestionKind {
    pub fn label(self) -> &'static str {
        match self {
            SuggestionKind::BudgetReallocation => "budget_reallocation",
            SuggestionKind::ChannelAddition => "channel_addition",
            SuggestionKind::CreativeImprovement => "creative_improvement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestionImpact {
    pub roi_increase: f64,
    pub reach_increase: f64,
    pub conversion_increase: f64,
}

impl SuggestionImpact {
    const fn fixed(roi_increase: f64, reach_increase: f64, conversion_increase: f64) -> Self {
        Self {
            roi_increase,
            reach_increase,
            conversion_increase,
        }
    }
}

const REALLOCATION_IMPACT: SuggestionImpact = SuggestionImpact::fixed(15.0, 8.0, 12.0);
const HIGH_INTENT_IMPACT: SuggestionImpact = SuggestionImpact::fixed(12.0, 25.0, 18.0);
const RETENTION_IMPACT: SuggestionImpact = SuggestionImpact::fixed(22.0, 5.0, 15.0);
const CREATIVE_IMPACT: SuggestionImpact = SuggestionImpact::fixed(15.0, 10.0, 12.0);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SuggestionChanges {
    pub from_channel: Option<String>,
    pub to_channel: Option<String>,
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creative_changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub impact: SuggestionImpact,
    pub changes: SuggestionChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionPolicy {
    /// Minimum |delta| as a share of total budget before a channel is flagged.
    pub reallocation_threshold: f64,
    pub reach_lift: f64,
    pub conversion_lift: f64,
    /// ROI points the best channel must lead the worst by.
    pub roi_gap_points: f64,
    pub shift_fraction: f64,
    pub high_intent_channel: String,
    pub high_intent_min_budget: f64,
    pub high_intent_share: f64,
    pub retention_channel: String,
    pub retention_min_price: f64,
    pub retention_share: f64,
    pub creative_score_floor: f64,
}

impl Default for SuggestionPolicy {
    fn default() -> Self {
        Self {
            reallocation_threshold: 0.05,
            reach_lift: 10.0,
            conversion_lift: 8.0,
            roi_gap_points: 50.0,
            shift_fraction: 0.3,
            high_intent_channel: "google-ads".to_string(),
            high_intent_min_budget: 500.0,
            high_intent_share: 0.25,
            retention_channel: "email".to_string(),
            retention_min_price: 50.0,
            retention_share: 0.15,
            creative_score_floor: 60.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionGenerator {
    policy: SuggestionPolicy,
}

impl SuggestionGenerator {
    pub fn new(policy: SuggestionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SuggestionPolicy {
        &self.policy
    }

    pub fn generate(
        &self,
        campaign: &Campaign,
        baseline: &SimulationResult,
        optimization: &OptimizationResult,
    ) -> Vec<OptimizationSuggestion> {
        let mut suggestions = match optimization.source {
            ScoringSource::Model => {
                self.reallocations_from_recommendation(campaign, baseline, optimization)
            }
            ScoringSource::Heuristic => Vec::new(),
        };
        if suggestions.is_empty() {
            suggestions = self.compare_channels(campaign, baseline);
        }
        suggestions.extend(self.creative_review(campaign));

        // Stable: order within a kind is preserved.
        suggestions.sort_by_key(|suggestion| suggestion.kind);
        debug!(campaign = %campaign.id, count = suggestions.len(), "suggestions generated");
        suggestions
    }

    /// Flags channels whose recommended amount moves by more than the
    /// threshold share of the budget.
    pub fn reallocations_from_recommendation(
        &self,
        campaign: &Campaign,
        baseline: &SimulationResult,
        optimization: &OptimizationResult,
    ) -> Vec<OptimizationSuggestion> {
        let total = campaign.budget.total;
        if total <= 0.0 {
            return Vec::new();
        }
        let current = current_allocation(campaign, baseline);
        let threshold = total * self.policy.reallocation_threshold;

        optimization
            .recommended_split
            .iter()
            .filter_map(|(channel, recommended)| {
                let delta = recommended - current.get(channel).copied().unwrap_or(0.0);
                if delta.abs() <= threshold {
                    return None;
                }
                let share = delta.abs() / total;
                let increase = delta > 0.0;
                let amount = round_cents(delta.abs());

                Some(OptimizationSuggestion {
                    kind: SuggestionKind::BudgetReallocation,
                    title: format!(
                        "{} {} budget",
                        if increase { "Increase" } else { "Decrease" },
                        channel
                    ),
                    description: format!(
                        "{} budget allocation {} {} by ${:.2}",
                        if increase { "Increase" } else { "Reduce" },
                        if increase { "to" } else { "from" },
                        channel,
                        amount
                    ),
                    impact: SuggestionImpact {
                        roi_increase: optimization.display_roi() * 100.0 * share,
                        reach_increase: self.policy.reach_lift * share,
                        conversion_increase: self.policy.conversion_lift * share,
                    },
                    changes: SuggestionChanges {
                        from_channel: (!increase).then(|| channel.clone()),
                        to_channel: increase.then(|| channel.clone()),
                        amount: Some(amount),
                        creative_changes: Vec::new(),
                    },
                })
            })
            .collect()
    }

    /// Rule-based comparator over the realized baseline: shift spend from the
    /// weakest channel to the strongest and recommend missing proven channels.
    pub fn compare_channels(
        &self,
        campaign: &Campaign,
        baseline: &SimulationResult,
    ) -> Vec<OptimizationSuggestion> {
        let mut suggestions = Vec::new();

        let mut ranked: Vec<(&String, f64, f64)> = baseline
            .channel_breakdown
            .iter()
            .map(|(channel, metrics)| (channel, metrics.roi, metrics.spend))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        if let (Some(best), Some(worst)) = (ranked.first(), ranked.last()) {
            if ranked.len() >= 2 && best.1 > worst.1 + self.policy.roi_gap_points {
                let percent = self.policy.shift_fraction * 100.0;
                suggestions.push(OptimizationSuggestion {
                    kind: SuggestionKind::BudgetReallocation,
                    title: "Reallocate budget to high-performing channels".to_string(),
                    description: format!(
                        "Move {:.0}% of budget from {} to {} for better ROI",
                        percent, worst.0, best.0
                    ),
                    impact: REALLOCATION_IMPACT,
                    changes: SuggestionChanges {
                        from_channel: Some(worst.0.clone()),
                        to_channel: Some(best.0.clone()),
                        amount: Some(round_cents(worst.2 * self.policy.shift_fraction)),
                        creative_changes: Vec::new(),
                    },
                });
            }
        }

        let mix = current_mix(campaign, baseline);
        let total = campaign.budget.total;

        let high_intent = &self.policy.high_intent_channel;
        if !mix.contains(high_intent.as_str()) && total > self.policy.high_intent_min_budget {
            suggestions.push(OptimizationSuggestion {
                kind: SuggestionKind::ChannelAddition,
                title: format!("Add {} for high-intent reach", high_intent),
                description: format!(
                    "{} typically brings high-intent traffic with strong conversion rates",
                    high_intent
                ),
                impact: HIGH_INTENT_IMPACT,
                changes: SuggestionChanges {
                    from_channel: None,
                    to_channel: Some(high_intent.clone()),
                    amount: Some(round_cents(total * self.policy.high_intent_share)),
                    creative_changes: Vec::new(),
                },
            });
        }

        let retention = &self.policy.retention_channel;
        if !mix.contains(retention.as_str())
            && campaign.product.price > self.policy.retention_min_price
        {
            suggestions.push(OptimizationSuggestion {
                kind: SuggestionKind::ChannelAddition,
                title: format!("Add {} for repeat purchases", retention),
                description: format!(
                    "{} has the highest ROI of any channel and suits higher-value products",
                    retention
                ),
                impact: RETENTION_IMPACT,
                changes: SuggestionChanges {
                    from_channel: None,
                    to_channel: Some(retention.clone()),
                    amount: Some(round_cents(total * self.policy.retention_share)),
                    creative_changes: Vec::new(),
                },
            });
        }

        suggestions
    }

    fn creative_review(&self, campaign: &Campaign) -> Option<OptimizationSuggestion> {
        let average = campaign.scored_creative_average()?;
        if average >= self.policy.creative_score_floor {
            return None;
        }

        Some(OptimizationSuggestion {
            kind: SuggestionKind::CreativeImprovement,
            title: "Improve creative quality".to_string(),
            description: format!(
                "Creatives average {:.0}/100; A/B test new variants before scaling spend",
                average
            ),
            impact: CREATIVE_IMPACT,
            changes: SuggestionChanges {
                creative_changes: vec![
                    "Test different headlines".to_string(),
                    "Make the call-to-action more specific".to_string(),
                    "Lead with the strongest product benefit".to_string(),
                ],
                ..SuggestionChanges::default()
            },
        })
    }
}

/// The campaign's own split when it has one, otherwise the simulated spend.
fn current_allocation(campaign: &Campaign, baseline: &SimulationResult) -> BTreeMap<String, f64> {
    if !campaign.budget.channels.is_empty() {
        return campaign.budget.channels.clone();
    }
    baseline
        .channel_breakdown
        .iter()
        .map(|(channel, metrics)| (channel.clone(), metrics.spend))
        .collect()
}

fn current_mix<'a>(campaign: &'a Campaign, baseline: &'a SimulationResult) -> BTreeSet<&'a str> {
    let funded = campaign
        .budget
        .channels
        .iter()
        .filter(|(_, amount)| **amount > 0.0)
        .map(|(channel, _)| channel.as_str());
    let simulated = baseline
        .channel_breakdown
        .iter()
        .filter(|(_, metrics)| metrics.spend > 0.0)
        .map(|(channel, _)| channel.as_str());
    funded.chain(simulated).collect()
}
