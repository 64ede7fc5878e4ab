pub mod features;
pub mod heuristic;
pub mod model;

pub use features::{build_feature_row, FeatureContext, FeatureRow};
pub use heuristic::{HeuristicConfig, HeuristicScorer};
pub use model::{LinearRevenueModel, ModelError, RevenueModel};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::optimizer::candidates::Candidate;

/// Which tier produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringSource {
    Model,
    Heuristic,
}

impl ScoringSource {
    pub fn label(self) -> &'static str {
        match self {
            ScoringSource::Model => "model",
            ScoringSource::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Raw model output; may be negative.
    pub predicted_revenue: f64,
    /// Fraction of budget, `(revenue - budget) / budget`.
    pub predicted_roi: f64,
}

/// Scoring capability chosen once when the optimizer is built.
#[derive(Clone)]
pub enum AllocationScorer {
    ModelBacked(Arc<dyn RevenueModel>),
    Heuristic,
}

impl AllocationScorer {
    pub fn from_model(model: Option<Arc<dyn RevenueModel>>) -> Self {
        match model {
            Some(model) => AllocationScorer::ModelBacked(model),
            None => AllocationScorer::Heuristic,
        }
    }

    pub fn model_backed(model: impl RevenueModel + 'static) -> Self {
        AllocationScorer::ModelBacked(Arc::new(model))
    }

    pub fn source(&self) -> ScoringSource {
        match self {
            AllocationScorer::ModelBacked(_) => ScoringSource::Model,
            AllocationScorer::Heuristic => ScoringSource::Heuristic,
        }
    }

    pub fn label(&self) -> String {
        match self {
            AllocationScorer::ModelBacked(model) => format!("model ({})", model.name()),
            AllocationScorer::Heuristic => "heuristic".to_string(),
        }
    }
}

impl fmt::Debug for AllocationScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Scores each candidate with the model. Candidates the model fails on are
/// dropped; the caller decides what an empty result means.
pub fn score_with_model(
    model: &dyn RevenueModel,
    context: &FeatureContext,
    candidates: Vec<Candidate>,
) -> Vec<ScoredCandidate> {
    let budget = context.total_budget;
    let mut scored = Vec::with_capacity(candidates.len());

    for (idx, candidate) in candidates.into_iter().enumerate() {
        let row = build_feature_row(context, &candidate.split);
        let revenue = match model.predict(&row) {
            Ok(value) if value.is_finite() => value,
            Ok(value) => {
                warn!(candidate = idx, model = model.name(), "dropping candidate: non-finite revenue {}", value);
                continue;
            }
            Err(err) => {
                warn!(candidate = idx, model = model.name(), error = %err, "dropping candidate");
                continue;
            }
        };

        scored.push(ScoredCandidate {
            candidate,
            predicted_revenue: revenue,
            predicted_roi: (revenue - budget) / budget,
        });
    }

    scored
}
