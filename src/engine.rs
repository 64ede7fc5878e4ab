use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::campaign::Campaign;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::optimizer::{OptimizationResult, Optimizer};
use crate::scoring::AllocationScorer;
use crate::simulator::{simulate_allocation, simulate_campaign, SimulationResult};
use crate::suggestions::{OptimizationSuggestion, SuggestionGenerator};

/// Baseline projection, recommendation, and the suggestions bridging them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPlan {
    pub baseline: SimulationResult,
    pub optimization: OptimizationResult,
    /// The recommended split run back through the simulator.
    pub projected: SimulationResult,
    pub suggestions: Vec<OptimizationSuggestion>,
}

/// Bundles the simulator, optimizer and suggestion generator behind one
/// configuration.
#[derive(Debug, Clone)]
pub struct CampaignEngine {
    optimizer: Optimizer,
    suggestions: SuggestionGenerator,
}

impl CampaignEngine {
    pub fn new(config: &EngineConfig, scorer: AllocationScorer) -> Self {
        Self {
            optimizer: Optimizer::new(config.optimizer.clone(), config.heuristic.clone(), scorer),
            suggestions: SuggestionGenerator::new(config.suggestions.clone()),
        }
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn simulate(&self, campaign: &Campaign) -> EngineResult<SimulationResult> {
        simulate_campaign(campaign)
    }

    pub fn optimize(&self, campaign: &Campaign) -> EngineResult<OptimizationResult> {
        self.optimizer.optimize(campaign)
    }

    pub fn optimize_with_seed(
        &self,
        campaign: &Campaign,
        seed: u64,
    ) -> EngineResult<OptimizationResult> {
        self.optimizer.optimize_with_seed(campaign, seed)
    }

    pub fn suggest(
        &self,
        campaign: &Campaign,
        baseline: &SimulationResult,
        optimization: &OptimizationResult,
    ) -> Vec<OptimizationSuggestion> {
        self.suggestions.generate(campaign, baseline, optimization)
    }

    pub fn plan(&self, campaign: &Campaign) -> EngineResult<CampaignPlan> {
        let baseline = simulate_campaign(campaign)?;
        let optimization = self.optimizer.optimize(campaign)?;
        let projected = simulate_allocation(campaign, &optimization.recommended_split)?;
        let suggestions = self.suggestions.generate(campaign, &baseline, &optimization);

        debug!(
            campaign = %campaign.id,
            baseline_roi = baseline.metrics.estimated_roi,
            projected_roi = projected.metrics.estimated_roi,
            suggestions = suggestions.len(),
            "plan assembled"
        );

        Ok(CampaignPlan {
            baseline,
            optimization,
            projected,
            suggestions,
        })
    }
}
