pub mod campaign;
pub mod channels;
pub mod config;
pub mod engine;
pub mod error;
pub mod optimizer;
pub mod scoring;
pub mod simulator;
pub mod suggestions;

pub use campaign::{
    derive_campaign_id, AgeRange, BudgetAllocation, Campaign, ChannelPreferences, Creative, Gender,
    IncomeTier, ProductProfile, TargetingProfile,
};
pub use config::{ConfigError, EngineConfig};
pub use engine::{CampaignEngine, CampaignPlan};
pub use error::{EngineError, EngineResult};
pub use optimizer::{
    Candidate, CandidateGenerator, OptimizationResult, Optimizer, OptimizerConfig, SamplerKind,
};
pub use scoring::{
    AllocationScorer, FeatureRow, HeuristicConfig, LinearRevenueModel, ModelError, RevenueModel,
    ScoringSource,
};
pub use simulator::{simulate_allocation, simulate_campaign, SimulationResult};
pub use suggestions::{
    OptimizationSuggestion, SuggestionGenerator, SuggestionKind, SuggestionPolicy,
};

pub(crate) fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

pub(crate) fn round_cents(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn format_number(value: f64) -> String {
    let rounded = value.round().max(0.0) as i64;
    let mut chars: Vec<char> = rounded.to_string().chars().collect();
    let mut result = String::new();
    let mut count = 0usize;

    while let Some(ch) = chars.pop() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(ch);
        count += 1;
    }

    result.chars().rev().collect()
}

pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as i64;
    format!(
        "{}${}.{:02}",
        sign,
        format_number((cents / 100) as f64),
        cents % 100
    )
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
