use campaign_sim::optimizer::{confidence_from_spread, optimization_channels};
use campaign_sim::scoring::{build_feature_row, FeatureContext};
use campaign_sim::{
    AllocationScorer, BudgetAllocation, Campaign, CandidateGenerator, ChannelPreferences, Creative,
    EngineError, FeatureRow, HeuristicConfig, LinearRevenueModel, ModelError, Optimizer,
    OptimizerConfig, ProductProfile, RevenueModel, SamplerKind, ScoringSource, TargetingProfile,
};
use std::collections::BTreeMap;

fn campaign(total: f64) -> Campaign {
    Campaign {
        id: "summer-sale".to_string(),
        name: "Summer sale".to_string(),
        product: ProductProfile {
            name: "Sneakers".to_string(),
            category: "fashion".to_string(),
            price: 80.0,
            target_margin: 40.0,
        },
        targeting: TargetingProfile::default(),
        budget: BudgetAllocation {
            total,
            duration_days: 30,
            channels: BTreeMap::new(),
        },
        channels: ChannelPreferences::default(),
        creatives: Vec::new(),
    }
}

fn linear(coefficients: &[(&str, f64)], intercept: f64) -> LinearRevenueModel {
    LinearRevenueModel::new(
        intercept,
        coefficients
            .iter()
            .map(|(column, weight)| (column.to_string(), *weight))
            .collect(),
    )
}

fn optimizer(scorer: AllocationScorer) -> Optimizer {
    Optimizer::new(OptimizerConfig::default(), HeuristicConfig::default(), scorer)
}

fn channels(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

struct FailingModel;

impl RevenueModel for FailingModel {
    fn predict(&self, _features: &FeatureRow) -> Result<f64, ModelError> {
        Err(ModelError::Inference("session closed".to_string()))
    }
}

/// Fails whenever tiktok takes more than a fifth of the budget.
struct TiktokShyModel;

impl RevenueModel for TiktokShyModel {
    fn name(&self) -> &str {
        "tiktok-shy"
    }

    fn predict(&self, features: &FeatureRow) -> Result<f64, ModelError> {
        if features.get("pct_tiktok") > 0.2 {
            return Err(ModelError::Inference("out of range".to_string()));
        }
        Ok(1500.0 + features.get("budget_google"))
    }
}

struct NanModel;

impl RevenueModel for NanModel {
    fn predict(&self, _features: &FeatureRow) -> Result<f64, ModelError> {
        Ok(f64::NAN)
    }
}

#[test]
fn every_candidate_reconciles_to_the_budget() {
    let generator = CandidateGenerator::new(SamplerKind::Dirichlet, 50);
    let candidates = generator.generate(300.0, &channels(&["a", "b", "c"]), 500, 42);

    assert_eq!(candidates.len(), 500);
    for candidate in &candidates {
        assert_eq!(candidate.split.len(), 3);
        assert!((candidate.total() - 300.0).abs() <= 0.01 + 1e-9);
        assert!(candidate.split.values().all(|amount| *amount >= 0.0));
    }
}

#[test]
fn uniform_sampler_reconciles_and_caps() {
    let generator = CandidateGenerator::new(SamplerKind::Uniform, 50);
    let candidates = generator.generate(987.65, &channels(&["a", "b", "c", "d", "e"]), 500, 3);

    assert_eq!(candidates.len(), 50);
    for candidate in &candidates {
        assert!((candidate.total() - 987.65).abs() <= 0.01 + 1e-9);
    }
}

#[test]
fn no_channels_or_budget_means_no_candidates() {
    let generator = CandidateGenerator::new(SamplerKind::Dirichlet, 50);
    assert!(generator.generate(1000.0, &[], 500, 42).is_empty());
    assert!(generator.generate(0.0, &channels(&["a"]), 500, 42).is_empty());
}

#[test]
fn feature_rows_carry_every_model_column() {
    let mut campaign = campaign(1000.0);
    campaign.creatives = vec![Creative {
        title: "Hero".to_string(),
        channel: "instagram".to_string(),
        score: Some(80.0),
    }];
    let context = FeatureContext::from_campaign(&campaign, 0.7);

    let mut split = BTreeMap::new();
    split.insert("google-ads".to_string(), 600.0);
    split.insert("tiktok".to_string(), 400.0);
    let row = build_feature_row(&context, &split);

    assert_eq!(row.len(), 23);
    assert_eq!(row.get("budget_google"), 600.0);
    assert!((row.get("pct_tiktok") - 0.4).abs() < 1e-9);
    assert_eq!(row.get("budget_facebook"), 0.0);
    assert!((row.get("creative_quality") - 0.8).abs() < 1e-9);
    assert!((row.get("target_margin") - 0.4).abs() < 1e-9);
    assert_eq!(row.get("age"), 35.0);
    assert_eq!(row.get("gender_all"), 1.0);
    assert_eq!(row.get("gender_man"), 0.0);
    assert_eq!(row.get("income_level_high"), 1.0);
}

#[test]
fn model_picks_the_highest_roi_split() {
    let model = linear(&[("budget_google", 3.0)], 0.0);
    let result = optimizer(AllocationScorer::model_backed(model))
        .optimize(&campaign(1000.0))
        .unwrap();

    assert_eq!(result.source, ScoringSource::Model);
    assert_eq!(result.candidates_scored, 500);
    assert_eq!(result.recommended_split.len(), 6);
    let total: f64 = result.recommended_split.values().sum();
    assert!((total - 1000.0).abs() <= 0.01 + 1e-9);

    let google = result.recommended_split["google-ads"];
    assert!(result.recommended_split.values().all(|amount| *amount <= google));
    assert!(result.predicted_roi > 0.5);
    assert!((result.predicted_revenue - 3.0 * google).abs() < 0.01);
    assert!((0.5..=1.0).contains(&result.confidence_score));
    assert!(result.warning.is_none());
}

#[test]
fn same_seed_same_recommendation() {
    let model = linear(&[("budget_youtube", 2.0), ("budget_linkedin", 1.5)], 100.0);
    let optimizer = optimizer(AllocationScorer::model_backed(model));
    let campaign = campaign(2500.0);

    let first = optimizer.optimize_with_seed(&campaign, 11).unwrap();
    let second = optimizer.optimize_with_seed(&campaign, 11).unwrap();
    assert_eq!(first, second);
    assert_eq!(optimizer.optimize(&campaign).unwrap(), optimizer.optimize_with_seed(&campaign, 42).unwrap());
}

#[test]
fn negative_roi_is_reported_with_a_warning() {
    let model = linear(&[("total_budget", 0.5)], 0.0);
    let result = optimizer(AllocationScorer::model_backed(model))
        .optimize(&campaign(1000.0))
        .unwrap();

    assert!(!result.recommended_split.is_empty());
    assert!((result.predicted_roi - -0.5).abs() < 1e-9);
    assert!(!result.is_profitable());
    assert_eq!(result.display_roi(), 0.0);
    assert!(result.warning.as_deref().map_or(false, |w| !w.is_empty()));
    // Every candidate scores the same, so they agree perfectly.
    assert_eq!(result.confidence_score, 1.0);
}

#[test]
fn failing_model_falls_back_to_rules() {
    let result = optimizer(AllocationScorer::model_backed(FailingModel))
        .optimize(&campaign(1000.0))
        .unwrap();

    assert_eq!(result.source, ScoringSource::Heuristic);
    assert_eq!(result.confidence_score, 0.6);
    assert_eq!(result.predicted_revenue, 2500.0);
    assert_eq!(result.predicted_roi, 1.5);
    assert!(result.warning.as_deref().unwrap_or("").contains("rule-based"));
    assert!((result.recommended_split["google-ads"] - 300.0).abs() < 1e-9);
}

#[test]
fn non_finite_predictions_fall_back_to_rules() {
    let result = optimizer(AllocationScorer::model_backed(NanModel))
        .optimize(&campaign(1000.0))
        .unwrap();
    assert_eq!(result.source, ScoringSource::Heuristic);
}

#[test]
fn partially_failing_model_uses_the_survivors() {
    let result = optimizer(AllocationScorer::model_backed(TiktokShyModel))
        .optimize(&campaign(1000.0))
        .unwrap();

    assert_eq!(result.source, ScoringSource::Model);
    assert!(result.candidates_scored > 0 && result.candidates_scored < 500);
    assert!(result.recommended_split["tiktok"] <= 200.01);
}

#[test]
fn heuristic_scorer_is_rule_based() {
    let result = optimizer(AllocationScorer::Heuristic)
        .optimize(&campaign(1000.0))
        .unwrap();

    assert_eq!(result.source, ScoringSource::Heuristic);
    assert_eq!(result.confidence_score, 0.6);
    assert!(result.warning.is_some());
    assert!((result.recommended_split["google-ads"] - 300.0).abs() < 1e-9);
    assert!((result.recommended_split["facebook"] - 250.0).abs() < 1e-9);
    let total: f64 = result.recommended_split.values().sum();
    assert!((total - 1000.0).abs() <= 0.01);
}

#[test]
fn avoided_channels_are_never_recommended() {
    let mut campaign = campaign(1000.0);
    campaign.channels.avoided = channels(&["tiktok", "linkedin"]);

    assert_eq!(optimization_channels(&campaign).len(), 4);
    let model = linear(&[("budget_tiktok", 10.0), ("budget_facebook", 1.2)], 0.0);
    let result = optimizer(AllocationScorer::model_backed(model))
        .optimize(&campaign)
        .unwrap();

    assert!(!result.recommended_split.contains_key("tiktok"));
    assert!(!result.recommended_split.contains_key("linkedin"));
    let total: f64 = result.recommended_split.values().sum();
    assert!((total - 1000.0).abs() <= 0.01 + 1e-9);
}

#[test]
fn no_optimizable_channels_is_degenerate() {
    let mut campaign = campaign(1000.0);
    campaign.channels.avoided = channels(&[
        "instagram",
        "google-ads",
        "tiktok",
        "facebook",
        "youtube",
        "linkedin",
    ]);

    let result = optimizer(AllocationScorer::Heuristic).optimize(&campaign).unwrap();
    assert!(result.recommended_split.is_empty());
    assert_eq!(result.predicted_revenue, 0.0);
    assert_eq!(result.confidence_score, 0.0);
    assert!(result.warning.is_some());
}

#[test]
fn zero_budget_is_degenerate() {
    let model = linear(&[("budget_google", 3.0)], 0.0);
    let result = optimizer(AllocationScorer::model_backed(model))
        .optimize(&campaign(0.0))
        .unwrap();

    assert_eq!(result.recommended_split.len(), 6);
    assert!(result.recommended_split.values().all(|amount| *amount == 0.0));
    assert_eq!(result.predicted_roi, 0.0);
    assert_eq!(result.candidates_scored, 0);
}

#[test]
fn uniform_sampler_scores_at_most_the_cap() {
    let config = OptimizerConfig {
        sampler: SamplerKind::Uniform,
        ..OptimizerConfig::default()
    };
    let model = linear(&[("budget_instagram", 2.0)], 0.0);
    let optimizer = Optimizer::new(
        config,
        HeuristicConfig::default(),
        AllocationScorer::model_backed(model),
    );

    let result = optimizer.optimize(&campaign(1000.0)).unwrap();
    assert_eq!(result.source, ScoringSource::Model);
    assert_eq!(result.candidates_scored, 50);
}

#[test]
fn invalid_input_is_rejected_before_scoring() {
    let mut campaign = campaign(1000.0);
    campaign.budget.total = f64::NAN;
    let err = optimizer(AllocationScorer::Heuristic).optimize(&campaign).unwrap_err();
    assert!(matches!(err, EngineError::InputInvalid(_)));
}

#[test]
fn confidence_stays_within_bounds() {
    for spread in [0.0, 0.01, 0.1, 0.3, 2.0] {
        let rois: Vec<f64> = (0..5).map(|i| 1.0 + spread * i as f64).collect();
        let confidence = confidence_from_spread(&rois, 0.5);
        assert!((0.5..=1.0).contains(&confidence), "spread {} gave {}", spread, confidence);
    }
}

#[test]
fn negative_model_revenue_still_ranks_candidates() {
    let model = linear(&[("budget_google", 1.0)], -5000.0);
    let result = optimizer(AllocationScorer::model_backed(model))
        .optimize(&campaign(1000.0))
        .unwrap();

    let google = result.recommended_split["google-ads"];
    assert!(result.recommended_split.values().all(|amount| *amount <= google));
    assert!((result.predicted_roi - (-6.0 + google / 1000.0)).abs() < 1e-4);
    assert_eq!(result.predicted_revenue, 0.0);
    assert!(result.warning.is_some());
    assert!((0.5..=1.0).contains(&result.confidence_score));
}
