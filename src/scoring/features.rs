use serde::Serialize;
use std::collections::BTreeMap;

use crate::campaign::{Campaign, Gender, IncomeTier};
use crate::channels::{model_feature_key, MODEL_CHANNELS};

const GENDER_LABELS: [&str; 3] = ["man", "woman", "all"];
const INCOME_LABELS: [&str; 2] = ["low", "high"];

/// Campaign-level inputs shared by every candidate in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureContext {
    pub total_budget: f64,
    pub aov: f64,
    pub creative_quality: f64,
    pub campaign_days: u32,
    /// Fraction, e.g. `0.3`.
    pub target_margin: f64,
    pub age: f64,
    pub gender: Gender,
    pub income: IncomeTier,
}

impl FeatureContext {
    pub fn from_campaign(campaign: &Campaign, default_creative_quality: f64) -> Self {
        Self {
            total_budget: campaign.budget.total,
            aov: campaign.product.price,
            creative_quality: campaign.creative_quality(default_creative_quality),
            campaign_days: campaign.budget.duration_days,
            target_margin: campaign.product.target_margin / 100.0,
            age: campaign.average_age().trunc(),
            gender: campaign.targeting.gender,
            income: campaign.targeting.income,
        }
    }
}

/// Named numeric inputs for one candidate. Absent columns read as zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeatureRow {
    values: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> f64 {
        self.values.get(column).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(column, value)| (column.as_str(), *value))
    }
}

pub fn build_feature_row(context: &FeatureContext, split: &BTreeMap<String, f64>) -> FeatureRow {
    let mut row = FeatureRow::default();
    let total = context.total_budget;

    for channel in MODEL_CHANNELS {
        let key = model_feature_key(channel);
        let amount = split.get(channel).copied().unwrap_or(0.0);
        let fraction = if total > 0.0 { amount / total } else { 0.0 };
        row.insert(format!("budget_{}", key), amount);
        row.insert(format!("pct_{}", key), fraction);
    }

    row.insert("total_budget", total);
    row.insert("aov", context.aov);
    row.insert("creative_quality", context.creative_quality);
    row.insert("campaign_days", context.campaign_days as f64);
    row.insert("target_margin", context.target_margin);
    row.insert("age", context.age);

    let gender = context.gender.model_label();
    for label in GENDER_LABELS {
        row.insert(format!("gender_{}", label), one_hot(label == gender));
    }
    let income = context.income.model_label();
    for label in INCOME_LABELS {
        row.insert(format!("income_level_{}", label), one_hot(label == income));
    }

    row
}

fn one_hot(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
