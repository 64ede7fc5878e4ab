//! Static channel, category, and demographic reference tables.

use serde::Serialize;

use crate::campaign::IncomeTier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelPerformanceProfile {
    pub reach_rate: f64,
    pub engagement_rate: f64,
    pub conversion_rate: f64,
    pub cost_per_click: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryMultiplier {
    pub reach: f64,
    pub engagement: f64,
    pub conversion: f64,
}

impl CategoryMultiplier {
    pub const NEUTRAL: CategoryMultiplier = CategoryMultiplier {
        reach: 1.0,
        engagement: 1.0,
        conversion: 1.0,
    };
}

/// Profile used for channels missing from the table.
pub const BASELINE_CHANNEL: &str = "facebook";

/// Channels the revenue model was trained on, in feature order.
pub const MODEL_CHANNELS: [&str; 6] = [
    "instagram",
    "google-ads",
    "tiktok",
    "facebook",
    "youtube",
    "linkedin",
];

const fn profile(
    reach_rate: f64,
    engagement_rate: f64,
    conversion_rate: f64,
    cost_per_click: f64,
) -> ChannelPerformanceProfile {
    ChannelPerformanceProfile {
        reach_rate,
        engagement_rate,
        conversion_rate,
        cost_per_click,
    }
}

const CHANNEL_TABLE: [(&str, ChannelPerformanceProfile); 10] = [
    ("facebook", profile(0.12, 0.018, 0.009, 1.72)),
    ("instagram", profile(0.08, 0.058, 0.007, 3.56)),
    ("google-ads", profile(0.35, 0.036, 0.039, 2.69)),
    ("tiktok", profile(0.15, 0.054, 0.006, 1.00)),
    ("youtube", profile(0.20, 0.018, 0.013, 3.21)),
    ("linkedin", profile(0.06, 0.027, 0.028, 5.26)),
    ("twitter", profile(0.048, 0.015, 0.005, 3.75)),
    ("email", profile(0.85, 0.21, 0.18, 0.10)),
    ("seo", profile(0.45, 0.024, 0.025, 0.00)),
    ("influencer", profile(0.25, 0.037, 0.019, 4.12)),
];

const CATEGORY_TABLE: [(&str, CategoryMultiplier); 7] = [
    ("electronics", category(1.1, 0.9, 1.2)),
    ("fashion", category(1.2, 1.4, 0.8)),
    ("health", category(0.9, 1.1, 1.1)),
    ("home", category(0.8, 0.8, 1.0)),
    ("sports", category(1.0, 1.2, 0.9)),
    ("software", category(0.7, 0.6, 1.5)),
    ("education", category(0.6, 0.7, 1.3)),
];

const fn category(reach: f64, engagement: f64, conversion: f64) -> CategoryMultiplier {
    CategoryMultiplier {
        reach,
        engagement,
        conversion,
    }
}

pub fn known_channels() -> impl Iterator<Item = &'static str> {
    CHANNEL_TABLE.iter().map(|(name, _)| *name)
}

pub fn is_known_channel(channel: &str) -> bool {
    CHANNEL_TABLE.iter().any(|(name, _)| *name == channel)
}

pub fn channel_profile(channel: &str) -> ChannelPerformanceProfile {
    lookup_channel(channel)
        .or_else(|| lookup_channel(BASELINE_CHANNEL))
        .unwrap_or(CHANNEL_TABLE[0].1)
}

fn lookup_channel(channel: &str) -> Option<ChannelPerformanceProfile> {
    CHANNEL_TABLE
        .iter()
        .find(|(name, _)| *name == channel)
        .map(|(_, profile)| *profile)
}

pub fn category_multiplier(category: &str) -> CategoryMultiplier {
    let key = category.trim().to_lowercase();
    CATEGORY_TABLE
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(CategoryMultiplier::NEUTRAL)
}

/// Column suffix the revenue model uses for a channel.
pub fn model_feature_key(channel: &str) -> &str {
    match channel {
        "google-ads" => "google",
        other => other,
    }
}

pub fn age_factor(average_age: f64) -> f64 {
    if average_age < 25.0 {
        1.2
    } else if average_age > 50.0 {
        0.8
    } else {
        1.0
    }
}

pub fn income_factor(income: IncomeTier) -> f64 {
    match income {
        IncomeTier::High => 1.3,
        IncomeTier::Medium => 1.1,
        IncomeTier::Low => 0.8,
        IncomeTier::All => 1.0,
    }
}

/// Compounding bonus per targeted interest.
pub fn interest_factor(interest_count: usize) -> f64 {
    1.0 + 0.1 * interest_count as f64
}
