use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::campaign::{Campaign, ChannelPreferences, TargetingProfile};
use crate::channels::{
    age_factor, category_multiplier, channel_profile, income_factor, interest_factor,
    known_channels, CategoryMultiplier, ChannelPerformanceProfile,
};
use crate::error::EngineResult;
use crate::round_cents;

pub const MAX_TIMELINE_DAYS: u32 = 30;
const RAMP_UP_DAYS: f64 = 7.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub estimated_reach: u64,
    pub estimated_engagement: u64,
    pub estimated_conversions: u64,
    /// Percent, rounded to two decimals.
    pub estimated_roi: f64,
    pub cost_per_conversion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub spend: f64,
    pub reach: u64,
    pub engagement: u64,
    pub conversions: u64,
    pub roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub day: u32,
    pub reach: u64,
    pub conversions: u64,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub campaign_id: String,
    pub metrics: SimulationMetrics,
    pub channel_breakdown: BTreeMap<String, ChannelMetrics>,
    pub timeline: Vec<TimelinePoint>,
}

impl SimulationResult {
    fn empty(campaign_id: &str) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            metrics: SimulationMetrics::default(),
            channel_breakdown: BTreeMap::new(),
            timeline: Vec::new(),
        }
    }

    pub fn total_spend(&self) -> f64 {
        self.channel_breakdown.values().map(|metrics| metrics.spend).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channel_breakdown.is_empty()
    }
}

/// Projects a campaign with its budget split evenly over the active channels.
pub fn simulate_campaign(campaign: &Campaign) -> EngineResult<SimulationResult> {
    campaign.validate()?;
    let active = resolve_active_channels(&campaign.channels);
    let split = even_split(campaign.budget.total, &active);
    Ok(project(campaign, &split))
}

/// Projects a campaign under an explicit channel split, e.g. an optimizer
/// recommendation.
pub fn simulate_allocation(
    campaign: &Campaign,
    allocation: &BTreeMap<String, f64>,
) -> EngineResult<SimulationResult> {
    campaign.validate()?;
    let split: Vec<(String, f64)> = allocation
        .iter()
        .map(|(channel, amount)| (channel.clone(), amount.max(0.0)))
        .collect();
    Ok(project(campaign, &split))
}

pub fn resolve_active_channels(preferences: &ChannelPreferences) -> Vec<String> {
    if !preferences.preferred.is_empty() {
        let mut seen = HashSet::new();
        return preferences
            .preferred
            .iter()
            .filter(|channel| seen.insert(channel.as_str()))
            .cloned()
            .collect();
    }

    known_channels()
        .filter(|channel| !preferences.avoids(channel))
        .map(str::to_string)
        .collect()
}

pub fn demographic_multiplier(targeting: &TargetingProfile) -> f64 {
    let mut multiplier = age_factor(targeting.age_range.average());
    multiplier *= income_factor(targeting.income);
    if !targeting.interests.is_empty() {
        multiplier *= interest_factor(targeting.interests.len());
    }
    multiplier
}

fn even_split(total: f64, channels: &[String]) -> Vec<(String, f64)> {
    if channels.is_empty() {
        return Vec::new();
    }
    let share = total / channels.len() as f64;
    channels.iter().map(|channel| (channel.clone(), share)).collect()
}

#[derive(Debug, Clone, Copy)]
struct ChannelProjection {
    reach: u64,
    engagement: u64,
    conversions: u64,
}

fn project_channel(
    profile: &ChannelPerformanceProfile,
    spend: f64,
    category: &CategoryMultiplier,
    demographic: f64,
) -> ChannelProjection {
    // Organic channels carry no cost per click and buy no paid reach.
    let base_reach = if profile.cost_per_click > 0.0 {
        spend / profile.cost_per_click * profile.reach_rate
    } else {
        0.0
    };
    let reach = whole(base_reach * category.reach * demographic);
    let engagement = whole(reach as f64 * profile.engagement_rate * category.engagement);
    let conversions = whole(reach as f64 * profile.conversion_rate * category.conversion);

    ChannelProjection {
        reach,
        engagement,
        conversions,
    }
}

fn project(campaign: &Campaign, split: &[(String, f64)]) -> SimulationResult {
    if split.is_empty() {
        return SimulationResult::empty(&campaign.id);
    }

    let category = category_multiplier(&campaign.product.category);
    let demographic = demographic_multiplier(&campaign.targeting);
    let price = campaign.product.price;

    let mut channel_breakdown = BTreeMap::new();
    let mut total_reach = 0u64;
    let mut total_engagement = 0u64;
    let mut total_conversions = 0u64;
    let mut total_spend = 0.0;

    for (channel, spend) in split {
        let projection = project_channel(&channel_profile(channel), *spend, &category, demographic);
        let revenue = projection.conversions as f64 * price;

        channel_breakdown.insert(
            channel.clone(),
            ChannelMetrics {
                spend: *spend,
                reach: projection.reach,
                engagement: projection.engagement,
                conversions: projection.conversions,
                roi: roi_percent(revenue, *spend),
            },
        );

        total_reach += projection.reach;
        total_engagement += projection.engagement;
        total_conversions += projection.conversions;
        total_spend += spend;
    }

    let total_revenue = total_conversions as f64 * price;
    let cost_per_conversion = if total_conversions > 0 {
        round_cents(total_spend / total_conversions as f64)
    } else {
        0.0
    };

    let timeline = build_timeline(
        campaign.budget.duration_days,
        total_reach,
        total_conversions,
        total_spend,
    );

    SimulationResult {
        campaign_id: campaign.id.clone(),
        metrics: SimulationMetrics {
            estimated_reach: total_reach,
            estimated_engagement: total_engagement,
            estimated_conversions: total_conversions,
            estimated_roi: round_cents(roi_percent(total_revenue, total_spend)),
            cost_per_conversion,
        },
        channel_breakdown,
        timeline,
    }
}

/// Warm-up curve: daily output ramps linearly to full pace over the first week.
fn build_timeline(
    duration_days: u32,
    total_reach: u64,
    total_conversions: u64,
    total_spend: f64,
) -> Vec<TimelinePoint> {
    if duration_days == 0 {
        return Vec::new();
    }
    let duration = duration_days as f64;
    let daily_spend = total_spend / duration;

    (1..=duration_days.min(MAX_TIMELINE_DAYS))
        .map(|day| {
            let ramp = (day as f64 / RAMP_UP_DAYS).min(1.0);
            TimelinePoint {
                day,
                reach: whole(total_reach as f64 / duration * ramp),
                conversions: whole(total_conversions as f64 / duration * ramp),
                spend: daily_spend,
            }
        })
        .collect()
}

pub fn roi_percent(revenue: f64, spend: f64) -> f64 {
    if spend > 0.0 {
        (revenue - spend) / spend * 100.0
    } else {
        0.0
    }
}

fn whole(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}
