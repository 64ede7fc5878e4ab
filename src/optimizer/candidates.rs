use rand::distributions::Open01;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::round_cents;

/// How candidate splits are drawn from the channel simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    /// Symmetric Dirichlet with every concentration at 1.
    #[default]
    Dirichlet,
    /// Normalized uniform weights; the degraded path, capped to fewer draws.
    Uniform,
}

impl SamplerKind {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "dirichlet" => Some(SamplerKind::Dirichlet),
            "uniform" | "fallback" => Some(SamplerKind::Uniform),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SamplerKind::Dirichlet => "dirichlet",
            SamplerKind::Uniform => "uniform",
        }
    }
}

/// One hypothetical split of the full budget. Lives for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub split: BTreeMap<String, f64>,
}

impl Candidate {
    pub fn total(&self) -> f64 {
        self.split.values().sum()
    }

    pub fn amount(&self, channel: &str) -> f64 {
        self.split.get(channel).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    sampler: SamplerKind,
    fallback_cap: usize,
}

impl CandidateGenerator {
    pub fn new(sampler: SamplerKind, fallback_cap: usize) -> Self {
        Self {
            sampler,
            fallback_cap,
        }
    }

    pub fn sampler(&self) -> SamplerKind {
        self.sampler
    }

    /// Number of candidates a request for `requested` actually yields.
    pub fn effective_count(&self, requested: usize) -> usize {
        match self.sampler {
            SamplerKind::Dirichlet => requested,
            SamplerKind::Uniform => requested.min(self.fallback_cap),
        }
    }

    pub fn generate(
        &self,
        total_budget: f64,
        channels: &[String],
        count: usize,
        seed: u64,
    ) -> Vec<Candidate> {
        let channels = distinct(channels);
        if channels.is_empty() || !total_budget.is_finite() || total_budget <= 0.0 {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(seed);
        (0..self.effective_count(count))
            .map(|_| {
                let weights = match self.sampler {
                    SamplerKind::Dirichlet => dirichlet_weights(&mut rng, channels.len()),
                    SamplerKind::Uniform => uniform_weights(&mut rng, channels.len()),
                };
                scale_to_budget(total_budget, channels.iter().copied().zip(weights))
            })
            .collect()
    }
}

fn distinct(channels: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    channels
        .iter()
        .map(String::as_str)
        .filter(|channel| seen.insert(*channel))
        .collect()
}

/// Gamma(1, 1) draws are exponential; normalizing them samples Dirichlet(1, ..., 1).
fn dirichlet_weights(rng: &mut StdRng, len: usize) -> Vec<f64> {
    let draws: Vec<f64> = (0..len)
        .map(|_| {
            let u: f64 = rng.sample(Open01);
            -u.ln()
        })
        .collect();
    normalize(draws)
}

fn uniform_weights(rng: &mut StdRng, len: usize) -> Vec<f64> {
    let draws: Vec<f64> = (0..len).map(|_| rng.gen::<f64>()).collect();
    normalize(draws)
}

fn normalize(values: Vec<f64>) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        let even = 1.0 / values.len().max(1) as f64;
        return vec![even; values.len()];
    }
    values.into_iter().map(|value| value / sum).collect()
}

/// Scales fractional weights to cents and folds the rounding residual into the
/// largest allocation so the split sums to the total.
pub(crate) fn scale_to_budget<'a>(
    total_budget: f64,
    weights: impl IntoIterator<Item = (&'a str, f64)>,
) -> Candidate {
    let mut ordered: Vec<(&str, f64)> = weights
        .into_iter()
        .map(|(channel, fraction)| (channel, round_cents(total_budget * fraction)))
        .collect();

    let allocated: f64 = ordered.iter().map(|(_, amount)| amount).sum();
    let residual = round_cents(total_budget - allocated);
    if residual.abs() >= 0.005 {
        let mut largest: Option<usize> = None;
        for (idx, (_, amount)) in ordered.iter().enumerate() {
            if largest.map_or(true, |best| *amount > ordered[best].1) {
                largest = Some(idx);
            }
        }
        if let Some(idx) = largest {
            ordered[idx].1 = round_cents(ordered[idx].1 + residual).max(0.0);
        }
    }

    Candidate {
        split: ordered
            .into_iter()
            .map(|(channel, amount)| (channel.to_string(), amount))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn residual_lands_on_largest_channel() {
        let candidate = scale_to_budget(100.0, [("a", 1.0 / 3.0), ("b", 1.0 / 3.0), ("c", 1.0 / 3.0)]);
        assert!((candidate.total() - 100.0).abs() < 0.01);
        assert!((candidate.amount("a") - 33.34).abs() < 1e-9);
        assert!((candidate.amount("b") - 33.33).abs() < 1e-9);
    }

    #[test]
    fn same_seed_reproduces_candidates() {
        let generator = CandidateGenerator::new(SamplerKind::Dirichlet, 50);
        let names = channels(&["a", "b", "c", "d"]);
        let first = generator.generate(1234.56, &names, 20, 7);
        let second = generator.generate(1234.56, &names, 20, 7);
        let other = generator.generate(1234.56, &names, 20, 8);
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn uniform_sampler_is_capped() {
        let generator = CandidateGenerator::new(SamplerKind::Uniform, 50);
        let names = channels(&["a", "b"]);
        assert_eq!(generator.generate(500.0, &names, 500, 42).len(), 50);
        assert_eq!(generator.generate(500.0, &names, 10, 42).len(), 10);
    }

    #[test]
    fn duplicate_channels_collapse() {
        let generator = CandidateGenerator::new(SamplerKind::Dirichlet, 50);
        let names = channels(&["a", "b", "a"]);
        for candidate in generator.generate(90.0, &names, 25, 3) {
            assert_eq!(candidate.split.len(), 2);
            assert!((candidate.total() - 90.0).abs() <= 0.01);
        }
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        let generator = CandidateGenerator::new(SamplerKind::Dirichlet, 50);
        assert!(generator.generate(100.0, &[], 10, 1).is_empty());
        assert!(generator.generate(0.0, &channels(&["a"]), 10, 1).is_empty());
    }

    #[test]
    fn sampler_names_parse() {
        assert_eq!(SamplerKind::from_str("Uniform"), Some(SamplerKind::Uniform));
        assert_eq!(SamplerKind::from_str("dirichlet"), Some(SamplerKind::Dirichlet));
        assert_eq!(SamplerKind::from_str("sobol"), None);
    }

    #[test]
    fn dirichlet_marginals_average_to_an_even_share() {
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 20_000;
        let mut sums = [0.0f64; 4];
        for _ in 0..draws {
            let weights = dirichlet_weights(&mut rng, 4);
            assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            for (sum, weight) in sums.iter_mut().zip(weights) {
                *sum += weight;
            }
        }
        for sum in sums {
            assert!((sum / draws as f64 - 0.25).abs() < 0.01);
        }
    }
}
