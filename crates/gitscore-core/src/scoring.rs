// Popularity scoring - weighted, normalized blend of stars, forks and recency
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{models::Repository, Error, Result};

const WEIGHT_SUM_TOLERANCE: f32 = 0.001;

/// Per-metric contribution factors. The three must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weights {
    pub stars: f32,
    pub forks: f32,
    pub recency: f32,
}

/// Per-metric normalization denominators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Maximums {
    pub stars: f32,
    pub forks: f32,
    pub recency_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: Weights,
    pub maximums: Maximums,
    pub normalize: bool,
}

impl ScoringConfig {
    pub fn new(weights: Weights, maximums: Maximums, normalize: bool) -> Result<Self> {
        let config = Self {
            weights,
            maximums,
            normalize,
        };
        config.validate()?;
        Ok(config)
    }

    /// Enforced at boot, before any traffic; requests never see a bad config.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("weights.stars", self.weights.stars),
            ("weights.forks", self.weights.forks),
            ("weights.recency", self.weights.recency),
        ];
        for (field, value) in weights {
            if value <= 0.0 {
                return Err(Error::Config(format!(
                    "scoring {} must be positive (got {})",
                    field, value
                )));
            }
        }

        let total = self.weights.stars + self.weights.forks + self.weights.recency;
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Config(format!(
                "scoring weights must sum to 1.0 (current sum: {})",
                total
            )));
        }

        if self.maximums.stars <= 0.0 || self.maximums.forks <= 0.0 {
            return Err(Error::Config(
                "scoring maximums must be positive".to_string(),
            ));
        }
        if self.maximums.recency_days == 0 {
            return Err(Error::Config(
                "scoring maximums.recency_days must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: Weights {
                stars: 0.4,
                forks: 0.3,
                recency: 0.3,
            },
            maximums: Maximums {
                stars: 100_000.0,
                forks: 50_000.0,
                recency_days: 365,
            },
            normalize: true,
        }
    }
}

/// Strategy seam for popularity scoring, so the blend can be swapped
/// without touching orchestration.
pub trait ScoreCalculator: Send + Sync {
    fn popularity_score(&self, repository: &Repository) -> f32;
}

/// The default calculator: weighted blend of normalized stars, forks and
/// inverse-linear recency decay. Pure and side-effect free.
pub struct WeightedScoreCalculator {
    config: ScoringConfig,
}

impl WeightedScoreCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score against an explicit "now" so tests stay deterministic.
    pub fn score_at(&self, repository: &Repository, now: DateTime<Utc>) -> f32 {
        let stars = self.metric_term(
            repository.stars as f32,
            self.config.maximums.stars,
            self.config.weights.stars,
        );
        let forks = self.metric_term(
            repository.forks as f32,
            self.config.maximums.forks,
            self.config.weights.forks,
        );
        stars + forks + self.recency_term(repository.last_updated, now)
    }

    fn metric_term(&self, value: f32, max: f32, weight: f32) -> f32 {
        let ratio = if self.config.normalize {
            (value / max).min(1.0)
        } else {
            value
        };
        ratio * weight
    }

    fn recency_term(&self, last_updated: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
        // whole elapsed days; a future timestamp counts as "updated just now"
        let days = (now - last_updated).num_days().max(0) as f32;
        let ratio = 1.0 - (days / self.config.maximums.recency_days as f32).min(1.0);
        ratio * self.config.weights.recency
    }
}

impl ScoreCalculator for WeightedScoreCalculator {
    fn popularity_score(&self, repository: &Repository) -> f32 {
        self.score_at(repository, Utc::now())
    }
}
