//! Model parameters for the mastery estimator and the review scheduler.
//!
//! Every field has a serde default, so a partial config file only overrides
//! the values it names.

use serde::{Deserialize, Serialize};

/// Combined engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Knowledge tracing parameters
    pub bkt: BktParams,

    /// Review scheduling parameters
    pub sm2: Sm2Params,
}

impl EngineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set knowledge tracing parameters.
    pub fn with_bkt(mut self, bkt: BktParams) -> Self {
        self.bkt = bkt;
        self
    }

    /// Set review scheduling parameters.
    pub fn with_sm2(mut self, sm2: Sm2Params) -> Self {
        self.sm2 = sm2;
        self
    }
}

/// Bayesian Knowledge Tracing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BktParams {
    /// P(L0): probability the topic is known before any practice
    pub p_init: f64,
    /// P(T): probability of learning the topic on each attempt
    pub p_learn: f64,
    /// P(S): probability of answering wrong despite knowing
    pub p_slip: f64,
    /// P(G): probability of answering right without knowing
    pub p_guess: f64,
    /// P(known) at or above which a topic counts as mastered
    pub mastery_threshold: f64,
    /// Lower clamp for P(known)
    pub p_floor: f64,
    /// Upper clamp for P(known)
    pub p_ceiling: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_init: 0.3,
            p_learn: 0.1,
            p_slip: 0.1,
            p_guess: 0.2,
            mastery_threshold: 0.95,
            p_floor: 0.01,
            p_ceiling: 0.99,
        }
    }
}

/// SM-2 style scheduling parameters. Intervals are in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sm2Params {
    /// Ease factor of a never-reviewed topic
    pub default_ease: f64,
    /// Ease factor floor
    pub min_ease: f64,
    /// Ease subtracted on a failed review
    pub ease_penalty: f64,
    /// Half-width of the uniform interval jitter, as a fraction
    pub noise_fraction: f64,
    /// Number of quality ratings retained per topic
    pub history_limit: usize,
    /// Interval after the first successful review
    pub first_interval: f64,
    /// Interval after the second successful review
    pub second_interval: f64,
    /// Interval after a failed review
    pub failure_interval: f64,
    /// Look-ahead window used by the review queue
    pub upcoming_window_days: f64,
    /// Longest interval ever scheduled
    pub max_interval: f64,
}

impl Default for Sm2Params {
    fn default() -> Self {
        Self {
            default_ease: 2.5,
            min_ease: 1.3,
            ease_penalty: 0.2,
            noise_fraction: 0.05,
            history_limit: 20,
            first_interval: 1.0,
            second_interval: 6.0,
            failure_interval: 1.0,
            upcoming_window_days: 7.0,
            max_interval: 36_500.0,
        }
    }
}
