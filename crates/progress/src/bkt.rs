//! Bayesian Knowledge Tracing.
//!
//! Each observed answer updates P(known) by Bayes' rule under the slip and
//! guess rates, then applies the learning transition:
//!
//! ```text
//! correct:    P(obs) = p(1-S) + (1-p)G      posterior = p(1-S) / P(obs)
//! incorrect:  P(obs) = pS + (1-p)(1-G)      posterior = pS / P(obs)
//! p' = clamp(posterior + (1 - posterior)T, floor, ceiling)
//! ```

use tracing::debug;
use tutor_core::{BktParams, TopicMasteryRecord, MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Attempts required before difficulty starts tuning itself.
pub const DIFFICULTY_MIN_ATTEMPTS: u32 = 3;

/// Success rate above which difficulty goes up.
pub const DIFFICULTY_RAISE_RATE: f64 = 0.8;

/// Success rate below which difficulty goes down.
pub const DIFFICULTY_LOWER_RATE: f64 = 0.5;

/// P(known | observation), before the learning transition.
///
/// A zero observation probability (only reachable with degenerate
/// parameters) leaves the prior unchanged.
pub fn posterior(params: &BktParams, p_known: f64, is_correct: bool) -> f64 {
    let (joint, p_obs) = if is_correct {
        let joint = p_known * (1.0 - params.p_slip);
        (joint, joint + (1.0 - p_known) * params.p_guess)
    } else {
        let joint = p_known * params.p_slip;
        (joint, joint + (1.0 - p_known) * (1.0 - params.p_guess))
    };

    if p_obs > 0.0 {
        joint / p_obs
    } else {
        p_known
    }
}

/// Full P(known) update for one answer, clamped to the configured bounds.
pub fn update_p_known(params: &BktParams, p_known: f64, is_correct: bool) -> f64 {
    let post = posterior(params, p_known, is_correct);
    let learned = post + (1.0 - post) * params.p_learn;
    debug!(p_known, post, learned, is_correct, "bkt update");
    learned.clamp(params.p_floor, params.p_ceiling)
}

/// Difficulty after an answer, given the updated counters.
pub fn tune_difficulty(difficulty: u8, attempts: u32, correct: u32) -> u8 {
    if attempts < DIFFICULTY_MIN_ATTEMPTS {
        return difficulty;
    }
    let rate = correct as f64 / attempts as f64;
    if rate > DIFFICULTY_RAISE_RATE {
        difficulty.saturating_add(1).min(MAX_DIFFICULTY)
    } else if rate < DIFFICULTY_LOWER_RATE {
        difficulty.saturating_sub(1).max(MIN_DIFFICULTY)
    } else {
        difficulty
    }
}

/// Apply one answer to a record, returning the new record.
pub fn apply_answer(
    params: &BktParams,
    record: &TopicMasteryRecord,
    is_correct: bool,
) -> TopicMasteryRecord {
    let attempts = record.attempts + 1;
    let correct = record.correct + u32::from(is_correct);
    TopicMasteryRecord {
        p_known: update_p_known(params, record.p_known, is_correct),
        attempts,
        correct,
        difficulty: tune_difficulty(record.difficulty, attempts, correct),
    }
}
