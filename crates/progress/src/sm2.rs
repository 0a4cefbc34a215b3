//! SM-2 style review scheduling.
//!
//! Quality ratings (0-5) drive two things per review:
//!
//! - the ease factor: `+ (0.1 - (5-q)(0.08 + (5-q)0.02))` for `q >= 3`,
//!   `- penalty` otherwise, floored at `min_ease`;
//! - the interval: 1 day after the first success, 6 after the second,
//!   `previous * ease` after that, and back to 1 day (with repetitions
//!   reset) after any failure.
//!
//! The interval is then jittered by `1 + u`, `u` drawn by the caller, and
//! capped at `max_interval`.

use chrono::Duration;
use tracing::debug;
use tutor_core::time::latest_storable;
use tutor_core::{Quality, QualityEntry, Sm2Params, Time, TopicScheduleRecord};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Ease change for a successful rating.
pub fn ease_bonus(quality: Quality) -> f64 {
    let miss = (Quality::MAX - quality.value()) as f64;
    0.1 - miss * (0.08 + miss * 0.02)
}

/// Ease factor after a review with the given rating.
pub fn next_ease(params: &Sm2Params, ease: f64, quality: Quality) -> f64 {
    let ease = if quality.is_pass() {
        ease + ease_bonus(quality)
    } else {
        ease - params.ease_penalty
    };
    ease.max(params.min_ease)
}

/// Un-jittered interval for the next review.
///
/// `ease` is the already-updated ease factor; `repetitions` and `interval`
/// are the values from before this review.
pub fn base_interval(
    params: &Sm2Params,
    repetitions: u32,
    interval: f64,
    ease: f64,
    quality: Quality,
) -> f64 {
    if !quality.is_pass() {
        return params.failure_interval;
    }
    match repetitions {
        0 => params.first_interval,
        1 => params.second_interval,
        _ => interval * ease,
    }
}

/// `now` plus a fractional number of days, saturating at the latest
/// timestamp the stores can hold.
pub fn add_days(now: Time, days: f64) -> Time {
    let latest = latest_storable();
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    Duration::try_milliseconds(millis)
        .and_then(|d| now.checked_add_signed(d))
        .map_or(latest, |t| t.min(latest))
}

/// Signed days from `now` until `then` (negative when `then` has passed).
pub fn days_between(now: Time, then: Time) -> f64 {
    (then - now).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Apply one review to a record, returning the new record.
///
/// `jitter` is the `u` of the `1 + u` interval multiplier.
pub fn apply_review(
    params: &Sm2Params,
    record: &TopicScheduleRecord,
    quality: Quality,
    now: Time,
    jitter: f64,
) -> TopicScheduleRecord {
    let mut next = record.clone();

    next.last_review = Some(now);
    next.total_reviews += 1;
    next.push_history(QualityEntry { quality, timestamp: now }, params.history_limit);

    next.ease_factor = next_ease(params, record.ease_factor, quality);

    let base = base_interval(
        params,
        record.repetitions,
        record.interval,
        next.ease_factor,
        quality,
    );
    next.repetitions = if quality.is_pass() { record.repetitions + 1 } else { 0 };

    let interval = (base * (1.0 + jitter)).min(params.max_interval);
    debug!(
        quality = quality.value(),
        ease = next.ease_factor,
        base,
        jitter,
        interval,
        "sm2 review"
    );

    next.interval = interval;
    next.next_review = add_days(now, interval);
    next
}
