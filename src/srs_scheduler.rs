//! SM-2 scheduler tuned for ayah memorization.
//!
//! The base is classic SM-2: quality grades 3-5 grow the interval (1 day, 6 days, then
//! interval x ease factor), grades 0-2 reset the card. On top of that, graduated intervals
//! are scaled by what is known about the ayah and the student: long ayat come back sooner,
//! short ones later, and slow or inaccurate recitation history pulls the interval in.
//!
//! Everything here is pure. The caller supplies `now`.

use chrono::{DateTime, TimeDelta, Utc};

use crate::errors::SchedulerError;
use crate::log_scheduler;
use crate::models::{
    Card, CardUpdate, DEFAULT_EASE_FACTOR, MINIMUM_EASE_FACTOR, ReplayedState, ReviewRecord,
    ReviewResult,
};

pub const PASSING_QUALITY: i32 = 3;

/// Tunable constants of the scheduling model.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerParams {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub failure_ease_penalty: f64,
    pub long_content_chars: usize,
    pub long_content_factor: f64,
    pub short_content_chars: usize,
    pub short_content_factor: f64,
    pub slow_response_ratio: f64,
    pub slow_response_factor: f64,
    pub low_accuracy_threshold: f64,
    pub low_accuracy_factor: f64,
    pub difficulty_step: f64,
    /// Current result first, then the most recent history entries.
    pub confidence_weights: [f64; 5],
    pub consistency_window: usize,
    pub consistency_bonus: f64,
    pub mastered_confidence: f64,
    pub mastered_repetitions: i32,
    pub struggling_confidence: f64,
    pub struggling_repetitions: i32,
    pub streak_lookback_days: u32,
    /// Upper bound on any scheduled interval. Keeps due dates inside the storable range.
    pub maximum_interval_days: i64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            initial_ease: DEFAULT_EASE_FACTOR,
            minimum_ease: MINIMUM_EASE_FACTOR,
            failure_ease_penalty: 0.2,
            long_content_chars: 200,
            long_content_factor: 0.8,
            short_content_chars: 50,
            short_content_factor: 1.2,
            slow_response_ratio: 1.5,
            slow_response_factor: 0.9,
            low_accuracy_threshold: 80.0,
            low_accuracy_factor: 0.85,
            difficulty_step: 0.1,
            confidence_weights: [0.4, 0.3, 0.15, 0.1, 0.05],
            consistency_window: 5,
            consistency_bonus: 0.1,
            mastered_confidence: 0.9,
            mastered_repetitions: 5,
            struggling_confidence: 0.5,
            struggling_repetitions: 3,
            streak_lookback_days: 30,
            maximum_interval_days: 36_500,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SrsScheduler {
    params: SchedulerParams,
}

impl SrsScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: SchedulerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// Validate the result, then schedule. This is the entry point the service uses.
    pub fn review(
        &self,
        card: &Card,
        result: &ReviewResult,
        now: DateTime<Utc>,
    ) -> Result<CardUpdate, SchedulerError> {
        Self::validate_result(result)?;

        if result.was_correct != (result.quality >= PASSING_QUALITY) {
            tracing::debug!(
                card_id = %card.id,
                quality = result.quality,
                was_correct = result.was_correct,
                "Reported correctness disagrees with quality; quality wins"
            );
        }

        Ok(self.calculate_next_review(card, result, now))
    }

    pub fn validate_result(result: &ReviewResult) -> Result<(), SchedulerError> {
        if !(0..=5).contains(&result.quality) {
            return Err(SchedulerError::InvalidQuality(result.quality));
        }
        if !result.accuracy.is_finite() || !(0.0..=100.0).contains(&result.accuracy) {
            return Err(SchedulerError::InvalidAccuracy(result.accuracy));
        }
        if !result.response_time.is_finite() || result.response_time <= 0.0 {
            return Err(SchedulerError::InvalidResponseTime(result.response_time));
        }
        Ok(())
    }

    /// Compute the card's next scheduling state. Total for any input.
    pub fn calculate_next_review(
        &self,
        card: &Card,
        result: &ReviewResult,
        now: DateTime<Utc>,
    ) -> CardUpdate {
        let passed = result.quality >= PASSING_QUALITY;
        let ease_factor = self.next_ease_factor(card.ease_factor, result.quality);

        let (interval_days, repetitions) = if passed {
            let repetitions = card.repetitions + 1;
            let interval = match repetitions {
                1 => 1,
                2 => 6,
                _ => {
                    let raw = (card.interval_days as f64 * ease_factor)
                        .round()
                        .min(self.params.maximum_interval_days as f64)
                        as i64;
                    self.adjust_for_content(raw, card, result)
                }
            };
            (interval.clamp(1, self.params.maximum_interval_days.max(1)), repetitions)
        } else {
            // Failed recall: hard reset, content heuristics do not apply
            (1, 0)
        };

        let memorization_confidence =
            self.memorization_confidence(&card.review_history, result.accuracy);
        let due_date = add_days(now, interval_days);

        log_scheduler!(
            card_id = card.id,
            quality = result.quality,
            interval_days = interval_days,
            ease_factor = ease_factor,
            "next review calculated"
        );

        CardUpdate {
            ease_factor,
            interval_days,
            repetitions,
            due_date,
            last_reviewed: now,
            memorization_confidence,
            review_record: ReviewRecord {
                timestamp: now,
                quality: result.quality,
                response_time: result.response_time,
                accuracy: result.accuracy,
                ease_factor,
                interval_days,
                was_correct: passed,
            },
        }
    }

    fn next_ease_factor(&self, ease: f64, quality: i32) -> f64 {
        let next = if quality >= PASSING_QUALITY {
            let miss = (5 - quality) as f64;
            ease + (0.1 - miss * (0.08 + miss * 0.02))
        } else {
            ease - self.params.failure_ease_penalty
        };
        next.max(self.params.minimum_ease)
    }

    /// Scale a graduated interval by ayah length, latency, rolling accuracy and difficulty.
    fn adjust_for_content(&self, interval: i64, card: &Card, result: &ReviewResult) -> i64 {
        let p = &self.params;
        let mut adjusted = interval as f64;

        let length = card.content_length();
        if length > p.long_content_chars {
            adjusted *= p.long_content_factor;
        } else if length < p.short_content_chars {
            adjusted *= p.short_content_factor;
        }

        // Historical means only; the current review is not part of them
        if let Some(mean_time) = mean(card.review_history.iter().map(|r| r.response_time)) {
            if result.response_time > mean_time * p.slow_response_ratio {
                adjusted *= p.slow_response_factor;
            }
        }
        if let Some(mean_accuracy) = mean(card.review_history.iter().map(|r| r.accuracy)) {
            if mean_accuracy < p.low_accuracy_threshold {
                adjusted *= p.low_accuracy_factor;
            }
        }

        adjusted *= 1.0 - card.difficulty * p.difficulty_step;

        (adjusted.round().min(p.maximum_interval_days as f64) as i64).max(1)
    }

    /// Weighted recency score of accuracies plus a bonus for steady history.
    ///
    /// The current accuracy takes part in the weighted sum but not in the variance,
    /// which only looks at earlier reviews.
    pub fn memorization_confidence(&self, history: &[ReviewRecord], current_accuracy: f64) -> f64 {
        let p = &self.params;
        let recent: Vec<f64> = history
            .iter()
            .rev()
            .take(p.consistency_window)
            .map(|r| normalize_accuracy(r.accuracy))
            .collect();

        let (current_weight, history_weights) = p.confidence_weights.split_at(1);
        let mut score = current_weight[0] * normalize_accuracy(current_accuracy);
        for (weight, accuracy) in history_weights.iter().zip(recent.iter()) {
            score += weight * accuracy;
        }

        let bonus = if recent.len() >= 2 {
            (p.consistency_bonus - variance(&recent)).max(0.0)
        } else {
            0.0
        };

        (score + bonus).clamp(0.0, 1.0)
    }

    /// Rebuild scheduling state from the review log alone.
    pub fn replay_history(&self, card: &Card) -> Option<ReplayedState> {
        let last = card.review_history.last()?;

        let mut repetitions = 0;
        let mut memorization_confidence = 0.0;
        for (index, record) in card.review_history.iter().enumerate() {
            repetitions = if record.quality >= PASSING_QUALITY {
                repetitions + 1
            } else {
                0
            };
            memorization_confidence =
                self.memorization_confidence(&card.review_history[..index], record.accuracy);
        }

        Some(ReplayedState {
            ease_factor: last.ease_factor,
            interval_days: last.interval_days,
            repetitions,
            due_date: add_days(last.timestamp, last.interval_days),
            last_reviewed: last.timestamp,
            memorization_confidence,
        })
    }
}

/// `from + days`, saturating at the end of chrono's range.
fn add_days(from: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn normalize_accuracy(accuracy: f64) -> f64 {
    (accuracy / 100.0).clamp(0.0, 1.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    match mean(values.iter().copied()) {
        Some(m) => values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64,
        None => 0.0,
    }
}
