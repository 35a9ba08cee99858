//! SM-2 scheduling step.
//!
//! A pure function of a rating and the current review state. Nothing is
//! retained between calls.

use crate::types::Quality;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Easiness floor; no schedule ever carries a lower factor.
pub const MIN_EASINESS: f64 = 1.3;

/// Easiness assigned to a freshly saved word.
pub const INITIAL_EASINESS: f64 = 2.5;

/// Interval after the first successful review (and after any failure).
pub const FIRST_INTERVAL: u32 = 1;

/// Interval after the second consecutive successful review.
pub const SECOND_INTERVAL: u32 = 6;

/// Result of one scheduling step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub repetitions: u32,
    pub easiness: f64,
    pub interval: u32,
}

impl Schedule {
    /// Due date for this schedule when applied on `today`.
    pub fn next_review(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_days(Days::new(u64::from(self.interval)))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Compute the next review state from a rating.
///
/// `easiness` is expected to already respect [`MIN_EASINESS`]; the floor is
/// enforced on the output only.
pub fn compute_next(quality: Quality, repetitions: u32, easiness: f64, interval: u32) -> Schedule {
    let miss = f64::from(5 - quality.value());
    let easiness = (easiness + 0.1 - miss * (0.08 + miss * 0.02)).max(MIN_EASINESS);

    if !quality.is_passing() {
        return Schedule {
            repetitions: 0,
            easiness,
            interval: FIRST_INTERVAL,
        };
    }

    let repetitions = repetitions.saturating_add(1);
    let interval = match repetitions {
        1 => FIRST_INTERVAL,
        2 => SECOND_INTERVAL,
        _ => round_interval(f64::from(interval) * easiness),
    };

    Schedule {
        repetitions,
        easiness,
        interval,
    }
}

/// Round half away from zero, saturating at `u32::MAX`.
fn round_interval(days: f64) -> u32 {
    days.round() as u32
}
