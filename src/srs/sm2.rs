use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ReviewOutcome, ReviewQuality};

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
const FIRST_INTERVAL: i64 = 1;
const SECOND_INTERVAL: i64 = 6;

/// Scheduling errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SrsError {
  /// Rating outside 0..=5
  InvalidRating(i64),
  /// Stored schedule values that cannot be scheduled from
  InvalidState(String),
}

impl std::fmt::Display for SrsError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SrsError::InvalidRating(q) => write!(f, "Quality must be between 0 and 5, got {}", q),
      SrsError::InvalidState(reason) => write!(f, "Invalid schedule state: {}", reason),
    }
  }
}

impl SrsError {
  /// Returns a user-facing error message without exposing stored values.
  pub fn user_message(&self) -> &'static str {
    match self {
      SrsError::InvalidRating(_) => "Quality must be 0-5",
      SrsError::InvalidState(_) => "Card schedule is corrupted and needs a reset",
    }
  }
}

impl std::error::Error for SrsError {}

/// Persisted form of a schedule, as the host stores it.
///
/// Turning one back into a [`ScheduleState`] goes through
/// [`ScheduleState::restore`], which rejects corrupted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSchedule {
  pub ease_factor: f64,
  pub interval_days: i64,
  pub repetitions: i64,
  pub next_review_at: Option<DateTime<Utc>>,
  pub last_reviewed_at: Option<DateTime<Utc>>,
  pub has_been_reviewed: bool,
  #[serde(default)]
  pub lapses: i64,
}

/// SM-2 schedule of one reviewable item.
///
/// There are no setters: a state is either fresh, restored from storage, or
/// the output of [`compute_next`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredSchedule", into = "StoredSchedule")]
pub struct ScheduleState {
  ease_factor: f64,
  interval_days: i64,
  repetitions: i64,
  next_review_at: Option<DateTime<Utc>>,
  last_reviewed_at: Option<DateTime<Utc>>,
  has_been_reviewed: bool,
  lapses: i64,
}

impl Default for ScheduleState {
  fn default() -> Self {
    Self::new()
  }
}

impl ScheduleState {
  /// State of an item that has never been rated
  pub fn new() -> Self {
    Self {
      ease_factor: DEFAULT_EASE_FACTOR,
      interval_days: 0,
      repetitions: 0,
      next_review_at: None,
      last_reviewed_at: None,
      has_been_reviewed: false,
      lapses: 0,
    }
  }

  /// Rehydrate a persisted schedule.
  pub fn restore(stored: StoredSchedule) -> Result<Self, SrsError> {
    let state = Self {
      ease_factor: stored.ease_factor,
      interval_days: stored.interval_days,
      repetitions: stored.repetitions,
      next_review_at: stored.next_review_at,
      last_reviewed_at: stored.last_reviewed_at,
      has_been_reviewed: stored.has_been_reviewed,
      lapses: stored.lapses,
    };
    state.validate()?;
    Ok(state)
  }

  pub fn to_stored(&self) -> StoredSchedule {
    StoredSchedule {
      ease_factor: self.ease_factor,
      interval_days: self.interval_days,
      repetitions: self.repetitions,
      next_review_at: self.next_review_at,
      last_reviewed_at: self.last_reviewed_at,
      has_been_reviewed: self.has_been_reviewed,
      lapses: self.lapses,
    }
  }

  /// Deck reset: back to the never-reviewed state
  pub fn reset(&self) -> Self {
    Self::new()
  }

  pub fn ease_factor(&self) -> f64 {
    self.ease_factor
  }

  pub fn interval_days(&self) -> i64 {
    self.interval_days
  }

  pub fn repetitions(&self) -> i64 {
    self.repetitions
  }

  pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
    self.next_review_at
  }

  pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
    self.last_reviewed_at
  }

  pub fn has_been_reviewed(&self) -> bool {
    self.has_been_reviewed
  }

  /// Failures that broke a streak of successful recalls
  pub fn lapses(&self) -> i64 {
    self.lapses
  }

  /// Reviewed before and scheduled for `now` or earlier
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.has_been_reviewed && self.next_review_at.is_some_and(|due| due <= now)
  }

  fn validate(&self) -> Result<(), SrsError> {
    if !self.ease_factor.is_finite() || self.ease_factor < 0.0 {
      return Err(SrsError::InvalidState(format!(
        "ease factor {} is not a finite non-negative number",
        self.ease_factor
      )));
    }
    if self.interval_days < 0 {
      return Err(SrsError::InvalidState(format!(
        "negative interval {}",
        self.interval_days
      )));
    }
    if self.repetitions < 0 {
      return Err(SrsError::InvalidState(format!(
        "negative repetition count {}",
        self.repetitions
      )));
    }
    if self.lapses < 0 {
      return Err(SrsError::InvalidState(format!("negative lapse count {}", self.lapses)));
    }
    if self.interval_days == 0 && self.repetitions > 0 {
      return Err(SrsError::InvalidState(format!(
        "{} repetitions with a zero interval",
        self.repetitions
      )));
    }
    if !self.has_been_reviewed
      && (self.repetitions > 0
        || self.interval_days > 0
        || self.lapses > 0
        || self.next_review_at.is_some()
        || self.last_reviewed_at.is_some())
    {
      return Err(SrsError::InvalidState(
        "never-reviewed item carries review history".to_string(),
      ));
    }
    Ok(())
  }
}

impl TryFrom<StoredSchedule> for ScheduleState {
  type Error = SrsError;

  fn try_from(stored: StoredSchedule) -> Result<Self, Self::Error> {
    Self::restore(stored)
  }
}

impl From<ScheduleState> for StoredSchedule {
  fn from(state: ScheduleState) -> Self {
    state.to_stored()
  }
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3
pub fn next_ease_factor(current_ease_factor: f64, quality: ReviewQuality) -> f64 {
  let q = quality.value() as f64;
  let ease_delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
  (current_ease_factor + ease_delta).max(MIN_EASE_FACTOR)
}

/// Apply one rating to a schedule.
///
/// Quality: 0-2 fail, 3-5 pass.
///
/// - Ease is adjusted on every rating, failures included.
/// - Fail: interval 1 day, repetitions reset to 0.
/// - Pass: 1 day after the first success, 6 after the second, then the
///   previous interval times the updated ease, rounded, at least 1 day.
pub fn compute_next(
  state: &ScheduleState,
  quality: ReviewQuality,
  now: DateTime<Utc>,
) -> Result<ScheduleState, SrsError> {
  if let Err(e) = state.validate() {
    tracing::warn!("Refusing to schedule from corrupted state: {}", e);
    return Err(e);
  }

  let ease_factor = next_ease_factor(state.ease_factor, quality);

  let (interval_days, repetitions, lapses) = if !quality.is_correct() {
    // A failure only counts as a lapse when it breaks a streak
    let lapses = if state.repetitions > 0 {
      state.lapses + 1
    } else {
      state.lapses
    };
    (FIRST_INTERVAL, 0, lapses)
  } else {
    let interval = match state.repetitions {
      0 => FIRST_INTERVAL,
      1 => SECOND_INTERVAL,
      _ => grown_interval(state.interval_days, ease_factor)?,
    };
    (interval, state.repetitions + 1, state.lapses)
  };

  let next_review_at = TimeDelta::try_days(interval_days)
    .and_then(|delta| now.checked_add_signed(delta))
    .ok_or_else(|| {
      SrsError::InvalidState(format!("interval of {} days overflows the calendar", interval_days))
    })?;

  Ok(ScheduleState {
    ease_factor,
    interval_days,
    repetitions,
    next_review_at: Some(next_review_at),
    last_reviewed_at: Some(now),
    has_been_reviewed: true,
    lapses,
  })
}

fn grown_interval(interval_days: i64, ease_factor: f64) -> Result<i64, SrsError> {
  // f64::round rounds half away from zero
  let grown = ((interval_days as f64) * ease_factor).round().max(FIRST_INTERVAL as f64);
  if grown >= i64::MAX as f64 {
    return Err(SrsError::InvalidState(format!(
      "interval {} cannot grow any further",
      interval_days
    )));
  }
  Ok(grown as i64)
}

/// Validate a raw rating, schedule it, and describe what changed.
pub fn review(
  state: &ScheduleState,
  rating: i64,
  now: DateTime<Utc>,
) -> Result<(ScheduleState, ReviewOutcome), SrsError> {
  let quality = ReviewQuality::from_rating(rating)?;
  let next = compute_next(state, quality, now)?;

  let outcome = ReviewOutcome {
    quality: quality.value(),
    ease_factor_before: state.ease_factor,
    ease_factor_after: next.ease_factor,
    interval_before: state.interval_days,
    interval_after: next.interval_days,
    reviewed_at: now,
  };

  tracing::debug!(
    quality = outcome.quality,
    interval_before = outcome.interval_before,
    interval_after = outcome.interval_after,
    "Scheduled review"
  );

  Ok((next, outcome))
}
