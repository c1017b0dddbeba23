//! Review lifecycle of a single item: New -> Learning -> Mature, with lapses.
//!
//! The status is derived from the schedule, never stored. The only way to move
//! an item between statuses is to rate it through [`super::sm2::review`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sm2::{review, ScheduleState, SrsError};
use crate::config;
use crate::domain::ReviewOutcome;

/// Where an item stands in its review lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
  New,
  Learning,
  Mature,
  Lapsed,
}

/// Policy for when an item counts as mature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturityThreshold {
  pub repetitions: i64,
  pub interval_days: i64,
}

impl Default for MaturityThreshold {
  fn default() -> Self {
    Self {
      repetitions: config::MATURE_REPETITIONS,
      interval_days: config::MATURE_INTERVAL_DAYS,
    }
  }
}

impl ReviewStatus {
  pub fn of(state: &ScheduleState, threshold: &MaturityThreshold) -> Self {
    if !state.has_been_reviewed() {
      return Self::New;
    }
    if state.repetitions() == 0 && state.lapses() > 0 {
      return Self::Lapsed;
    }
    if state.repetitions() >= threshold.repetitions
      && state.interval_days() >= threshold.interval_days
    {
      return Self::Mature;
    }
    Self::Learning
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Learning => "learning",
      Self::Mature => "mature",
      Self::Lapsed => "lapsed",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "new" => Some(Self::New),
      "learning" => Some(Self::Learning),
      "mature" => Some(Self::Mature),
      "lapsed" => Some(Self::Lapsed),
      _ => None,
    }
  }
}

/// Result of rating an item: the new schedule plus the status change it caused
#[derive(Debug, Clone)]
pub struct Transition {
  pub from: ReviewStatus,
  pub to: ReviewStatus,
  pub state: ScheduleState,
  pub outcome: ReviewOutcome,
}

impl Transition {
  pub fn changed(&self) -> bool {
    self.from != self.to
  }
}

/// Rate an item and report the lifecycle transition
pub fn apply_rating(
  state: &ScheduleState,
  rating: i64,
  now: DateTime<Utc>,
  threshold: &MaturityThreshold,
) -> Result<Transition, SrsError> {
  let from = ReviewStatus::of(state, threshold);
  let (next, outcome) = review(state, rating, now)?;
  let to = ReviewStatus::of(&next, threshold);

  if from != to {
    tracing::debug!("Review status {} -> {}", from.as_str(), to.as_str());
  }

  Ok(Transition {
    from,
    to,
    state: next,
    outcome,
  })
}
