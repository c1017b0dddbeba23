use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::srs::SrsError;

/// Recall quality on the 0-5 SM-2 scale.
///
/// Ratings below `Hard` are failures. `WrongEasy` and `WrongHard` schedule
/// identically; they stay distinct so review logs keep what the learner chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewQuality {
  Blackout = 0,  // No recognition at all
  WrongEasy = 1, // Wrong, but the answer seemed easy once seen
  WrongHard = 2, // Wrong, but remembered on seeing the answer
  Hard = 3,      // Correct with serious difficulty
  Good = 4,      // Correct after some hesitation
  Easy = 5,      // Immediate recall
}

impl ReviewQuality {
  /// Lowest rating that counts as a successful recall
  pub const PASSING: u8 = 3;

  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(Self::Blackout),
      1 => Some(Self::WrongEasy),
      2 => Some(Self::WrongHard),
      3 => Some(Self::Hard),
      4 => Some(Self::Good),
      5 => Some(Self::Easy),
      _ => None,
    }
  }

  /// Validate a raw rating submitted by a caller.
  ///
  /// Out-of-range values are rejected rather than clamped so a bad request can
  /// never end up in the scheduling history.
  pub fn from_rating(rating: i64) -> Result<Self, SrsError> {
    u8::try_from(rating)
      .ok()
      .and_then(Self::from_u8)
      .ok_or(SrsError::InvalidRating(rating))
  }

  pub fn value(&self) -> u8 {
    *self as u8
  }

  pub fn is_correct(&self) -> bool {
    self.value() >= Self::PASSING
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Blackout => "blackout",
      Self::WrongEasy => "wrong_easy",
      Self::WrongHard => "wrong_hard",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "blackout" => Some(Self::Blackout),
      "wrong_easy" => Some(Self::WrongEasy),
      "wrong_hard" => Some(Self::WrongHard),
      "hard" => Some(Self::Hard),
      "good" => Some(Self::Good),
      "easy" => Some(Self::Easy),
      _ => None,
    }
  }

  /// Button label shown to the learner
  pub fn label(&self) -> &'static str {
    match self {
      Self::Blackout => "Again",
      Self::WrongEasy => "Wrong (easy)",
      Self::WrongHard => "Wrong (hard)",
      Self::Hard => "Hard",
      Self::Good => "Good",
      Self::Easy => "Easy",
    }
  }
}

/// What a single rating did to an item's schedule.
///
/// Handed back to the host for durable logging; nothing here is persisted by
/// the crate itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
  pub quality: u8,
  pub ease_factor_before: f64,
  pub ease_factor_after: f64,
  pub interval_before: i64,
  pub interval_after: i64,
  pub reviewed_at: DateTime<Utc>,
}

impl ReviewOutcome {
  pub fn is_correct(&self) -> bool {
    self.quality >= ReviewQuality::PASSING
  }

  /// Change in ease caused by this rating
  pub fn ease_delta(&self) -> f64 {
    self.ease_factor_after - self.ease_factor_before
  }
}
