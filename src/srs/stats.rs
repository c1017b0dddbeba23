use chrono::{DateTime, Utc};
use serde::Serialize;

use super::lifecycle::{MaturityThreshold, ReviewStatus};
use super::sm2::{DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR};
use crate::domain::SchedulableItem;

/// Dashboard counts over a set of items
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStats {
  pub total: usize,
  pub new: usize,
  pub learning: usize,
  pub mature: usize,
  pub lapsed: usize,
  pub struggling: usize,
  pub due: usize,
  pub average_ease: f64,
}

impl CollectionStats {
  /// `struggling_ease_threshold` should be the one the session selector uses,
  /// so the count matches what a struggling session would pick up.
  pub fn from_items(
    items: &[SchedulableItem],
    now: DateTime<Utc>,
    threshold: &MaturityThreshold,
    struggling_ease_threshold: f64,
  ) -> Self {
    let mut stats = Self {
      total: items.len(),
      ..Self::default()
    };
    let mut ease_sum = 0.0;

    for item in items {
      match ReviewStatus::of(item.schedule(), threshold) {
        ReviewStatus::New => stats.new += 1,
        ReviewStatus::Learning => stats.learning += 1,
        ReviewStatus::Mature => stats.mature += 1,
        ReviewStatus::Lapsed => stats.lapsed += 1,
      }
      if !item.is_new() && item.ease_factor() < struggling_ease_threshold {
        stats.struggling += 1;
      }
      if item.is_due(now) {
        stats.due += 1;
      }
      ease_sum += item.ease_factor();
    }

    stats.average_ease = if items.is_empty() {
      DEFAULT_EASE_FACTOR
    } else {
      ease_sum / items.len() as f64
    };
    stats
  }
}

/// Rough retention estimate at the scheduled review time.
///
/// Assumes ~90% retention for a well-calibrated item and credits easier items
/// (higher ease) with up to five more points. Informational only.
pub fn estimate_retention(ease_factor: f64) -> f64 {
  let base_retention = 0.9;
  let ease_adjustment = (ease_factor - MIN_EASE_FACTOR) / (DEFAULT_EASE_FACTOR - MIN_EASE_FACTOR);
  (base_retention + 0.05 * ease_adjustment).min(0.99)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config;
  use crate::domain::{Card, CardType};
  use crate::srs::{select, ScheduleState, SessionMode, SessionPolicy, StoredSchedule};
  use chrono::{TimeDelta, TimeZone};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
  }

  fn item(ease_factor: f64, interval_days: i64, repetitions: i64, lapses: i64) -> SchedulableItem {
    let state = ScheduleState::restore(StoredSchedule {
      ease_factor,
      interval_days,
      repetitions,
      next_review_at: Some(now() + TimeDelta::days(interval_days - 2)),
      last_reviewed_at: Some(now() - TimeDelta::days(2)),
      has_been_reviewed: true,
      lapses,
    })
    .unwrap();
    Card::new(1, CardType::Basic, "q".into(), "a".into())
      .items_with(|_| Some(state.clone()))
      .remove(0)
  }

  #[test]
  fn test_counts_by_status() {
    let fresh = Card::new(2, CardType::Basic, "q".into(), "a".into()).items().remove(0);
    let items = vec![
      fresh,
      item(2.5, 1, 1, 0),  // learning, due
      item(2.6, 30, 4, 0), // mature, not due
      item(1.5, 1, 0, 2),  // lapsed, struggling, due
    ];
    let stats = CollectionStats::from_items(
      &items,
      now(),
      &MaturityThreshold::default(),
      config::STRUGGLING_EASE_THRESHOLD,
    );

    assert_eq!(stats.total, 4);
    assert_eq!(stats.new, 1);
    assert_eq!(stats.learning, 1);
    assert_eq!(stats.mature, 1);
    assert_eq!(stats.lapsed, 1);
    assert_eq!(stats.struggling, 1);
    assert_eq!(stats.due, 2);
    assert!((stats.average_ease - (2.5 + 2.5 + 2.6 + 1.5) / 4.0).abs() < 1e-9);
  }

  #[test]
  fn test_struggling_count_follows_selector_threshold() {
    let items = vec![item(1.5, 1, 0, 1), item(2.2, 1, 1, 0), item(2.6, 1, 1, 0)];
    let policy = SessionPolicy {
      struggling_ease_threshold: 2.5,
      ..SessionPolicy::default().with_mode(SessionMode::Struggling)
    };

    let stats = CollectionStats::from_items(
      &items,
      now(),
      &MaturityThreshold::default(),
      policy.struggling_ease_threshold,
    );
    assert_eq!(stats.struggling, 2);
    assert_eq!(select(&items, now(), &policy).len(), stats.struggling);
  }

  #[test]
  fn test_empty_collection() {
    let stats = CollectionStats::from_items(
      &[],
      now(),
      &MaturityThreshold::default(),
      config::STRUGGLING_EASE_THRESHOLD,
    );
    assert_eq!(stats.total, 0);
    assert_eq!(stats.average_ease, DEFAULT_EASE_FACTOR);
  }

  #[test]
  fn test_estimate_retention_bounds() {
    assert!((estimate_retention(MIN_EASE_FACTOR) - 0.9).abs() < 1e-9);
    assert!((estimate_retention(DEFAULT_EASE_FACTOR) - 0.95).abs() < 1e-9);
    assert_eq!(estimate_retention(10.0), 0.99);
  }
}
