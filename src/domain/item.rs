use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{Card, CardType};
use super::review::ReviewOutcome;
use crate::content::cloze::ClozeText;
use crate::srs::{self, ScheduleState, SrsError};

/// Identity under which an item's schedule is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
  pub card_id: i64,
  /// Active deletion group for cloze cards, `None` for whole-card items
  pub group: Option<u32>,
}

impl ItemKey {
  pub fn whole(card_id: i64) -> Self {
    Self {
      card_id,
      group: None,
    }
  }

  pub fn cloze(card_id: i64, group: u32) -> Self {
    Self {
      card_id,
      group: Some(group),
    }
  }
}

/// One reviewable unit derived from a card.
///
/// Only the schedule is worth persisting; the rest is rebuilt from the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulableItem {
  pub key: ItemKey,
  pub card_type: CardType,
  pub front: String,
  pub back: String,
  pub notes: Option<String>,
  schedule: ScheduleState,
}

impl SchedulableItem {
  pub fn new(key: ItemKey, card: &Card, schedule: ScheduleState) -> Self {
    Self {
      key,
      card_type: card.card_type,
      front: card.front.clone(),
      back: card.back.clone(),
      notes: card.notes.clone(),
      schedule,
    }
  }

  pub fn schedule(&self) -> &ScheduleState {
    &self.schedule
  }

  pub fn ease_factor(&self) -> f64 {
    self.schedule.ease_factor()
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.schedule.is_due(now)
  }

  pub fn is_new(&self) -> bool {
    !self.schedule.has_been_reviewed()
  }

  /// Question side as shown to the learner
  pub fn question(&self) -> String {
    match self.key.group {
      Some(group) => ClozeText::parse(&self.front).question(group),
      None => self.front.clone(),
    }
  }

  /// Answer side as shown after reveal.
  ///
  /// Cloze items show the full text with their own deletion highlighted,
  /// followed by the back text when there is any.
  pub fn answer(&self) -> String {
    match self.key.group {
      Some(group) => {
        let revealed = ClozeText::parse(&self.front).answer(group);
        if self.back.trim().is_empty() {
          revealed
        } else {
          format!("{}\n\n{}", revealed, self.back)
        }
      }
      None => self.back.clone(),
    }
  }

  /// Rate this item, replacing its schedule with the engine's result.
  pub fn rate(&mut self, rating: i64, now: DateTime<Utc>) -> Result<ReviewOutcome, SrsError> {
    let (next, outcome) = srs::review(&self.schedule, rating, now)?;
    self.schedule = next;
    Ok(outcome)
  }

  /// Deck reset for this item
  pub fn reset(&mut self) {
    self.schedule = self.schedule.reset();
  }
}
