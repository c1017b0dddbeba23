use serde::{Deserialize, Serialize};

use super::item::{ItemKey, SchedulableItem};
use crate::content::cloze::ClozeText;
use crate::srs::ScheduleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
  #[default]
  Basic,
  Cloze,
  Reverse,
  TypeIn,
}

impl CardType {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(Self::Basic),
      "cloze" => Some(Self::Cloze),
      "reverse" => Some(Self::Reverse),
      "typein" => Some(Self::TypeIn),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Basic => "basic",
      Self::Cloze => "cloze",
      Self::Reverse => "reverse",
      Self::TypeIn => "typein",
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      Self::Basic => "Basic (Front/Back)",
      Self::Cloze => "Cloze Deletion",
      Self::Reverse => "Basic + Reverse",
      Self::TypeIn => "Type the Answer",
    }
  }
}

/// An authored flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
  pub id: i64,
  pub card_type: CardType,
  /// Question or prompt (cloze cards carry their deletions here)
  pub front: String,
  pub back: String,
  pub notes: Option<String>,
}

impl Card {
  pub fn new(id: i64, card_type: CardType, front: String, back: String) -> Self {
    Self {
      id,
      card_type,
      front,
      back,
      notes: None,
    }
  }

  /// Keys of the review items this card expands into.
  ///
  /// Cloze cards yield one key per deletion group (ascending); a cloze card
  /// without any valid deletion yields none. Every other type yields one.
  pub fn item_keys(&self) -> Vec<ItemKey> {
    match self.card_type {
      CardType::Cloze => {
        let keys: Vec<ItemKey> = ClozeText::parse(&self.front)
          .groups()
          .iter()
          .map(|&group| ItemKey::cloze(self.id, group))
          .collect();
        if keys.is_empty() {
          tracing::debug!("Cloze card {} has no deletions, no items produced", self.id);
        }
        keys
      }
      CardType::Basic | CardType::Reverse | CardType::TypeIn => vec![ItemKey::whole(self.id)],
    }
  }

  /// Expand into review items, all with fresh schedules
  pub fn items(&self) -> Vec<SchedulableItem> {
    self.items_with(|_| None)
  }

  /// Expand into review items, attaching the stored schedule for each key
  /// when the host has one.
  pub fn items_with(
    &self,
    mut schedule_for: impl FnMut(&ItemKey) -> Option<ScheduleState>,
  ) -> Vec<SchedulableItem> {
    self
      .item_keys()
      .into_iter()
      .map(|key| {
        let schedule = schedule_for(&key).unwrap_or_default();
        SchedulableItem::new(key, self, schedule)
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn card(card_type: CardType, front: &str) -> Card {
    Card::new(7, card_type, front.to_string(), "back".to_string())
  }

  #[test]
  fn test_card_type_from_str() {
    assert_eq!(CardType::from_str("basic"), Some(CardType::Basic));
    assert_eq!(CardType::from_str("cloze"), Some(CardType::Cloze));
    assert_eq!(CardType::from_str("reverse"), Some(CardType::Reverse));
    assert_eq!(CardType::from_str("typein"), Some(CardType::TypeIn));
    assert_eq!(CardType::from_str("Basic"), None);
    assert_eq!(CardType::from_str(""), None);
  }

  #[test]
  fn test_card_type_serde_matches_as_str() {
    for card_type in [CardType::Basic, CardType::Cloze, CardType::Reverse, CardType::TypeIn] {
      let json = serde_json::to_string(&card_type).unwrap();
      assert_eq!(json, format!("\"{}\"", card_type.as_str()));
    }
  }

  #[test]
  fn test_basic_card_has_one_item() {
    let keys = card(CardType::Basic, "Capital of France?").item_keys();
    assert_eq!(keys, vec![ItemKey::whole(7)]);
  }

  #[test]
  fn test_non_cloze_types_ignore_markers() {
    // Markers only mean something on cloze cards
    for card_type in [CardType::Basic, CardType::Reverse, CardType::TypeIn] {
      let keys = card(card_type, "{{g1::a}} {{g2::b}}").item_keys();
      assert_eq!(keys.len(), 1);
    }
  }

  #[test]
  fn test_cloze_card_has_one_item_per_group() {
    let keys = card(CardType::Cloze, "{{g2::b}} {{g1::a}} {{g2::c}}").item_keys();
    assert_eq!(keys, vec![ItemKey::cloze(7, 1), ItemKey::cloze(7, 2)]);
  }

  #[test]
  fn test_cloze_card_without_deletions_has_no_items() {
    assert!(card(CardType::Cloze, "nothing to hide").items().is_empty());
  }

  #[test]
  fn test_items_with_attaches_stored_schedule() {
    let reviewed = crate::srs::compute_next(
      &ScheduleState::new(),
      crate::domain::ReviewQuality::Good,
      chrono::Utc::now(),
    )
    .unwrap();

    let items = card(CardType::Cloze, "{{g1::a}} {{g2::b}}").items_with(|key| {
      if key.group == Some(2) {
        Some(reviewed.clone())
      } else {
        None
      }
    });

    assert_eq!(items.len(), 2);
    assert!(!items[0].schedule().has_been_reviewed());
    assert!(items[1].schedule().has_been_reviewed());
  }
}
