//! Deck interchange: the JSON document used to import and export decks.
//!
//! ```json
//! {
//!   "name": "Geography",
//!   "description": "Capitals",
//!   "cards": [
//!     { "card_type": "cloze", "front": "{{g1::Paris}} is in France", "back": "" }
//!   ]
//! }
//! ```
//!
//! Import is lenient about individual cards: entries without a `front` are
//! skipped and unknown card types fall back to `basic`. A missing `name` or
//! `cards` field rejects the whole document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::cloze::{validate_cloze_syntax, ClozeSyntaxError};
use crate::domain::{Card, CardType, SchedulableItem};

/// One card in a deck document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckCard {
    pub card_type: CardType,
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A whole deck as exchanged between installations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    pub cards: Vec<DeckCard>,
}

/// Cloze problems found in one card of a deck
#[derive(Debug, Clone, PartialEq)]
pub struct DeckIssue {
    /// Position of the card in the deck
    pub index: usize,
    pub errors: Vec<ClozeSyntaxError>,
}

impl DeckDocument {
    /// Build an export document from authored cards.
    pub fn export(name: &str, description: &str, cards: &[Card], now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            exported_at: Some(now),
            cards: cards
                .iter()
                .map(|card| DeckCard {
                    card_type: card.card_type,
                    front: card.front.clone(),
                    back: card.back.clone(),
                    notes: card.notes.clone(),
                })
                .collect(),
        }
    }

    /// Turn the document's cards into authored cards with ids counting up
    /// from `first_id`.
    pub fn to_cards(&self, first_id: i64) -> Vec<Card> {
        self.cards
            .iter()
            .zip(first_id..)
            .map(|(deck_card, id)| Card {
                id,
                card_type: deck_card.card_type,
                front: deck_card.front.clone(),
                back: deck_card.back.clone(),
                notes: deck_card.notes.clone(),
            })
            .collect()
    }

    /// Every review item the deck expands into, all unreviewed
    pub fn items(&self, first_id: i64) -> Vec<SchedulableItem> {
        self.to_cards(first_id).iter().flat_map(Card::items).collect()
    }

    /// Run the authoring-time cloze check over every cloze card.
    pub fn validate(&self) -> Vec<DeckIssue> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.card_type == CardType::Cloze)
            .filter_map(|(index, card)| {
                let errors = validate_cloze_syntax(&card.front);
                (!errors.is_empty()).then_some(DeckIssue { index, errors })
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, DeckError> {
        serde_json::to_string_pretty(self).map_err(|e| DeckError::Parse(e.to_string()))
    }
}

/// Parse a deck document, applying the lenient per-card rules.
pub fn parse_deck(json: &str) -> Result<DeckDocument, DeckError> {
    let data: Value = serde_json::from_str(json).map_err(|e| DeckError::Parse(e.to_string()))?;

    let name = data
        .get("name")
        .and_then(Value::as_str)
        .ok_or(DeckError::MissingField("name"))?;

    let entries = data
        .get("cards")
        .and_then(Value::as_array)
        .ok_or(DeckError::MissingField("cards"))?;

    let description = data
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let exported_at = data
        .get("exported_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let mut cards = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(front) = entry.get("front").and_then(Value::as_str) else {
            tracing::debug!("Skipping deck card without a front");
            continue;
        };

        let card_type = match entry.get("card_type").and_then(Value::as_str) {
            Some(raw) => CardType::from_str(raw).unwrap_or_else(|| {
                tracing::debug!("Unknown card type '{}', importing as basic", raw);
                CardType::Basic
            }),
            None => CardType::Basic,
        };

        cards.push(DeckCard {
            card_type,
            front: front.to_string(),
            back: text_field(entry, "back").unwrap_or_default(),
            notes: text_field(entry, "notes").filter(|n| !n.is_empty()),
        });
    }

    tracing::debug!("Parsed deck '{}' with {} of {} cards", name, cards.len(), entries.len());

    Ok(DeckDocument {
        name: name.to_string(),
        description: description.to_string(),
        exported_at,
        cards,
    })
}

fn text_field(entry: &Value, key: &str) -> Option<String> {
    entry.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Load a deck document from a JSON file.
pub fn load_deck(path: &Path) -> Result<DeckDocument, DeckError> {
    if !path.exists() {
        return Err(DeckError::FileNotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| DeckError::IoError(path.display().to_string(), e.to_string()))?;

    parse_deck(&content)
}

/// Deck interchange errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckError {
    FileNotFound(String),
    IoError(String, String),
    Parse(String),
    MissingField(&'static str),
}

impl std::fmt::Display for DeckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckError::FileNotFound(path) => write!(f, "Deck file not found: {}", path),
            DeckError::IoError(path, err) => write!(f, "IO error reading {}: {}", path, err),
            DeckError::Parse(err) => write!(f, "Invalid deck JSON: {}", err),
            DeckError::MissingField("cards") => {
                write!(f, "Invalid deck file: missing or invalid \"cards\" field")
            }
            DeckError::MissingField(field) => {
                write!(f, "Invalid deck file: missing \"{}\" field", field)
            }
        }
    }
}

impl DeckError {
    /// Returns a user-facing error message without exposing filesystem paths.
    pub fn user_message(&self) -> &'static str {
        match self {
            DeckError::FileNotFound(_) => "Deck file not found",
            DeckError::IoError(_, _) => "Failed to read deck file",
            DeckError::Parse(_) => "Deck file is not valid JSON",
            DeckError::MissingField(_) => "Deck file is missing required fields",
        }
    }
}

impl std::error::Error for DeckError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "name": "Geography",
        "description": "Capitals of Europe",
        "exported_at": "2024-02-01T10:00:00+00:00",
        "cards": [
            { "card_type": "cloze", "front": "{{g1::Paris}} is the capital of {{g2::France}}", "back": "" },
            { "card_type": "basic", "front": "Capital of Italy?", "back": "Rome", "notes": "Lazio" },
            { "card_type": "flashy", "front": "Capital of Spain?", "back": "Madrid" },
            { "card_type": "basic", "back": "no front, skipped" },
            { "front": "Capital of Portugal?" }
        ]
    }"#;

    #[test]
    fn test_parse_deck_lenient_cards() {
        let deck = parse_deck(SAMPLE).unwrap();
        assert_eq!(deck.name, "Geography");
        assert_eq!(deck.description, "Capitals of Europe");
        assert_eq!(
            deck.exported_at,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(deck.cards.len(), 4);
        assert_eq!(deck.cards[0].card_type, CardType::Cloze);
        assert_eq!(deck.cards[1].notes.as_deref(), Some("Lazio"));
        assert_eq!(deck.cards[2].card_type, CardType::Basic); // unknown type
        assert_eq!(deck.cards[3].card_type, CardType::Basic); // missing type
        assert_eq!(deck.cards[3].back, "");
    }

    #[test]
    fn test_parse_deck_requires_name_and_cards() {
        assert_eq!(
            parse_deck(r#"{"cards": []}"#),
            Err(DeckError::MissingField("name"))
        );
        assert_eq!(
            parse_deck(r#"{"name": "x", "cards": "nope"}"#),
            Err(DeckError::MissingField("cards"))
        );
        assert!(matches!(parse_deck("not json"), Err(DeckError::Parse(_))));
    }

    #[test]
    fn test_deck_expands_into_items() {
        let deck = parse_deck(SAMPLE).unwrap();
        let items = deck.items(100);
        // 2 cloze groups + 3 single-item cards
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].key.card_id, 100);
        assert_eq!(items[0].key.group, Some(1));
        assert_eq!(items[1].key.group, Some(2));
        assert_eq!(items[4].key.card_id, 103);
        assert!(items.iter().all(|i| i.is_new()));
    }

    #[test]
    fn test_validate_flags_broken_cloze_cards() {
        let deck = parse_deck(
            r#"{"name": "d", "cards": [
                {"card_type": "cloze", "front": "{{g1::fine}}"},
                {"card_type": "cloze", "front": "no deletions"},
                {"card_type": "basic", "front": "no deletions is fine here"}
            ]}"#,
        )
        .unwrap();
        let issues = deck.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 1);
        assert_eq!(issues[0].errors, vec![ClozeSyntaxError::NoDeletions]);
    }

    #[test]
    fn test_export_then_import_keeps_cards() {
        let cards = vec![
            Card::new(1, CardType::TypeIn, "Spell 'necessary'".into(), "necessary".into()),
            Card {
                notes: Some("mnemonic".into()),
                ..Card::new(2, CardType::Reverse, "dog".into(), "perro".into())
            },
        ];
        let now = Utc.with_ymd_and_hms(2024, 4, 4, 4, 4, 4).unwrap();
        let exported = DeckDocument::export("Spanish", "", &cards, now);
        let json = exported.to_json().unwrap();
        let imported = parse_deck(&json).unwrap();
        assert_eq!(imported, exported);
        assert_eq!(imported.to_cards(1), cards);
    }

    #[test]
    fn test_load_deck_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let deck = load_deck(file.path()).unwrap();
        assert_eq!(deck.cards.len(), 4);
    }

    #[test]
    fn test_load_missing_deck() {
        let err = load_deck(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, DeckError::FileNotFound(_)));
        assert_eq!(err.user_message(), "Deck file not found");
    }
}
