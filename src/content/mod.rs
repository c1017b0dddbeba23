//! Card content: cloze deletion text and the deck interchange format.
//!
//! - **Cloze**: parses `{{gN::answer::hint}}` deletions and renders the
//!   question/answer side for each deletion group
//! - **Deck**: JSON import/export of whole decks, with cloze validation

pub mod cloze;
pub mod deck;

pub use cloze::{is_valid_cloze, validate_cloze_syntax, ClozeSyntaxError, ClozeText, Deletion};
pub use deck::{load_deck, parse_deck, DeckCard, DeckDocument, DeckError, DeckIssue};
