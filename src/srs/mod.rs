pub mod card_selector;
pub mod lifecycle;
pub mod sm2;
pub mod stats;

pub use card_selector::{
  due_items, select, select_ahead, select_with, ItemKind, NewItemCap, SelectedItem, Selection,
  SessionMode, SessionPolicy,
};
pub use lifecycle::{apply_rating, MaturityThreshold, ReviewStatus, Transition};
pub use sm2::{compute_next, review, ScheduleState, SrsError, StoredSchedule};
pub use stats::{estimate_retention, CollectionStats};
