pub mod card;
pub mod item;
pub mod review;

pub use card::{Card, CardType};
pub use item::{ItemKey, SchedulableItem};
pub use review::{ReviewOutcome, ReviewQuality};
