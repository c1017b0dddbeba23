//! Session card selection.
//!
//! Builds the working set for one review session:
//! - Standard: every due item (oldest first), then new items up to what is
//!   left of the daily allowance, truncated to the session size and shuffled
//! - Practice: same selection, but ratings must not reach the scheduler
//! - Struggling: only reviewed low-ease items, hardest first, not shuffled

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::domain::SchedulableItem;

/// Daily allowance of never-reviewed items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewItemCap {
  /// At most this many per day; 0 means no new items at all
  Limited(u32),
  Unlimited,
}

impl NewItemCap {
  /// How many more new items may be shown today, `None` if unbounded
  pub fn remaining(&self, seen_today: u32) -> Option<usize> {
    match self {
      Self::Limited(cap) => Some(cap.saturating_sub(seen_today) as usize),
      Self::Unlimited => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
  #[default]
  Standard,
  Struggling,
  Practice,
}

impl SessionMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Standard => "standard",
      Self::Struggling => "struggling",
      Self::Practice => "practice",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "standard" => Some(Self::Standard),
      "struggling" => Some(Self::Struggling),
      "practice" => Some(Self::Practice),
      _ => None,
    }
  }

  /// Whether ratings from this mode feed the scheduler
  pub fn updates_schedule(&self) -> bool {
    !matches!(self, Self::Practice)
  }
}

/// Everything `select` needs to know about the learner's settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPolicy {
  pub new_items_per_day: NewItemCap,
  /// New items already introduced today, counted by the host
  pub new_items_seen_today: u32,
  /// Final truncation, 0 = unlimited
  pub max_items_per_session: u32,
  pub mode: SessionMode,
  /// Cap for struggling sessions, 0 = unlimited
  pub struggling_session_size: usize,
  /// Items below this ease count as struggling
  pub struggling_ease_threshold: f64,
  /// Repeat struggling items cyclically until the session size is reached
  pub fill_struggling: bool,
}

impl Default for SessionPolicy {
  fn default() -> Self {
    Self {
      new_items_per_day: NewItemCap::Limited(config::DEFAULT_NEW_ITEMS_PER_DAY),
      new_items_seen_today: 0,
      max_items_per_session: config::DEFAULT_MAX_ITEMS_PER_SESSION,
      mode: SessionMode::Standard,
      struggling_session_size: config::STRUGGLING_SESSION_SIZE,
      struggling_ease_threshold: config::STRUGGLING_EASE_THRESHOLD,
      fill_struggling: false,
    }
  }
}

impl SessionPolicy {
  pub fn with_mode(mut self, mode: SessionMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_seen_today(mut self, seen: u32) -> Self {
    self.new_items_seen_today = seen;
    self
  }
}

/// How an item relates to the session it was picked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
  /// Reviewed before and scheduled for now or earlier
  Due,
  /// Never reviewed
  New,
  /// Reviewed, not yet due (struggling and ahead-of-schedule sessions)
  NotDue,
}

impl ItemKind {
  pub fn of(item: &SchedulableItem, now: DateTime<Utc>) -> Self {
    if item.is_new() {
      Self::New
    } else if item.is_due(now) {
      Self::Due
    } else {
      Self::NotDue
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
  pub item: SchedulableItem,
  pub kind: ItemKind,
}

/// The working set for one session
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
  pub items: Vec<SelectedItem>,
  pub mode: SessionMode,
  /// False for practice sessions: ratings must not be passed to the scheduler
  pub scheduling_enabled: bool,
}

impl Selection {
  fn new(items: Vec<SelectedItem>, mode: SessionMode) -> Self {
    Self {
      items,
      mode,
      scheduling_enabled: mode.updates_schedule(),
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// Nothing to review
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn due_count(&self) -> usize {
    self.count(ItemKind::Due)
  }

  pub fn new_count(&self) -> usize {
    self.count(ItemKind::New)
  }

  /// Whether a rating submitted against this session should be scheduled
  pub fn accepts_rating(&self) -> bool {
    self.scheduling_enabled
  }

  fn count(&self, kind: ItemKind) -> usize {
    self.items.iter().filter(|s| s.kind == kind).count()
  }
}

/// Select a session using the thread-local RNG for shuffling.
pub fn select(items: &[SchedulableItem], now: DateTime<Utc>, policy: &SessionPolicy) -> Selection {
  let mut rng = rand::rng();
  select_with(items, now, policy, &mut rng)
}

/// Select a session with a caller-supplied RNG (seed it for reproducible order).
pub fn select_with<R: Rng + ?Sized>(
  items: &[SchedulableItem],
  now: DateTime<Utc>,
  policy: &SessionPolicy,
  rng: &mut R,
) -> Selection {
  let selected = match policy.mode {
    SessionMode::Struggling => select_struggling(items, now, policy),
    SessionMode::Standard | SessionMode::Practice => {
      let mut picked = select_due_and_new(items, now, policy);
      picked.shuffle(rng);
      picked
    }
  };

  let selection = Selection::new(
    selected
      .into_iter()
      .map(|item| SelectedItem {
        kind: ItemKind::of(item, now),
        item: item.clone(),
      })
      .collect(),
    policy.mode,
  );

  tracing::debug!(
    mode = policy.mode.as_str(),
    due = selection.due_count(),
    new = selection.new_count(),
    total = selection.len(),
    "Selected session"
  );

  selection
}

/// Items due at `now`, oldest due date first.
pub fn due_items(items: &[SchedulableItem], now: DateTime<Utc>) -> Vec<&SchedulableItem> {
  let mut due: Vec<&SchedulableItem> = items.iter().filter(|i| i.is_due(now)).collect();
  due.sort_by_key(|i| i.schedule().next_review_at());
  due
}

/// Reviewed items that are not due yet, soonest first, for studying ahead
/// of schedule. `limit` of 0 means no limit.
pub fn select_ahead(
  items: &[SchedulableItem],
  now: DateTime<Utc>,
  limit: usize,
) -> Vec<&SchedulableItem> {
  let mut ahead: Vec<&SchedulableItem> = items
    .iter()
    .filter(|i| !i.is_new() && !i.is_due(now))
    .collect();
  ahead.sort_by_key(|i| i.schedule().next_review_at());
  truncate_if_limited(&mut ahead, limit);
  ahead
}

fn select_due_and_new<'a>(
  items: &'a [SchedulableItem],
  now: DateTime<Utc>,
  policy: &SessionPolicy,
) -> Vec<&'a SchedulableItem> {
  let mut picked = due_items(items, now);

  let new_items = items.iter().filter(|i| i.is_new());
  match policy.new_items_per_day.remaining(policy.new_items_seen_today) {
    Some(remaining) => picked.extend(new_items.take(remaining)),
    None => picked.extend(new_items),
  }

  truncate_if_limited(&mut picked, policy.max_items_per_session as usize);
  picked
}

fn select_struggling<'a>(
  items: &'a [SchedulableItem],
  now: DateTime<Utc>,
  policy: &SessionPolicy,
) -> Vec<&'a SchedulableItem> {
  let mut struggling: Vec<&SchedulableItem> = items
    .iter()
    .filter(|i| !i.is_new() && i.ease_factor() < policy.struggling_ease_threshold)
    .collect();

  // Due first, then lowest ease, then earliest due date
  struggling.sort_by(|a, b| {
    b.is_due(now)
      .cmp(&a.is_due(now))
      .then(a.ease_factor().total_cmp(&b.ease_factor()))
      .then(a.schedule().next_review_at().cmp(&b.schedule().next_review_at()))
  });

  truncate_if_limited(&mut struggling, policy.struggling_session_size);

  if policy.fill_struggling && !struggling.is_empty() && policy.struggling_session_size > 0 {
    let distinct = struggling.len();
    let mut i = 0;
    while struggling.len() < policy.struggling_session_size {
      struggling.push(struggling[i % distinct]);
      i += 1;
    }
  }

  truncate_if_limited(&mut struggling, policy.max_items_per_session as usize);
  struggling
}

fn truncate_if_limited<T>(items: &mut Vec<T>, limit: usize) {
  if limit > 0 {
    items.truncate(limit);
  }
}
