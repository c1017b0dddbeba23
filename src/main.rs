use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recall_deck::config;
use recall_deck::content::{load_deck, DeckDocument};
use recall_deck::domain::{Card, ItemKey, SchedulableItem};
use recall_deck::srs::{self, CollectionStats, MaturityThreshold, SessionMode};

/// Build a review session from a deck file
#[derive(Debug, Parser)]
#[command(name = "recall-deck", version)]
struct Args {
  /// Deck interchange JSON file
  deck: PathBuf,

  /// Stored schedules: JSON array of {"key": {...}, "schedule": {...}}
  #[arg(long)]
  states: Option<PathBuf>,

  #[arg(long, value_enum, default_value_t = ModeArg::Standard)]
  mode: ModeArg,

  /// New items already introduced today
  #[arg(long, default_value_t = 0)]
  seen_today: u32,

  /// Seed for a reproducible shuffle
  #[arg(long)]
  seed: Option<u64>,

  /// Session time (RFC 3339), defaults to now
  #[arg(long)]
  now: Option<DateTime<Utc>>,

  /// Session config file
  #[arg(long, default_value = config::CONFIG_FILE)]
  config: PathBuf,

  /// Only check cloze syntax of the deck
  #[arg(long)]
  validate: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
  Standard,
  Struggling,
  Practice,
}

impl From<ModeArg> for SessionMode {
  fn from(mode: ModeArg) -> Self {
    match mode {
      ModeArg::Standard => SessionMode::Standard,
      ModeArg::Struggling => SessionMode::Struggling,
      ModeArg::Practice => SessionMode::Practice,
    }
  }
}

#[derive(Debug, Deserialize)]
struct StoredEntry {
  key: ItemKey,
  schedule: srs::ScheduleState,
}

fn load_states(path: &Path) -> Result<HashMap<ItemKey, srs::ScheduleState>, String> {
  let content = std::fs::read_to_string(path)
    .map_err(|e| format!("IO error reading {}: {}", path.display(), e))?;
  let entries: Vec<StoredEntry> = serde_json::from_str(&content)
    .map_err(|e| format!("Invalid schedule file {}: {}", path.display(), e))?;
  Ok(entries.into_iter().map(|e| (e.key, e.schedule)).collect())
}

fn report_validation(deck: &DeckDocument) -> bool {
  let issues = deck.validate();
  for issue in &issues {
    for error in &issue.errors {
      println!("card {}: {}", issue.index + 1, error);
    }
  }
  if issues.is_empty() {
    println!("{}: {} cards OK", deck.name, deck.cards.len());
  }
  issues.is_empty()
}

fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recall_deck=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let args = Args::parse();

  let deck = match load_deck(&args.deck) {
    Ok(deck) => deck,
    Err(e) => {
      tracing::error!("{}", e);
      std::process::exit(1);
    }
  };

  if args.validate {
    let ok = report_validation(&deck);
    std::process::exit(if ok { 0 } else { 1 });
  }

  let states = match args.states.as_deref().map(load_states).transpose() {
    Ok(states) => states.unwrap_or_default(),
    Err(e) => {
      tracing::error!("{}", e);
      std::process::exit(1);
    }
  };

  let items: Vec<SchedulableItem> = deck
    .to_cards(1)
    .iter()
    .flat_map(|card: &Card| card.items_with(|key| states.get(key).cloned()))
    .collect();

  let now = args.now.unwrap_or_else(Utc::now);
  let session_config = config::load_session_config_from(&args.config);
  let policy = session_config.to_policy(args.mode.into(), args.seen_today);

  let selection = match args.seed {
    Some(seed) => srs::select_with(&items, now, &policy, &mut StdRng::seed_from_u64(seed)),
    None => srs::select(&items, now, &policy),
  };

  let stats = CollectionStats::from_items(
    &items,
    now,
    &MaturityThreshold::default(),
    policy.struggling_ease_threshold,
  );
  tracing::info!(
    "Deck '{}': {} items, {} new, {} due, {} struggling",
    deck.name,
    stats.total,
    stats.new,
    stats.due,
    stats.struggling
  );

  if selection.is_empty() {
    println!("No cards due for review!");
    return;
  }

  println!(
    "{} session: {} items ({} due, {} new){}",
    selection.mode.as_str(),
    selection.len(),
    selection.due_count(),
    selection.new_count(),
    if selection.accepts_rating() { "" } else { " - practice, schedules unchanged" }
  );
  for (n, selected) in selection.items.iter().enumerate() {
    println!();
    println!("#{} [{:?}] {}", n + 1, selected.kind, selected.item.question());
    println!("    -> {}", selected.item.answer());
  }
}
