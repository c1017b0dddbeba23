//! Application configuration constants.
//!
//! Policy values live here rather than inside the scheduler so the host can
//! change them. Session settings can be overridden from `config.toml` or the
//! environment.

use serde::Deserialize;
use std::path::Path;

use crate::srs::{NewItemCap, SessionMode, SessionPolicy};

// ==================== Maturity ====================

/// Successful repetitions before an item can count as mature
pub const MATURE_REPETITIONS: i64 = 2;

/// Interval (days) from which an item counts as mature
pub const MATURE_INTERVAL_DAYS: i64 = 21;

// ==================== Session Defaults ====================

/// New items introduced per day
pub const DEFAULT_NEW_ITEMS_PER_DAY: u32 = 20;

/// Items per session (0 = unlimited)
pub const DEFAULT_MAX_ITEMS_PER_SESSION: u32 = 0;

/// Target size of a struggling-items session
pub const STRUGGLING_SESSION_SIZE: usize = 20;

/// Items with an ease factor below this count as struggling
pub const STRUGGLING_EASE_THRESHOLD: f64 = 2.0;

// ==================== Config File ====================

pub const CONFIG_FILE: &str = "config.toml";

const ENV_NEW_ITEMS_PER_DAY: &str = "RECALL_NEW_ITEMS_PER_DAY";
const ENV_MAX_ITEMS_PER_SESSION: &str = "RECALL_MAX_ITEMS_PER_SESSION";
const ENV_STRUGGLING_SESSION_SIZE: &str = "RECALL_STRUGGLING_SESSION_SIZE";

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    session: Option<FileSessionConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileSessionConfig {
    new_items_per_day: Option<CapSetting>,
    max_items_per_session: Option<u32>,
    struggling_session_size: Option<usize>,
    fill_struggling: Option<bool>,
}

/// `new_items_per_day = 15` or `new_items_per_day = "unlimited"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CapSetting {
    Count(u32),
    Keyword(String),
}

fn parse_cap(value: &str) -> Option<NewItemCap> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("unlimited") {
        return Some(NewItemCap::Unlimited);
    }
    value.parse().ok().map(NewItemCap::Limited)
}

impl CapSetting {
    fn to_cap(&self) -> Option<NewItemCap> {
        match self {
            CapSetting::Count(n) => Some(NewItemCap::Limited(*n)),
            CapSetting::Keyword(s) => parse_cap(s),
        }
    }
}

/// Session settings resolved from file, environment and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub new_items_per_day: NewItemCap,
    pub max_items_per_session: u32,
    pub struggling_session_size: usize,
    pub fill_struggling: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            new_items_per_day: NewItemCap::Limited(DEFAULT_NEW_ITEMS_PER_DAY),
            max_items_per_session: DEFAULT_MAX_ITEMS_PER_SESSION,
            struggling_session_size: STRUGGLING_SESSION_SIZE,
            fill_struggling: false,
        }
    }
}

impl SessionConfig {
    /// Build the selector policy for one session
    pub fn to_policy(&self, mode: SessionMode, new_items_seen_today: u32) -> SessionPolicy {
        SessionPolicy {
            new_items_per_day: self.new_items_per_day,
            new_items_seen_today,
            max_items_per_session: self.max_items_per_session,
            mode,
            struggling_session_size: self.struggling_session_size,
            struggling_ease_threshold: STRUGGLING_EASE_THRESHOLD,
            fill_struggling: self.fill_struggling,
        }
    }
}

/// Load session settings with priority: config.toml > .env / environment > default
pub fn load_session_config() -> SessionConfig {
    load_session_config_from(Path::new(CONFIG_FILE))
}

/// Same as [`load_session_config`] with an explicit config file path
pub fn load_session_config_from(path: &Path) -> SessionConfig {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let file = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
            Ok(config) => {
                tracing::info!("Using session settings from {}", path.display());
                config.session
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
                None
            }
        },
        Err(_) => None,
    };

    resolve_session_config(file.as_ref(), |key| std::env::var(key).ok())
}

/// Parse the `[session]` table of a config file
pub fn parse_session_config(contents: &str) -> Result<SessionConfig, toml::de::Error> {
    let config: AppConfig = toml::from_str(contents)?;
    Ok(resolve_session_config(config.session.as_ref(), |_| None))
}

fn resolve_session_config(
    file: Option<&FileSessionConfig>,
    env: impl Fn(&str) -> Option<String>,
) -> SessionConfig {
    let defaults = SessionConfig::default();

    let new_items_per_day = file
        .and_then(|f| f.new_items_per_day.as_ref())
        .and_then(CapSetting::to_cap)
        .or_else(|| env(ENV_NEW_ITEMS_PER_DAY).and_then(|v| parse_cap(&v)))
        .unwrap_or(defaults.new_items_per_day);

    let max_items_per_session = file
        .and_then(|f| f.max_items_per_session)
        .or_else(|| env(ENV_MAX_ITEMS_PER_SESSION).and_then(|v| v.trim().parse().ok()))
        .unwrap_or(defaults.max_items_per_session);

    let struggling_session_size = file
        .and_then(|f| f.struggling_session_size)
        .or_else(|| env(ENV_STRUGGLING_SESSION_SIZE).and_then(|v| v.trim().parse().ok()))
        .unwrap_or(defaults.struggling_session_size);

    let fill_struggling = file
        .and_then(|f| f.fill_struggling)
        .unwrap_or(defaults.fill_struggling);

    SessionConfig {
        new_items_per_day,
        max_items_per_session,
        struggling_session_size,
        fill_struggling,
    }
}
