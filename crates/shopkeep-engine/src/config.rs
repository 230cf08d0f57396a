//! # Engine Configuration
//!
//! Settings read once at startup. Read-only afterwards.
//!
//! ## Sources (priority order)
//! 1. Environment variables (`SHOPKEEP_*`)
//! 2. Defaults (this file)
//!
//! ```text
//! SHOPKEEP_DB_PATH               database file   (platform data dir)
//! SHOPKEEP_LOW_STOCK_THRESHOLD   low-stock level (5)
//! SHOPKEEP_MOVEMENT_PAGE_SIZE    ledger page     (100)
//! SHOPKEEP_MAX_MOVEMENT_PAGE     ledger page cap (500)
//! SHOPKEEP_DB_MAX_CONNECTIONS    pool size       (5)
//! ```

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use shopkeep_core::DEFAULT_LOW_STOCK_THRESHOLD;
use shopkeep_db::DbConfig;

const DEFAULT_DB_FILE: &str = "shopkeep.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub database_path: PathBuf,

    /// Stock at or below this counts as low.
    pub low_stock_threshold: i64,

    /// Movements returned when the caller gives no limit.
    pub movement_page_size: u32,

    /// Largest limit honored on the movement listing.
    pub max_movement_page: u32,

    pub db_max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: default_database_path(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            movement_page_size: 100,
            max_movement_page: 500,
            db_max_connections: 5,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by whatever `SHOPKEEP_*` variables are set.
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = EngineConfig::default();

        if let Some(path) = lookup("SHOPKEEP_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(n) = parsed(&lookup, "SHOPKEEP_LOW_STOCK_THRESHOLD") {
            config.low_stock_threshold = n;
        }
        if let Some(n) = parsed(&lookup, "SHOPKEEP_MOVEMENT_PAGE_SIZE") {
            config.movement_page_size = n;
        }
        if let Some(n) = parsed(&lookup, "SHOPKEEP_MAX_MOVEMENT_PAGE") {
            config.max_movement_page = n;
        }
        if let Some(n) = parsed::<u32>(&lookup, "SHOPKEEP_DB_MAX_CONNECTIONS") {
            config.db_max_connections = n.max(1);
        }

        config
    }

    /// Config for tests: in-memory database, default limits.
    pub fn in_memory() -> Self {
        EngineConfig {
            database_path: PathBuf::from(":memory:"),
            db_max_connections: 1,
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    pub fn db_config(&self) -> DbConfig {
        if self.is_in_memory() {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

/// `shopkeep.db` in the platform data directory.
///
/// - **macOS**: `~/Library/Application Support/com.shopkeep.shopkeep/`
/// - **Windows**: `%APPDATA%\shopkeep\shopkeep\data\`
/// - **Linux**: `~/.local/share/shopkeep/`
///
/// Falls back to the working directory when no home is known.
fn default_database_path() -> PathBuf {
    ProjectDirs::from("com", "shopkeep", "shopkeep")
        .map(|dirs| dirs.data_dir().join(DEFAULT_DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}
