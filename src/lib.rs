//! skirmish - turn-based combat engine
//!
//! Rules-driven combat for LLM-narrated tabletop RPG sessions. The engine
//! owns dice, initiative and damage; callers only describe intent.

pub mod character;
pub mod combat;
pub mod db;
pub mod store;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use combat::EnemyDefaults;

/// Default configuration file, read from the working directory
pub const CONFIG_FILE: &str = "skirmish.toml";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file for sessions; None = in-memory
    pub db_path: Option<String>,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Used when RUST_LOG is unset
    pub log_filter: String,
    #[serde(default)]
    pub enemy_defaults: EnemyDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: Some("skirmish.db".to_string()),
            seed: None,
            log_filter: "skirmish=info".to_string(),
            enemy_defaults: EnemyDefaults::default(),
        }
    }
}

impl Config {
    /// Layered sources: defaults, then `skirmish.toml`, then `SKIRMISH_*`
    /// environment variables (`__` separates nested keys).
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("SKIRMISH_").split("__"))
    }

    pub fn load() -> Result<Self> {
        Ok(Self::figment().extract()?)
    }
}
