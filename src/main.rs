//! skirmish - combat session CLI
//!
//! Drives the combat engine against a SQLite session database. Every
//! command prints its result as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skirmish::character::CharacterSheet;
use skirmish::combat::{CombatEngine, EnemySpec};
use skirmish::db::Database;
use skirmish::store::SqliteSessionStore;
use skirmish::Config;

/// Turn-based combat engine
#[derive(Parser, Debug)]
#[command(name = "skirmish", version, about = "Run turn-based combat sessions")]
struct Args {
    /// Session database (overrides config)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// RNG seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start combat for a character
    Start {
        /// Character sheet as JSON
        #[arg(short, long)]
        character: PathBuf,

        /// Enemy as name:hp:ac[:attack_bonus:damage_dice:damage_bonus]
        #[arg(short, long = "enemy", value_parser = parse_enemy, required = true)]
        enemies: Vec<EnemySpec>,
    },
    /// Attack an enemy by id or name
    Attack {
        character_id: String,
        target: String,

        /// Spend the bonus action instead of the action
        #[arg(long)]
        bonus: bool,
    },
    /// End the player's activation and run enemy activations
    EndTurn { character_id: String },
    /// Show the current session
    Status { character_id: String },
    /// Close the session and report XP
    End { character_id: String },
}

fn parse_enemy(s: &str) -> Result<EnemySpec, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let int = |field: &str, value: &str| {
        value
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid {} '{}' in enemy '{}'", field, value, s))
    };

    match parts.as_slice() {
        [name, hp, ac] => Ok(EnemySpec::new(name.trim(), int("hp", hp)?, int("ac", ac)?)),
        [name, hp, ac, attack, dice, bonus] => Ok(EnemySpec::new(
            name.trim(),
            int("hp", hp)?,
            int("ac", ac)?,
        )
        .with_attack(int("attack bonus", attack)?, dice.trim(), int("damage bonus", bonus)?)),
        _ => Err(format!(
            "expected name:hp:ac[:attack_bonus:damage_dice:damage_bonus], got '{}'",
            s
        )),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = &args.database {
        config.db_path = Some(path.to_string_lossy().into_owned());
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    debug!("Configuration: {:?}", config);

    let db = Database::new(config.db_path.as_deref()).await?;
    let store = SqliteSessionStore::new(db.pool().clone());
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let engine = CombatEngine::new(store, rng).with_enemy_defaults(config.enemy_defaults.clone());

    match args.command {
        Command::Start { character, enemies } => {
            let json = std::fs::read_to_string(&character)
                .with_context(|| format!("Failed to read {}", character.display()))?;
            let sheet: CharacterSheet = serde_json::from_str(&json)
                .with_context(|| format!("Invalid character sheet {}", character.display()))?;
            let start = engine.start_combat(&sheet, &enemies).await?;
            print_json(&start)?;
        }
        Command::Attack {
            character_id,
            target,
            bonus,
        } => {
            let outcome = if bonus {
                engine.bonus_attack(&character_id, &target).await?
            } else {
                engine.attack(&character_id, &target).await?
            };
            print_json(&outcome)?;
        }
        Command::EndTurn { character_id } => {
            let outcome = engine.end_player_activation(&character_id).await?;
            print_json(&outcome)?;
        }
        Command::Status { character_id } => match engine.combat_summary(&character_id).await? {
            Some(summary) => {
                eprintln!("{}", summary);
                print_json(&summary)?;
            }
            None => bail!("{} is not in combat", character_id),
        },
        Command::End { character_id } => match engine.end_combat(&character_id).await? {
            Some(summary) => print_json(&summary)?,
            None => bail!("{} has no combat session", character_id),
        },
    }

    Ok(())
}
