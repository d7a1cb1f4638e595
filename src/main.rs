//! Binary entrypoint for the levelup admin CLI.
//!
//! Commands:
//! - `init` - write a starter config (if missing) and open/seed the store
//! - `status` - print store counts and the process counters
//! - `register <handle>` - create a player (password prompted twice, argon2 hashed)
//! - `update-player <player> <handle>` - rename a player and set a new password
//! - `verify <player>` - check a password against the stored hash
//! - `add-xp`, `xp`, `missions`, `complete`, `history`, `reset-missions`
//! - `create-item`, `items`, `inventory`, `add-item`, `remove-item`
//! - `safe-zone <enter|exit|status>`, `choose-item`, `available-items`
//!
//! Players may be given by numeric id or by handle. Results are printed as
//! JSON; failures print `error (<kind>): <message>` and exit with status 1.
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use serde::Serialize;
use serde_json::json;

use levelup::config::Config;
use levelup::metrics;
use levelup::progression::{self, ItemRequest, ProgressionError, ProgressionStore};

#[derive(Parser)]
#[command(name = "levelup")]
#[command(about = "Administer an RPG progression store: players, XP, items and missions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "levelup.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config (if missing) and initialize the store
    Init,
    /// Show store counts and progression counters
    Status,
    /// Register a new player; prompts for a password
    Register { handle: String },
    /// Change a player's handle and password; prompts for the new password
    UpdatePlayer { player: String, handle: String },
    /// Check a player's password
    Verify { player: String },
    /// Award XP to a player
    AddXp { player: String, amount: u32 },
    /// Show a player's level and points
    Xp { player: String },
    /// List missions the player can complete now
    Missions { player: String },
    /// Complete a mission for a player
    Complete { mission: u64, player: String },
    /// Show a player's completed missions, newest first
    History { player: String },
    /// Delete all missions and history, then re-seed the starter missions
    ResetMissions,
    /// Add an item to the catalog
    CreateItem {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List the item catalog
    Items {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show a player's inventory
    Inventory { player: String },
    /// Give a player some of a cataloged item
    AddItem {
        player: String,
        item: String,
        #[arg(short, long, allow_negative_numbers = true)]
        quantity: Option<i64>,
    },
    /// Take some of an item from a player
    RemoveItem {
        player: String,
        item: String,
        #[arg(short, long, allow_negative_numbers = true)]
        quantity: Option<i64>,
    },
    /// Move a player in or out of the safe zone, or show where they are
    SafeZone { action: SafeZoneAction, player: String },
    /// Pick a level-up reward item (requires the safe zone)
    ChooseItem { player: String, item: String },
    /// List the reward items unlocked at the player's level
    AvailableItems { player: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SafeZoneAction {
    Enter,
    Exit,
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config itself; everything else needs it up front.
    let config = match cli.command {
        Commands::Init => None,
        _ => Some(Config::load(&cli.config).await),
    };
    let config = match config {
        None => {
            if !Path::new(&cli.config).exists() {
                Config::create_default(&cli.config).await?;
            }
            Config::load(&cli.config).await
        }
        Some(loaded) => loaded,
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            init_logging(&None, cli.verbose);
            eprintln!("error (internal): {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&Some(config.clone()), cli.verbose);
    debug!("loaded configuration from {}", cli.config);

    if let Err(e) = run(&cli, &config).await {
        let kind = e
            .downcast_ref::<ProgressionError>()
            .map(|err| err.kind().as_str())
            .unwrap_or("internal");
        let message = e
            .downcast_ref::<ProgressionError>()
            .map(|err| err.user_message())
            .unwrap_or_else(|| e.to_string());
        eprintln!("error ({}): {}", kind, message);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    let store = config.open_store()?;

    match &cli.command {
        Commands::Init => {
            info!("Configuration file at {}", cli.config);
            print_json(&json!({
                "config": cli.config,
                "data_dir": config.storage.data_dir,
                "missions": store.count_missions(),
            }))?;
        }
        Commands::Status => {
            print_json(&json!({
                "data_dir": config.storage.data_dir,
                "players": store.count_players(),
                "missions": store.count_missions(),
                "counters": metrics::snapshot(),
            }))?;
        }
        Commands::Register { handle } => {
            let hash = prompt_new_password()?;
            let player = progression::register_player(
                &store,
                handle,
                &hash,
                config.progression.grant_starter_bundle,
            )?;
            print_json(&json!({
                "id": player.id,
                "handle": player.handle,
                "safe_zone": player.safe_zone,
                "created_at": player.created_at,
            }))?;
        }
        Commands::UpdatePlayer { player, handle } => {
            let id = resolve_player(&store, player)?;
            let hash = prompt_new_password()?;
            let player = progression::update_player(&store, id, handle, &hash)?;
            print_json(&json!({
                "id": player.id,
                "handle": player.handle,
                "updated_at": player.updated_at,
            }))?;
        }
        Commands::Verify { player } => {
            let id = resolve_player(&store, player)?;
            let record = progression::get_player(&store, id)?;
            let pass = rpassword::prompt_password("Password: ")?;
            let valid = progression::verify_password(&pass, &record.credential_hash)?;
            if !valid {
                info!("password check failed for player {}", id);
            }
            print_json(&json!({ "player_id": id, "valid": valid }))?;
        }
        Commands::AddXp { player, amount } => {
            let id = resolve_player(&store, player)?;
            let outcome = progression::add_xp(&store, id, *amount)?;
            let xp = progression::get_xp(&store, id)?;
            print_json(&json!({
                "message": outcome.message(),
                "result": outcome,
                "level": xp.level,
                "points": xp.points,
            }))?;
        }
        Commands::Xp { player } => {
            let id = resolve_player(&store, player)?;
            let xp = progression::get_xp(&store, id)?;
            print_json(&json!({
                "player_id": id,
                "level": xp.level,
                "points": xp.points,
                "next_level_at": progression::XpRecord::required_for_next_level(xp.level),
            }))?;
        }
        Commands::Missions { player } => {
            let id = resolve_player(&store, player)?;
            print_json(&progression::available_missions(&store, id)?)?;
        }
        Commands::Complete { mission, player } => {
            let id = resolve_player(&store, player)?;
            print_json(&progression::complete_mission(&store, *mission, id)?)?;
        }
        Commands::History { player } => {
            let id = resolve_player(&store, player)?;
            print_json(&progression::mission_history(&store, id)?)?;
        }
        Commands::ResetMissions => {
            print_json(&progression::reset_missions(&store)?)?;
        }
        Commands::CreateItem { name, description } => {
            print_json(&progression::create_item(&store, name, description.as_deref())?)?;
        }
        Commands::Items { offset, limit } => {
            print_json(&progression::list_items(&store, *offset, *limit)?)?;
        }
        Commands::Inventory { player } => {
            let id = resolve_player(&store, player)?;
            print_json(&progression::list_inventory(&store, id)?)?;
        }
        Commands::AddItem {
            player,
            item,
            quantity,
        } => {
            let id = resolve_player(&store, player)?;
            let request = ItemRequest::new(item.as_str(), *quantity);
            print_json(&progression::add_item_request(&store, id, &request)?)?;
        }
        Commands::RemoveItem {
            player,
            item,
            quantity,
        } => {
            let id = resolve_player(&store, player)?;
            let request = ItemRequest::new(item.as_str(), *quantity);
            print_json(&progression::remove_item_request(&store, id, &request)?)?;
        }
        Commands::SafeZone { action, player } => {
            let id = resolve_player(&store, player)?;
            let safe_zone = match action {
                SafeZoneAction::Enter => progression::enter_safe_zone(&store, id)?,
                SafeZoneAction::Exit => progression::exit_safe_zone(&store, id)?,
                SafeZoneAction::Status => progression::safe_zone_status(&store, id)?,
            };
            print_json(&json!({ "player_id": id, "safe_zone": safe_zone }))?;
        }
        Commands::ChooseItem { player, item } => {
            let id = resolve_player(&store, player)?;
            print_json(&progression::choose_level_up_item(&store, id, item)?)?;
        }
        Commands::AvailableItems { player } => {
            let id = resolve_player(&store, player)?;
            let level = progression::get_level(&store, id)?;
            print_json(&json!({
                "level": level,
                "items": progression::available_items_for_player(&store, id)?,
            }))?;
        }
    }

    store.flush()?;
    Ok(())
}

/// Prompt twice for a new password and return its argon2 hash.
fn prompt_new_password() -> Result<String> {
    let pass1 = rpassword::prompt_password("Password: ")?;
    let pass2 = rpassword::prompt_password("Confirm password: ")?;
    if pass1 != pass2 {
        return Err(ProgressionError::bad_request("passwords do not match").into());
    }
    Ok(progression::hash_password(&pass1)?)
}

/// Accept either a numeric player id or a handle.
fn resolve_player(store: &ProgressionStore, player: &str) -> Result<u64> {
    if let Ok(id) = player.parse::<u64>() {
        if store.player_exists(id)? {
            return Ok(id);
        }
    }
    match progression::find_player_by_handle(store, player)? {
        Some(found) => Ok(found.id),
        None => Err(ProgressionError::not_found(format!("player: {}", player)).into()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| anyhow!("Failed to render output: {}", e))?;
    println!("{}", rendered);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| log::LevelFilter::from_str(&cfg.logging.level).ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // sled is chatty at debug level
    builder.filter_module("sled", log::LevelFilter::Warn);

    let log_file = config.as_ref().and_then(|cfg| cfg.logging.file.clone());
    let opened = log_file.and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    });
    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when someone is watching
        let is_tty = atty::is(atty::Stream::Stdout);

        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
