//! # Levelup - RPG progression backend
//!
//! Levelup keeps the progression state of an RPG player base: an XP ledger
//! with an escalating level curve, a level-gated item unlock table, stacked
//! inventories, and missions that award XP exactly once (or repeatedly, for
//! repeatable missions).
//!
//! ## Features
//!
//! - **XP Ledger**: leaving level `n` costs `100 * n` XP; level 100 is the cap.
//! - **Level Gates**: a fixed, cumulative table of reward items per level threshold.
//! - **Inventory**: per-player stacks; over-removal clears the stack.
//! - **Missions**: level-gated, one-shot or repeatable, completed atomically with the XP award.
//! - **Safe Zone**: level-up reward choices are only accepted inside the safe zone.
//! - **Persistence**: a sled database, one tree per entity, bincode records with schema versions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use levelup::progression::{self, ProgressionStore};
//!
//! fn main() -> Result<(), progression::ProgressionError> {
//!     let store = ProgressionStore::open("./data/levelup")?;
//!     let player = progression::register_player(&store, "hero", "<argon2 hash>", true)?;
//!     let outcome = progression::add_xp(&store, player.id, 150)?;
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`progression`] - the progression core and its sled store
//! - [`config`] - TOML configuration for the `levelup` binary
//! - [`validation`] - handle, name and description validation
//! - [`metrics`] - process-wide progression counters

pub mod config;
pub mod metrics;
pub mod progression;
pub mod validation;
