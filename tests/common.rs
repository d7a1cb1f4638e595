//! Test utilities & fixtures shared by the integration tests.

use levelup::progression::{register_player, ProgressionStore, ProgressionStoreBuilder};
use tempfile::TempDir;

/// Fresh store in a temp dir. `seed` controls the starter mission seed.
#[allow(dead_code)]
pub fn store(seed: bool) -> (ProgressionStore, TempDir) {
    let temp_dir = TempDir::new().expect("tempdir");
    let mut builder = ProgressionStoreBuilder::new(temp_dir.path().join("db"));
    if !seed {
        builder = builder.without_mission_seed();
    }
    (builder.open().expect("open store"), temp_dir)
}

/// Register a player with the starter bundle and return its id.
#[allow(dead_code)]
pub fn player(store: &ProgressionStore, handle: &str) -> u64 {
    register_player(store, handle, "$argon2id$test", true)
        .expect("register player")
        .id
}

/// Total XP represented by a `(level, points)` ledger on the 100-per-level curve.
#[allow(dead_code)]
pub fn total_xp(level: u32, points: u64) -> u64 {
    let level = level as u64;
    50 * level * (level - 1) + points
}
