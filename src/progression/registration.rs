//! Player registration, lookup, update and deletion.

use log::info;

use crate::metrics;
use crate::progression::catalog::ensure_item;
use crate::progression::errors::ProgressionError;
use crate::progression::state::STARTER_BUNDLE;
use crate::progression::storage::ProgressionStore;
use crate::progression::types::PlayerRecord;
use crate::validation::validate_handle;

/// Create a player with a fresh `(level 1, 0 points)` ledger. With
/// `grant_starter` the starter bundle lands in the new inventory in the same
/// commit as the player, cataloging any bundle item not seen before.
///
/// `credential_hash` is stored as given.
pub fn register_player(
    store: &ProgressionStore,
    handle: &str,
    credential_hash: &str,
    grant_starter: bool,
) -> Result<PlayerRecord, ProgressionError> {
    let handle = validate_handle(handle)?;

    let mut starter = Vec::new();
    if grant_starter {
        for (name, quantity, description) in STARTER_BUNDLE {
            ensure_item(store, name, description)?;
            starter.push((*name, *quantity));
        }
    }
    let (player, _) = store.insert_player_with_inventory(&handle, credential_hash, &starter)?;

    metrics::inc_players_registered();
    let granted: u64 = starter.iter().map(|(_, quantity)| u64::from(*quantity)).sum();
    if granted > 0 {
        metrics::add_items_granted(granted);
    }
    info!("registered player {} '{}'", player.id, player.handle);
    Ok(player)
}

/// Replace a player's handle and credential hash. The new handle goes through
/// the same validation as at registration and must not belong to anyone else.
pub fn update_player(
    store: &ProgressionStore,
    player_id: u64,
    new_handle: &str,
    new_credential_hash: &str,
) -> Result<PlayerRecord, ProgressionError> {
    let handle = validate_handle(new_handle)?;
    let player = store.rename_player(player_id, &handle, new_credential_hash)?;
    info!("updated player {} as '{}'", player.id, player.handle);
    Ok(player)
}

pub fn get_player(store: &ProgressionStore, player_id: u64) -> Result<PlayerRecord, ProgressionError> {
    store.get_player(player_id)
}

/// Case-insensitive handle lookup.
pub fn find_player_by_handle(
    store: &ProgressionStore,
    handle: &str,
) -> Result<Option<PlayerRecord>, ProgressionError> {
    store.find_player_by_handle(handle.trim())
}

pub fn list_players(
    store: &ProgressionStore,
    offset: usize,
    limit: usize,
) -> Result<Vec<PlayerRecord>, ProgressionError> {
    store.list_players(offset, limit)
}

/// Delete a player together with its ledger and inventory. Mission history stays.
pub fn delete_player(store: &ProgressionStore, player_id: u64) -> Result<(), ProgressionError> {
    let removed = store.delete_player(player_id)?;
    info!(
        "deleted player {} ({} inventory entries removed)",
        player_id, removed
    );
    Ok(())
}
