//! Per-player stacks of cataloged items.

use log::{debug, info};
use serde::Deserialize;

use crate::metrics;
use crate::progression::catalog::require_item;
use crate::progression::errors::ProgressionError;
use crate::progression::storage::ProgressionStore;
use crate::progression::types::{InventoryEntry, RemovalResult};

/// Typed add/remove request. `quantity` defaults to 1.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRequest {
    pub item_name: String,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl ItemRequest {
    pub fn new(item_name: impl Into<String>, quantity: Option<i64>) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
        }
    }

    /// Resolve to a trimmed item name and a positive quantity.
    pub fn validate(&self) -> Result<(String, u32), ProgressionError> {
        let name = self.item_name.trim();
        if name.is_empty() {
            return Err(ProgressionError::bad_request("item name is required"));
        }
        let quantity = match self.quantity {
            None => 1,
            Some(q) if q <= 0 => return Err(quantity_error()),
            Some(q) => u32::try_from(q).map_err(|_| {
                ProgressionError::bad_request(format!("Quantity must be at most {}", u32::MAX))
            })?,
        };
        Ok((name.to_string(), quantity))
    }
}

fn quantity_error() -> ProgressionError {
    ProgressionError::bad_request("Quantity must be greater than zero")
}

fn ensure_player(store: &ProgressionStore, player_id: u64) -> Result<(), ProgressionError> {
    if store.player_exists(player_id)? {
        Ok(())
    } else {
        Err(ProgressionError::not_found(format!("player: {}", player_id)))
    }
}

/// Add `quantity` of a cataloged item to the player's stack.
pub fn add_item(
    store: &ProgressionStore,
    player_id: u64,
    item_name: &str,
    quantity: u32,
) -> Result<InventoryEntry, ProgressionError> {
    if quantity == 0 {
        return Err(quantity_error());
    }
    ensure_player(store, player_id)?;
    let item = require_item(store, item_name)?;

    let entry = store.add_to_inventory(player_id, &item.name, quantity)?;
    metrics::add_items_granted(quantity as u64);
    debug!(
        "player {} +{} '{}' (now {})",
        player_id, quantity, item.name, entry.quantity
    );
    Ok(entry)
}

/// Take `quantity` off the player's stack. Asking for more than is held
/// removes the whole stack.
pub fn remove_item(
    store: &ProgressionStore,
    player_id: u64,
    item_name: &str,
    quantity: u32,
) -> Result<RemovalResult, ProgressionError> {
    if quantity == 0 {
        return Err(quantity_error());
    }
    ensure_player(store, player_id)?;
    let item = require_item(store, item_name)?;

    let result = store.remove_from_inventory(player_id, &item.name, quantity)?;
    match &result {
        RemovalResult::Reduced { remaining } => debug!(
            "player {} -{} '{}' ({} left)",
            player_id, quantity, item.name, remaining
        ),
        RemovalResult::Emptied { removed } => info!(
            "player {} no longer holds '{}' (removed {})",
            player_id, item.name, removed
        ),
    }
    Ok(result)
}

/// Apply a validated [`ItemRequest`] as an addition.
pub fn add_item_request(
    store: &ProgressionStore,
    player_id: u64,
    request: &ItemRequest,
) -> Result<InventoryEntry, ProgressionError> {
    let (name, quantity) = request.validate()?;
    add_item(store, player_id, &name, quantity)
}

pub fn remove_item_request(
    store: &ProgressionStore,
    player_id: u64,
    request: &ItemRequest,
) -> Result<RemovalResult, ProgressionError> {
    let (name, quantity) = request.validate()?;
    remove_item(store, player_id, &name, quantity)
}

pub fn list_inventory(
    store: &ProgressionStore,
    player_id: u64,
) -> Result<Vec<InventoryEntry>, ProgressionError> {
    ensure_player(store, player_id)?;
    store.list_inventory(player_id)
}

pub fn list_inventory_page(
    store: &ProgressionStore,
    player_id: u64,
    offset: usize,
    limit: usize,
) -> Result<Vec<InventoryEntry>, ProgressionError> {
    ensure_player(store, player_id)?;
    store.list_inventory_page(player_id, offset, limit)
}

/// How many of `item_name` the player holds (0 when none).
pub fn item_quantity(
    store: &ProgressionStore,
    player_id: u64,
    item_name: &str,
) -> Result<u32, ProgressionError> {
    Ok(store
        .get_inventory_entry(player_id, item_name.trim())?
        .map(|entry| entry.quantity)
        .unwrap_or(0))
}
