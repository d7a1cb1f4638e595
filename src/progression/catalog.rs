//! Item catalog and the level-gate resolver.

use log::{debug, info};

use crate::progression::errors::ProgressionError;
use crate::progression::state::{unlockable_item, LEVEL_UNLOCKS};
use crate::progression::storage::ProgressionStore;
use crate::progression::types::ItemRecord;
use crate::validation::{validate_description, validate_name};

/// Create a catalog entry. Names are unique; a duplicate is `AlreadyExists`.
pub fn create_item(
    store: &ProgressionStore,
    name: &str,
    description: Option<&str>,
) -> Result<ItemRecord, ProgressionError> {
    if name.trim().is_empty() {
        return Err(ProgressionError::bad_request("item name is required"));
    }
    let name = validate_name(name, "Item name")?;
    let description = description.map(validate_description).transpose()?;
    let item = store.insert_item(ItemRecord::new(&name, description.as_deref()))?;
    info!("cataloged item '{}'", item.name);
    Ok(item)
}

pub fn find_item_by_name(
    store: &ProgressionStore,
    name: &str,
) -> Result<Option<ItemRecord>, ProgressionError> {
    store.get_item(name.trim())
}

/// Like [`find_item_by_name`] but a missing item is an error.
pub fn require_item(store: &ProgressionStore, name: &str) -> Result<ItemRecord, ProgressionError> {
    find_item_by_name(store, name)?
        .ok_or_else(|| ProgressionError::not_found(format!("Item '{}' not found", name.trim())))
}

pub fn list_items(
    store: &ProgressionStore,
    offset: usize,
    limit: usize,
) -> Result<Vec<ItemRecord>, ProgressionError> {
    store.list_items(offset, limit)
}

pub fn update_item_description(
    store: &ProgressionStore,
    name: &str,
    description: Option<&str>,
) -> Result<ItemRecord, ProgressionError> {
    let mut item = require_item(store, name)?;
    item.description = description.map(validate_description).transpose()?;
    store.put_item(item.clone())?;
    debug!("updated description of '{}'", item.name);
    Ok(item)
}

/// Get-or-create used when an item is referenced before it was cataloged
/// (starter bundle, level-up rewards).
pub(crate) fn ensure_item(
    store: &ProgressionStore,
    name: &str,
    description: &str,
) -> Result<ItemRecord, ProgressionError> {
    let (item, created) = store.insert_item_if_absent(ItemRecord::new(name, Some(description)))?;
    if created {
        info!("cataloged item '{}' on first reference", item.name);
    }
    Ok(item)
}

/// Every item unlocked at or below `level`, in threshold order. Levels below 1
/// unlock nothing.
pub fn available_items_for_level(level: i64) -> Vec<&'static str> {
    LEVEL_UNLOCKS
        .iter()
        .take_while(|(threshold, _)| i64::from(*threshold) <= level)
        .flat_map(|(_, items)| items.iter().map(|item| item.name))
        .collect()
}

/// Exact membership test against the cumulative unlock set.
pub fn is_item_unlocked(name: &str, level: i64) -> bool {
    available_items_for_level(level)
        .iter()
        .any(|unlocked| *unlocked == name)
}

/// Catalog description for a reward item, if the name is in the unlock table.
pub(crate) fn reward_description(name: &str) -> Option<&'static str> {
    unlockable_item(name).map(|item| item.description)
}
