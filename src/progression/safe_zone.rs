//! Safe-zone flag and the level-up reward choice it gates.

use log::{debug, info, warn};

use crate::progression::catalog::{available_items_for_level, ensure_item, reward_description};
use crate::progression::errors::ProgressionError;
use crate::progression::inventory::add_item;
use crate::progression::storage::ProgressionStore;
use crate::progression::types::InventoryEntry;
use crate::progression::xp::ensure_ledger;

fn set_safe_zone(
    store: &ProgressionStore,
    player_id: u64,
    inside: bool,
) -> Result<bool, ProgressionError> {
    let player = store.update_player(player_id, |p| p.safe_zone = inside)?;
    debug!("player {} safe zone = {}", player_id, player.safe_zone);
    Ok(player.safe_zone)
}

pub fn enter_safe_zone(store: &ProgressionStore, player_id: u64) -> Result<bool, ProgressionError> {
    set_safe_zone(store, player_id, true)
}

pub fn exit_safe_zone(store: &ProgressionStore, player_id: u64) -> Result<bool, ProgressionError> {
    set_safe_zone(store, player_id, false)
}

pub fn safe_zone_status(store: &ProgressionStore, player_id: u64) -> Result<bool, ProgressionError> {
    Ok(store.get_player(player_id)?.safe_zone)
}

/// Items the player may pick as a level-up reward at their current level.
pub fn available_items_for_player(
    store: &ProgressionStore,
    player_id: u64,
) -> Result<Vec<&'static str>, ProgressionError> {
    let xp = ensure_ledger(store, player_id)?;
    Ok(available_items_for_level(i64::from(xp.level)))
}

/// Grant one of the unlocked reward items. The player must be in the safe
/// zone and the item must be in their level's unlock set.
pub fn choose_level_up_item(
    store: &ProgressionStore,
    player_id: u64,
    item_name: &str,
) -> Result<InventoryEntry, ProgressionError> {
    let item_name = item_name.trim();
    if item_name.is_empty() {
        return Err(ProgressionError::bad_request("item name is required"));
    }
    if !safe_zone_status(store, player_id)? {
        warn!("player {} tried to choose a reward outside the safe zone", player_id);
        return Err(ProgressionError::bad_request(
            "You must be in the safe zone to choose a level-up item.",
        ));
    }
    let unlocked = available_items_for_player(store, player_id)?;
    if !unlocked.iter().any(|name| *name == item_name) {
        return Err(ProgressionError::bad_request(
            "Item not available for your level",
        ));
    }

    let description = reward_description(item_name).unwrap_or_default();
    ensure_item(store, item_name, description)?;
    let entry = add_item(store, player_id, item_name, 1)?;
    info!("player {} chose level-up reward '{}'", player_id, item_name);
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::storage::ProgressionStoreBuilder;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ProgressionStore, u64) {
        let dir = TempDir::new().unwrap();
        let store = ProgressionStoreBuilder::new(dir.path())
            .without_mission_seed()
            .open()
            .unwrap();
        let (player, _) = store.insert_player("ranger", "hash").unwrap();
        (dir, store, player.id)
    }

    #[test]
    fn test_toggle_safe_zone() {
        let (_dir, store, id) = setup();
        assert!(safe_zone_status(&store, id).unwrap());
        assert!(!exit_safe_zone(&store, id).unwrap());
        assert!(!safe_zone_status(&store, id).unwrap());
        assert!(enter_safe_zone(&store, id).unwrap());
        assert!(matches!(
            enter_safe_zone(&store, 777).unwrap_err(),
            ProgressionError::NotFound(_)
        ));
        assert!(matches!(
            safe_zone_status(&store, 777).unwrap_err(),
            ProgressionError::NotFound(_)
        ));
    }

    #[test]
    fn test_choice_requires_safe_zone() {
        let (_dir, store, id) = setup();
        exit_safe_zone(&store, id).unwrap();
        let err = choose_level_up_item(&store, id, "Healing Potion").unwrap_err();
        assert_eq!(
            err.user_message(),
            "You must be in the safe zone to choose a level-up item."
        );
        // Safe-zone check comes before the level check.
        let err = choose_level_up_item(&store, id, "Ring of Reality").unwrap_err();
        assert!(matches!(err, ProgressionError::BadRequest(_)));

        enter_safe_zone(&store, id).unwrap();
        let entry = choose_level_up_item(&store, id, "Healing Potion").unwrap();
        assert_eq!(entry.quantity, 1);
        assert!(store.get_item("Healing Potion").unwrap().is_some());
    }

    #[test]
    fn test_choice_requires_unlocked_item() {
        let (_dir, store, id) = setup();
        let err = choose_level_up_item(&store, id, "Iron Sword").unwrap_err();
        assert_eq!(err.user_message(), "Item not available for your level");
        let err = choose_level_up_item(&store, id, "  ").unwrap_err();
        assert_eq!(err.user_message(), "item name is required");

        store
            .update_xp_record(id, |xp| {
                xp.level = 2;
                Ok(())
            })
            .unwrap();
        assert!(available_items_for_player(&store, id)
            .unwrap()
            .contains(&"Iron Sword"));
        choose_level_up_item(&store, id, "Iron Sword").unwrap();
        let entry = choose_level_up_item(&store, id, "Iron Sword").unwrap();
        assert_eq!(entry.quantity, 2);
    }
}
