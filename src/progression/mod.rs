//! Progression core: XP ledger, item catalog, inventories, missions and the
//! safe-zone gate, all persisted in a sled-backed store.
//!
//! Operations are free functions taking a [`ProgressionStore`]; each runs to
//! completion and returns either a payload or a [`ProgressionError`] whose
//! [`ErrorKind`] a transport layer can map to a status code.

pub mod catalog;
pub mod credentials;
pub mod errors;
pub mod inventory;
pub mod mission;
pub mod registration;
pub mod safe_zone;
pub mod state;
pub mod storage;
pub mod types;
pub mod xp;

pub use catalog::{
    available_items_for_level, create_item, find_item_by_name, is_item_unlocked, list_items,
    require_item, update_item_description,
};
pub use credentials::{hash_password, verify_password};
pub use errors::{ErrorKind, ProgressionError};
pub use inventory::{
    add_item, add_item_request, item_quantity, list_inventory, list_inventory_page, remove_item,
    remove_item_request, ItemRequest,
};
pub use mission::{
    available_missions, complete_mission, create_mission, get_mission, list_missions,
    mission_history, reset_missions, MissionReset,
};
pub use registration::{
    delete_player, find_player_by_handle, get_player, list_players, register_player,
    update_player,
};
pub use safe_zone::{
    available_items_for_player, choose_level_up_item, enter_safe_zone, exit_safe_zone,
    safe_zone_status,
};
pub use state::{seed_starter_missions, LEVEL_UNLOCKS, STARTER_BUNDLE};
pub use storage::{ProgressionStore, ProgressionStoreBuilder};
pub use types::*;
pub use xp::{add_xp, ensure_ledger, get_level, get_points, get_xp, reset_xp};
