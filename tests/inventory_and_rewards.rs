/// Integration tests for the inventory ledger, the cumulative unlock table and
/// the safe-zone gate on level-up rewards.
mod common;

use levelup::progression::{
    add_item, add_xp, available_items_for_level, available_items_for_player,
    choose_level_up_item, create_item, delete_player, exit_safe_zone, enter_safe_zone,
    item_quantity, list_inventory, remove_item, ErrorKind, RemovalResult, LEVEL_UNLOCKS,
};

#[test]
fn starter_bundle_quantities() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "alice");
    assert_eq!(item_quantity(&store, id, "Game Map").unwrap(), 1);
    assert_eq!(item_quantity(&store, id, "Healing Potion").unwrap(), 3);
    assert_eq!(item_quantity(&store, id, "Wooden Sword").unwrap(), 1);
    assert_eq!(item_quantity(&store, id, "Leather Shield").unwrap(), 1);
}

#[test]
fn removal_to_empty_then_not_found() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "bob");
    create_item(&store, "X", Some("thing")).unwrap();

    add_item(&store, id, "X", 3).unwrap();
    assert_eq!(
        remove_item(&store, id, "X", 3).unwrap(),
        RemovalResult::Emptied { removed: 3 }
    );
    assert!(list_inventory(&store, id)
        .unwrap()
        .iter()
        .all(|entry| entry.item_name != "X"));
    assert_eq!(
        remove_item(&store, id, "X", 1).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn over_removal_clamps_to_delete() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "carol");
    create_item(&store, "X", None).unwrap();
    add_item(&store, id, "X", 2).unwrap();
    assert_eq!(
        remove_item(&store, id, "X", 5).unwrap(),
        RemovalResult::Emptied { removed: 2 }
    );
    assert_eq!(item_quantity(&store, id, "X").unwrap(), 0);
    assert!(store.get_inventory_entry(id, "X").unwrap().is_none());
}

#[test]
fn uncataloged_item_is_not_found() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "dave");
    assert_eq!(
        add_item(&store, id, "Phantom", 1).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        remove_item(&store, id, "Phantom", 1).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        add_item(&store, id, "Game Map", 0).unwrap_err().kind(),
        ErrorKind::BadRequest
    );
}

#[test]
fn unlock_set_is_cumulative() {
    let level_two = available_items_for_level(2);
    let level_five = available_items_for_level(5);
    assert!(level_two.iter().all(|item| level_five.contains(item)));
    assert!(level_five.len() > level_two.len());

    let everything: usize = LEVEL_UNLOCKS.iter().map(|(_, items)| items.len()).sum();
    assert_eq!(available_items_for_level(100).len(), everything);
    assert!(available_items_for_level(0).is_empty());
}

#[test]
fn reward_choice_is_gated_by_safe_zone() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "erin");
    exit_safe_zone(&store, id).unwrap();

    for item in ["Healing Potion", "Iron Sword", "Not An Item"] {
        let err = choose_level_up_item(&store, id, item).unwrap_err();
        assert_eq!(
            err.user_message(),
            "You must be in the safe zone to choose a level-up item."
        );
    }

    enter_safe_zone(&store, id).unwrap();
    let entry = choose_level_up_item(&store, id, "Healing Potion").unwrap();
    // Stacks onto the three from the starter bundle.
    assert_eq!(entry.quantity, 4);
}

#[test]
fn reward_choice_follows_level() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "frank");
    assert_eq!(
        choose_level_up_item(&store, id, "Flaming Sword")
            .unwrap_err()
            .user_message(),
        "Item not available for your level"
    );

    // 100 + 200 + 300 + 400 = 1000 XP reaches level 5.
    add_xp(&store, id, 1000).unwrap();
    assert!(available_items_for_player(&store, id)
        .unwrap()
        .contains(&"Flaming Sword"));
    choose_level_up_item(&store, id, "Flaming Sword").unwrap();
    assert_eq!(item_quantity(&store, id, "Flaming Sword").unwrap(), 1);
    let cataloged = store.get_item("Flaming Sword").unwrap().unwrap();
    assert!(cataloged.description.is_some());
}

#[test]
fn deleting_player_drops_inventory() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "gina");
    delete_player(&store, id).unwrap();
    assert!(store.list_inventory(id).unwrap().is_empty());
    assert_eq!(
        list_inventory(&store, id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    // Catalog entries outlive the player.
    assert!(store.get_item("Game Map").unwrap().is_some());
}
