/// Concurrency and durability checks: racing XP awards, mission completions
/// and inventory writes against deletion, and reopening a store from disk.
mod common;

use std::thread;

use levelup::progression::{
    add_item, add_xp, complete_mission, create_item, create_mission, delete_player, get_xp,
    ErrorKind, MissionRecord, ProgressionStoreBuilder,
};

#[test]
fn concurrent_xp_awards_are_not_lost() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "racer");

    const THREADS: usize = 8;
    const AWARDS: usize = 25;
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..AWARDS {
                    add_xp(&store, id, 10).expect("add xp");
                }
            });
        }
    });

    let xp = get_xp(&store, id).expect("xp");
    assert_eq!(
        common::total_xp(xp.level, xp.points),
        (THREADS * AWARDS * 10) as u64
    );
    // 2000 XP: 1500 spent reaching level 6, 500 left over.
    assert_eq!((xp.level, xp.points), (6, 500));
}

#[test]
fn racing_one_shot_completions_record_once() {
    let (store, _temp) = common::store(false);
    let id = common::player(&store, "twin");
    let mission =
        create_mission(&store, MissionRecord::new("Only Once", "", 40, 1)).expect("mission");

    let successes: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..6)
            .map(|_| scope.spawn(|| complete_mission(&store, mission.id, id).is_ok()))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("join") as usize)
            .sum()
    });

    assert_eq!(successes, 1);
    assert_eq!(store.completion_count(id, mission.id).expect("count"), 1);
    assert_eq!(get_xp(&store, id).expect("xp").points, 40);
}

#[test]
fn deletion_racing_item_grants_leaves_no_inventory() {
    let (store, _temp) = common::store(false);
    create_item(&store, "Pebble", None).expect("item");

    for round in 0..10 {
        let id = common::player(&store, &format!("doomed{}", round));
        thread::scope(|scope| {
            let granter = scope.spawn(|| loop {
                match add_item(&store, id, "Pebble", 1) {
                    Ok(_) => continue,
                    Err(err) => break err.kind(),
                }
            });
            delete_player(&store, id).expect("delete");
            assert_eq!(granter.join().expect("join"), ErrorKind::NotFound);
        });
        assert!(store.list_inventory(id).expect("inventory").is_empty());
    }
}

#[test]
fn state_survives_reopen() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let path = temp.path().join("db");
    let id = {
        let store = ProgressionStoreBuilder::new(&path).open().expect("open");
        let id = common::player(&store, "sleeper");
        add_xp(&store, id, 250).expect("xp");
        id
    };

    let store = ProgressionStoreBuilder::new(&path).open().expect("reopen");
    let xp = get_xp(&store, id).expect("xp");
    assert_eq!((xp.level, xp.points), (2, 150));
    assert_eq!(store.count_missions(), 7);
    assert_eq!(store.list_inventory(id).expect("inventory").len(), 4);
}
