//! XP ledger: converts raw XP gains into level-ups on an escalating curve.
//!
//! Leaving level `n` costs `100 * n` points; level 100 is terminal and further
//! gains are reported as no-ops.

use log::{debug, info};

use crate::metrics;
use crate::progression::errors::ProgressionError;
use crate::progression::storage::ProgressionStore;
use crate::progression::types::{XpOutcome, XpRecord};

/// Return the player's ledger, provisioning a `(level 1, 0 points)` one if missing.
pub fn ensure_ledger(store: &ProgressionStore, player_id: u64) -> Result<XpRecord, ProgressionError> {
    store.ensure_xp_record(player_id)
}

/// Award `amount` XP to the player.
pub fn add_xp(
    store: &ProgressionStore,
    player_id: u64,
    amount: u32,
) -> Result<XpOutcome, ProgressionError> {
    if amount == 0 {
        return Err(ProgressionError::bad_request(
            "XP amount must be greater than zero",
        ));
    }
    ensure_ledger(store, player_id)?;

    let (_, outcome) = store.update_xp_record(player_id, |xp| Ok(xp.apply_gain(amount)))?;
    record_outcome(player_id, &outcome);
    Ok(outcome)
}

/// Log and count an applied XP outcome.
pub(crate) fn record_outcome(player_id: u64, outcome: &XpOutcome) {
    match outcome {
        XpOutcome::Gained { amount, .. } => {
            metrics::add_xp_awarded(*amount as u64);
            debug!("player {}: {}", player_id, outcome);
        }
        XpOutcome::LeveledUp {
            amount,
            from_level,
            level,
            ..
        } => {
            metrics::add_xp_awarded(*amount as u64);
            metrics::add_level_ups((level - from_level) as u64);
            info!(
                "player {} leveled up {} -> {} (+{} XP)",
                player_id, from_level, level, amount
            );
        }
        XpOutcome::MaxLevelReached => {
            debug!("player {} is at max level; XP gain ignored", player_id);
        }
    }
}

/// Current `(points, level)` ledger for a known player.
pub fn get_xp(store: &ProgressionStore, player_id: u64) -> Result<XpRecord, ProgressionError> {
    ensure_ledger(store, player_id)
}

pub fn get_level(store: &ProgressionStore, player_id: u64) -> Result<u32, ProgressionError> {
    Ok(get_xp(store, player_id)?.level)
}

pub fn get_points(store: &ProgressionStore, player_id: u64) -> Result<u64, ProgressionError> {
    Ok(get_xp(store, player_id)?.points)
}

/// Force the ledger back to `(level 1, 0 points)`. Unlike reads this does not
/// provision: a missing ledger is `NotFound`.
pub fn reset_xp(store: &ProgressionStore, player_id: u64) -> Result<XpRecord, ProgressionError> {
    if !store.player_exists(player_id)? {
        return Err(ProgressionError::not_found(format!("player: {}", player_id)));
    }
    let (record, ()) = store.update_xp_record(player_id, |xp| {
        xp.reset();
        Ok(())
    })?;
    info!("player {} xp reset to level 1", player_id);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::storage::ProgressionStoreBuilder;
    use crate::progression::types::MAX_LEVEL;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ProgressionStore, u64) {
        let dir = TempDir::new().expect("tempdir");
        let store = ProgressionStoreBuilder::new(dir.path())
            .without_mission_seed()
            .open()
            .expect("store");
        let (player, _) = store.insert_player("alice", "hash").expect("player");
        (dir, store, player.id)
    }

    fn set_ledger(store: &ProgressionStore, player_id: u64, level: u32, points: u64) {
        store
            .update_xp_record(player_id, |xp| {
                xp.level = level;
                xp.points = points;
                Ok(())
            })
            .expect("seed ledger");
    }

    #[test]
    fn test_add_xp_without_level_up() {
        let (_dir, store, id) = setup();
        set_ledger(&store, id, 1, 50);
        let outcome = add_xp(&store, id, 30).unwrap();
        assert!(outcome.message().contains("XP added successfully"));
        let xp = get_xp(&store, id).unwrap();
        assert_eq!((xp.level, xp.points), (1, 80));
    }

    #[test]
    fn test_add_xp_with_level_up() {
        let (_dir, store, id) = setup();
        set_ledger(&store, id, 1, 50);
        let outcome = add_xp(&store, id, 60).unwrap();
        assert!(outcome.leveled_up());
        assert_eq!(get_level(&store, id).unwrap(), 2);
        assert_eq!(get_points(&store, id).unwrap(), 10);
    }

    #[test]
    fn test_max_level_is_noop() {
        let (_dir, store, id) = setup();
        set_ledger(&store, id, MAX_LEVEL, 0);
        let outcome = add_xp(&store, id, 100).unwrap();
        assert_eq!(outcome, XpOutcome::MaxLevelReached);
        let xp = get_xp(&store, id).unwrap();
        assert_eq!((xp.level, xp.points), (MAX_LEVEL, 0));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let (_dir, store, id) = setup();
        let err = add_xp(&store, id, 0).unwrap_err();
        assert!(matches!(err, ProgressionError::BadRequest(_)));
    }

    #[test]
    fn test_unknown_player_not_found() {
        let (_dir, store, _) = setup();
        assert!(matches!(
            add_xp(&store, 424_242, 10).unwrap_err(),
            ProgressionError::NotFound(_)
        ));
        assert!(matches!(
            get_xp(&store, 424_242).unwrap_err(),
            ProgressionError::NotFound(_)
        ));
        assert!(matches!(
            reset_xp(&store, 424_242).unwrap_err(),
            ProgressionError::NotFound(_)
        ));
    }

    #[test]
    fn test_reset_xp() {
        let (_dir, store, id) = setup();
        add_xp(&store, id, 450).unwrap();
        assert!(get_level(&store, id).unwrap() > 1);
        let xp = reset_xp(&store, id).unwrap();
        assert_eq!((xp.level, xp.points), (1, 0));
    }
}
