//! Mission engine: offering, completing and recording missions.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::Serialize;

use crate::metrics;
use crate::progression::errors::ProgressionError;
use crate::progression::state::seed_starter_missions;
use crate::progression::storage::ProgressionStore;
use crate::progression::types::{
    AvailableMission, MissionCompletion, MissionHistoryEntry, MissionRecord,
};
use crate::progression::xp::{ensure_ledger, record_outcome};
use crate::validation::{validate_description, validate_name};

/// Counts reported by [`reset_missions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissionReset {
    pub missions_removed: usize,
    pub completions_removed: usize,
    pub missions_seeded: usize,
}

/// Validate and persist a new mission, returning it with its assigned id.
pub fn create_mission(
    store: &ProgressionStore,
    mission: MissionRecord,
) -> Result<MissionRecord, ProgressionError> {
    let mut mission = mission;
    mission.name = validate_name(&mission.name, "Mission name")?;
    mission.description = validate_description(&mission.description)?;
    if mission.xp_reward < 1 {
        return Err(ProgressionError::bad_request(
            "Mission XP reward must be at least 1",
        ));
    }
    if mission.required_level < 1 {
        return Err(ProgressionError::bad_request(
            "Mission required level must be at least 1",
        ));
    }
    let mission = store.insert_mission(mission)?;
    info!("created mission {} '{}'", mission.id, mission.name);
    Ok(mission)
}

pub fn get_mission(store: &ProgressionStore, mission_id: u64) -> Result<MissionRecord, ProgressionError> {
    store.get_mission(mission_id)
}

pub fn list_missions(store: &ProgressionStore) -> Result<Vec<MissionRecord>, ProgressionError> {
    store.list_missions()
}

/// Active missions the player may complete right now.
///
/// A player without a ledger yet is treated as level 1. One-shot missions the
/// player already finished are left out.
pub fn available_missions(
    store: &ProgressionStore,
    player_id: u64,
) -> Result<Vec<AvailableMission>, ProgressionError> {
    if !store.player_exists(player_id)? {
        return Err(ProgressionError::not_found(format!("player: {}", player_id)));
    }
    let level = store
        .get_xp_record(player_id)?
        .map(|xp| xp.level)
        .unwrap_or(1);

    let mut offered = Vec::new();
    for mission in store.list_active_missions_up_to_level(level)? {
        let can_complete =
            mission.is_repeatable || !store.completion_exists(player_id, mission.id)?;
        if !can_complete {
            continue;
        }
        offered.push(AvailableMission {
            id: mission.id,
            name: mission.name,
            description: mission.description,
            xp_reward: mission.xp_reward,
            required_level: mission.required_level,
            is_repeatable: mission.is_repeatable,
            can_complete,
        });
    }
    debug!(
        "player {} (level {}) has {} missions available",
        player_id,
        level,
        offered.len()
    );
    Ok(offered)
}

/// Complete a mission: award its XP and record the fact in one transaction.
///
/// Rejections, checked in order: inactive mission, insufficient level,
/// already completed (one-shot missions only).
pub fn complete_mission(
    store: &ProgressionStore,
    mission_id: u64,
    player_id: u64,
) -> Result<MissionCompletion, ProgressionError> {
    store.get_player(player_id)?;
    let mission = store.get_mission(mission_id)?;
    ensure_ledger(store, player_id)?;

    let commit = store
        .commit_mission_completion(player_id, &mission, |xp, prior| {
            if !mission.is_active {
                return Err(ProgressionError::bad_request(
                    "This mission is no longer available",
                ));
            }
            if xp.level < mission.required_level {
                return Err(ProgressionError::bad_request(format!(
                    "Insufficient level for this mission. Required: {}",
                    mission.required_level
                )));
            }
            if !mission.is_repeatable && prior > 0 {
                return Err(ProgressionError::bad_request(
                    "You have already completed this mission",
                ));
            }
            Ok(())
        })
        .map_err(|err| {
            if let ProgressionError::BadRequest(reason) = &err {
                warn!(
                    "player {} cannot complete mission {}: {}",
                    player_id, mission_id, reason
                );
            }
            err
        })?;

    record_outcome(player_id, &commit.outcome);
    metrics::inc_missions_completed();

    let level_up = commit.after.level > commit.before.level;
    let mut message = format!(
        "Mission '{}' completed! +{} XP gained!",
        mission.name, mission.xp_reward
    );
    if level_up {
        message.push_str(&format!(
            " Congratulations! You reached level {}!",
            commit.after.level
        ));
    }
    info!(
        "player {} completed mission {} '{}' (level {} -> {})",
        player_id, mission.id, mission.name, commit.before.level, commit.after.level
    );

    Ok(MissionCompletion {
        message,
        xp_gained: commit.completion.xp_gained,
        current_xp: commit.after.points,
        current_level: commit.after.level,
        level_up,
        mission_name: mission.name,
    })
}

/// The player's completed missions, most recent first.
pub fn mission_history(
    store: &ProgressionStore,
    player_id: u64,
) -> Result<Vec<MissionHistoryEntry>, ProgressionError> {
    let player = store.get_player(player_id)?;
    let missions: HashMap<u64, MissionRecord> = store
        .list_missions()?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    Ok(store
        .list_completions_for_player(player_id)?
        .into_iter()
        .map(|completion| {
            let (mission_name, mission_description) = match missions.get(&completion.mission_id) {
                Some(m) => (m.name.clone(), m.description.clone()),
                None => (format!("mission #{}", completion.mission_id), String::new()),
            };
            MissionHistoryEntry {
                id: completion.id,
                mission_name,
                mission_description,
                xp_gained: completion.xp_gained,
                completed_at: completion.completed_at,
                player_handle: player.handle.clone(),
            }
        })
        .collect())
}

/// Wipe all mission history and the mission catalog, then re-seed the
/// starter missions. The wipe is flushed before the seed is written.
pub fn reset_missions(store: &ProgressionStore) -> Result<MissionReset, ProgressionError> {
    let (missions_removed, completions_removed) = store.clear_missions_and_history()?;
    let seeded = store.insert_missions(seed_starter_missions())?;
    info!(
        "mission reset: removed {} missions and {} completions, seeded {}",
        missions_removed,
        completions_removed,
        seeded.len()
    );
    Ok(MissionReset {
        missions_removed,
        completions_removed,
        missions_seeded: seeded.len(),
    })
}
