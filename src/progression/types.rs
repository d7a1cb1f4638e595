use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const XP_SCHEMA_VERSION: u8 = 1;
pub const ITEM_SCHEMA_VERSION: u8 = 1;
pub const INVENTORY_SCHEMA_VERSION: u8 = 1;
pub const MISSION_SCHEMA_VERSION: u8 = 1;
pub const COMPLETION_SCHEMA_VERSION: u8 = 1;

/// Highest reachable level. Absorbing: no XP is gained once here.
pub const MAX_LEVEL: u32 = 100;
/// Cost multiplier of the level curve: leaving level `n` costs `n * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: u64 = 100;

// ============================================================================
// Players
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub id: u64,
    pub handle: String,
    /// Opaque to the progression core; produced by the credential collaborator.
    pub credential_hash: String,
    pub safe_zone: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(id: u64, handle: &str, credential_hash: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            handle: handle.to_string(),
            credential_hash: credential_hash.to_string(),
            safe_zone: true,
            created_at: now,
            updated_at: now,
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// XP Ledger
// ============================================================================

/// Experience ledger owned by exactly one player (keyed by `player_id`).
///
/// After every mutation `points < XpRecord::required_for_next_level(level)`.
/// At `MAX_LEVEL` a gain that would pass the last threshold zeroes the points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpRecord {
    pub player_id: u64,
    pub points: u64,
    pub level: u32,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl XpRecord {
    pub fn new(player_id: u64) -> Self {
        Self {
            player_id,
            points: 0,
            level: 1,
            updated_at: Utc::now(),
            schema_version: XP_SCHEMA_VERSION,
        }
    }

    /// XP needed to leave `level` for `level + 1`.
    pub fn required_for_next_level(level: u32) -> u64 {
        XP_PER_LEVEL * level as u64
    }

    pub fn is_max_level(&self) -> bool {
        self.level >= MAX_LEVEL
    }

    /// Add `amount` points and normalize, promoting as many levels as the points cover.
    pub fn apply_gain(&mut self, amount: u32) -> XpOutcome {
        if self.is_max_level() {
            return XpOutcome::MaxLevelReached;
        }

        let from_level = self.level;
        self.points += amount as u64;
        while self.level < MAX_LEVEL
            && self.points >= Self::required_for_next_level(self.level)
        {
            self.points -= Self::required_for_next_level(self.level);
            self.level += 1;
        }
        // Enough left to pass level 100: the excess is discarded.
        if self.is_max_level() && self.points >= Self::required_for_next_level(MAX_LEVEL) {
            self.points = 0;
        }
        self.updated_at = Utc::now();

        if self.level > from_level {
            XpOutcome::LeveledUp {
                amount,
                from_level,
                level: self.level,
                points: self.points,
            }
        } else {
            XpOutcome::Gained {
                amount,
                level: self.level,
                points: self.points,
            }
        }
    }

    pub fn reset(&mut self) {
        self.points = 0;
        self.level = 1;
        self.updated_at = Utc::now();
    }
}

/// Result of an XP gain. The numeric fields alone do not tell the max-level
/// case apart, so callers should match on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum XpOutcome {
    Gained {
        amount: u32,
        level: u32,
        points: u64,
    },
    LeveledUp {
        amount: u32,
        from_level: u32,
        level: u32,
        points: u64,
    },
    MaxLevelReached,
}

impl XpOutcome {
    pub fn leveled_up(&self) -> bool {
        matches!(self, XpOutcome::LeveledUp { .. })
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for XpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XpOutcome::Gained {
                amount,
                level,
                points,
            } => write!(
                f,
                "XP added successfully: +{} XP (total: {}, level {})",
                amount, points, level
            ),
            XpOutcome::LeveledUp { level, .. } => {
                write!(f, "Congratulations! You reached level {}!", level)
            }
            XpOutcome::MaxLevelReached => write!(
                f,
                "You have already reached the maximum level ({}). No more XP can be gained.",
                MAX_LEVEL
            ),
        }
    }
}

// ============================================================================
// Items & Inventory
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ItemRecord {
    pub fn new(name: &str, description: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
            schema_version: ITEM_SCHEMA_VERSION,
        }
    }
}

/// One stack of a cataloged item held by a player. Unique per (player, item);
/// `quantity` is always positive while the entry exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryEntry {
    pub player_id: u64,
    pub item_name: String,
    pub quantity: u32,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl InventoryEntry {
    pub fn new(player_id: u64, item_name: &str, quantity: u32) -> Self {
        Self {
            player_id,
            item_name: item_name.to_string(),
            quantity,
            updated_at: Utc::now(),
            schema_version: INVENTORY_SCHEMA_VERSION,
        }
    }
}

/// What happened to a stack on removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RemovalResult {
    /// The stack shrank and still holds `remaining`.
    Reduced { remaining: u32 },
    /// The stack is gone; `removed` is what was actually held.
    Emptied { removed: u32 },
}

// ============================================================================
// Missions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionRecord {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub xp_reward: u32,
    pub required_level: u32,
    pub is_active: bool,
    pub is_repeatable: bool,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl MissionRecord {
    /// New active, one-shot mission. The id is assigned by the store on insert.
    pub fn new(name: &str, description: &str, xp_reward: u32, required_level: u32) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            description: description.to_string(),
            xp_reward,
            required_level,
            is_active: true,
            is_repeatable: false,
            created_at: Utc::now(),
            schema_version: MISSION_SCHEMA_VERSION,
        }
    }

    pub fn repeatable(mut self) -> Self {
        self.is_repeatable = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Historical fact: a player finished a mission. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedMission {
    pub id: u64,
    pub player_id: u64,
    pub mission_id: u64,
    pub xp_gained: u32,
    pub completed_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl CompletedMission {
    pub fn new(id: u64, player_id: u64, mission_id: u64, xp_gained: u32) -> Self {
        Self {
            id,
            player_id,
            mission_id,
            xp_gained,
            completed_at: Utc::now(),
            schema_version: COMPLETION_SCHEMA_VERSION,
        }
    }
}

/// A mission as offered to a specific player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableMission {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub xp_reward: u32,
    pub required_level: u32,
    pub is_repeatable: bool,
    pub can_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionCompletion {
    pub message: String,
    pub xp_gained: u32,
    pub current_xp: u64,
    pub current_level: u32,
    pub level_up: bool,
    pub mission_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionHistoryEntry {
    pub id: u64,
    pub mission_name: String,
    pub mission_description: String,
    pub xp_gained: u32,
    pub completed_at: DateTime<Utc>,
    pub player_handle: String,
}
