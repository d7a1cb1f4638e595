//! Canonical static data: the level unlock table, the registration starter
//! bundle and the starter mission set re-seeded by `reset_missions`.

use crate::progression::types::MissionRecord;

/// An item granted by reaching a threshold level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockableItem {
    pub name: &'static str,
    pub description: &'static str,
}

/// Threshold level and the items it adds. Ordered by level; unlocks are cumulative.
pub const LEVEL_UNLOCKS: &[(u32, &[UnlockableItem])] = &[
    (
        1,
        &[
            UnlockableItem {
                name: "Healing Potion",
                description: "Restores a small amount of health",
            },
            UnlockableItem {
                name: "Simple Bread",
                description: "Plain travel food",
            },
            UnlockableItem {
                name: "Wooden Dagger",
                description: "A whittled blade, better than bare hands",
            },
        ],
    ),
    (
        2,
        &[
            UnlockableItem {
                name: "Iron Sword",
                description: "A dependable soldier's sword",
            },
            UnlockableItem {
                name: "Leather Armor",
                description: "Light armor stitched from hide",
            },
            UnlockableItem {
                name: "Mana Potion",
                description: "Restores a small amount of mana",
            },
        ],
    ),
    (
        3,
        &[
            UnlockableItem {
                name: "Hunter's Bow",
                description: "A recurve bow for ranged hunting",
            },
            UnlockableItem {
                name: "Iron Shield",
                description: "A round shield banded with iron",
            },
            UnlockableItem {
                name: "Greater Healing Potion",
                description: "Restores a large amount of health",
            },
        ],
    ),
    (
        4,
        &[
            UnlockableItem {
                name: "Iron Armor",
                description: "Heavy plates for the front line",
            },
            UnlockableItem {
                name: "Boots of Speed",
                description: "Lightweight boots that quicken every step",
            },
            UnlockableItem {
                name: "Protective Helm",
                description: "A sturdy helm with a nose guard",
            },
        ],
    ),
    (
        5,
        &[
            UnlockableItem {
                name: "Flaming Sword",
                description: "A blade wreathed in undying fire",
            },
            UnlockableItem {
                name: "Magic Shield",
                description: "A shield that hums with warding runes",
            },
            UnlockableItem {
                name: "Ring of Power",
                description: "A band that sharpens the wearer's strikes",
            },
        ],
    ),
    (
        10,
        &[
            UnlockableItem {
                name: "Dragon Scale Armor",
                description: "Armor forged from shed dragon scales",
            },
            UnlockableItem {
                name: "Staff of Storms",
                description: "A staff that calls down lightning",
            },
        ],
    ),
    (
        20,
        &[
            UnlockableItem {
                name: "Phoenix Feather",
                description: "Revives its bearer once from the brink",
            },
            UnlockableItem {
                name: "Shadow Cloak",
                description: "A cloak that bends light around its wearer",
            },
        ],
    ),
    (
        50,
        &[
            UnlockableItem {
                name: "Sword of Chaos",
                description: "A blade that cuts the seams of the world",
            },
            UnlockableItem {
                name: "Armor of Time",
                description: "Armor that turns aside blows before they land",
            },
            UnlockableItem {
                name: "Ring of Reality",
                description: "A ring that anchors its wearer to what is real",
            },
        ],
    ),
];

/// Item name, quantity and catalog description granted to every new player.
pub const STARTER_BUNDLE: &[(&str, u32, &str)] = &[
    ("Game Map", 1, "Shows the known roads and safe zones"),
    ("Healing Potion", 3, "Restores a small amount of health"),
    ("Wooden Sword", 1, "A training sword for new adventurers"),
    ("Leather Shield", 1, "A light shield of boiled leather"),
];

/// Look up the catalog description of an unlockable item.
pub fn unlockable_item(name: &str) -> Option<UnlockableItem> {
    LEVEL_UNLOCKS
        .iter()
        .flat_map(|(_, items)| items.iter())
        .find(|item| item.name == name)
        .copied()
}

/// The fixed starter mission set (levels 1-3).
pub fn seed_starter_missions() -> Vec<MissionRecord> {
    vec![
        MissionRecord::new(
            "First Exploration",
            "Take your first steps into the world",
            20,
            1,
        ),
        MissionRecord::new(
            "Gathering Resources",
            "Collect basic supplies for survival",
            15,
            1,
        )
        .repeatable(),
        MissionRecord::new(
            "Learning the Ropes",
            "Get familiar with the basic controls",
            10,
            1,
        ),
        MissionRecord::new(
            "Advanced Exploration",
            "Venture into more dangerous territory",
            30,
            2,
        ),
        MissionRecord::new("Combat Mission", "Face your first enemies", 25, 2).repeatable(),
        MissionRecord::new("Honing Skills", "Sharpen your abilities", 20, 2),
        MissionRecord::new(
            "Epic Challenge",
            "Take on a truly difficult challenge",
            50,
            3,
        ),
    ]
}
