use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree,
};
use sled::{IVec, Transactional};

use crate::progression::errors::ProgressionError;
use crate::progression::state::seed_starter_missions;
use crate::progression::types::{
    CompletedMission, InventoryEntry, ItemRecord, MissionRecord, PlayerRecord, RemovalResult,
    XpOutcome, XpRecord, COMPLETION_SCHEMA_VERSION, INVENTORY_SCHEMA_VERSION, ITEM_SCHEMA_VERSION,
    MISSION_SCHEMA_VERSION, PLAYER_SCHEMA_VERSION, XP_SCHEMA_VERSION,
};

const TREE_PLAYERS: &str = "levelup_players";
const TREE_HANDLES: &str = "levelup_handles";
const TREE_XP: &str = "levelup_xp";
const TREE_ITEMS: &str = "levelup_items";
const TREE_INVENTORY: &str = "levelup_inventory";
const TREE_MISSIONS: &str = "levelup_missions";
const TREE_COMPLETIONS: &str = "levelup_completions";
const TREE_COMPLETION_INDEX: &str = "levelup_completion_index";

type TxResult<T> = ConflictableTransactionResult<T, ProgressionError>;

/// Records persisted with a schema version that must match on read.
trait Versioned: DeserializeOwned {
    const ENTITY: &'static str;
    const VERSION: u8;
    fn schema_version(&self) -> u8;
}

macro_rules! versioned {
    ($ty:ty, $entity:literal, $version:expr) => {
        impl Versioned for $ty {
            const ENTITY: &'static str = $entity;
            const VERSION: u8 = $version;
            fn schema_version(&self) -> u8 {
                self.schema_version
            }
        }
    };
}

versioned!(PlayerRecord, "player", PLAYER_SCHEMA_VERSION);
versioned!(XpRecord, "xp", XP_SCHEMA_VERSION);
versioned!(ItemRecord, "item", ITEM_SCHEMA_VERSION);
versioned!(InventoryEntry, "inventory", INVENTORY_SCHEMA_VERSION);
versioned!(MissionRecord, "mission", MISSION_SCHEMA_VERSION);
versioned!(CompletedMission, "completion", COMPLETION_SCHEMA_VERSION);

/// Map a plain result into the abort channel of a sled transaction.
fn in_tx<T>(result: Result<T, ProgressionError>) -> TxResult<T> {
    result.map_err(ConflictableTransactionError::Abort)
}

fn decode_u64(bytes: &[u8]) -> Result<u64, ProgressionError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ProgressionError::Internal(format!("corrupt u64 value ({} bytes)", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct ProgressionStoreBuilder {
    path: PathBuf,
    temporary: bool,
    ensure_mission_seed: bool,
    flush_every_ms: Option<u64>,
}

impl ProgressionStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
            ensure_mission_seed: true,
            flush_every_ms: None,
        }
    }

    /// Opt out of seeding the starter missions during initialization (useful for targeted tests).
    pub fn without_mission_seed(mut self) -> Self {
        self.ensure_mission_seed = false;
        self
    }

    /// Back the store with a sled temporary database that is removed on drop.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn flush_every_ms(mut self, interval: Option<u64>) -> Self {
        self.flush_every_ms = interval;
        self
    }

    pub fn open(self) -> Result<ProgressionStore, ProgressionError> {
        let db = if self.temporary {
            sled::Config::new().temporary(true).open()?
        } else {
            std::fs::create_dir_all(&self.path)?;
            sled::Config::new()
                .path(&self.path)
                .flush_every_ms(self.flush_every_ms)
                .open()?
        };
        ProgressionStore::from_db(db, self.ensure_mission_seed)
    }
}

/// Result of an atomic mission completion.
#[derive(Debug, Clone)]
pub struct CompletionCommit {
    pub before: XpRecord,
    pub after: XpRecord,
    pub outcome: XpOutcome,
    pub completion: CompletedMission,
}

/// Sled-backed persistence for players, XP ledgers, the item catalog,
/// inventories, missions and mission history.
pub struct ProgressionStore {
    db: sled::Db,
    players: sled::Tree,
    handles: sled::Tree,
    xp: sled::Tree,
    items: sled::Tree,
    inventory: sled::Tree,
    missions: sled::Tree,
    completions: sled::Tree,
    completion_index: sled::Tree,
}

impl ProgressionStore {
    /// Open (or create) the store rooted at `path`, seeding the starter missions
    /// if the mission catalog is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ProgressionError> {
        ProgressionStoreBuilder::new(path.as_ref()).open()
    }

    fn from_db(db: sled::Db, seed_missions: bool) -> Result<Self, ProgressionError> {
        let store = Self {
            players: db.open_tree(TREE_PLAYERS)?,
            handles: db.open_tree(TREE_HANDLES)?,
            xp: db.open_tree(TREE_XP)?,
            items: db.open_tree(TREE_ITEMS)?,
            inventory: db.open_tree(TREE_INVENTORY)?,
            missions: db.open_tree(TREE_MISSIONS)?,
            completions: db.open_tree(TREE_COMPLETIONS)?,
            completion_index: db.open_tree(TREE_COMPLETION_INDEX)?,
            db,
        };

        if seed_missions {
            store.seed_missions_if_needed()?;
        }

        Ok(store)
    }

    fn players_key(player_id: u64) -> Vec<u8> {
        format!("players:{:020}", player_id).into_bytes()
    }

    fn handle_key(handle: &str) -> Vec<u8> {
        format!("handles:{}", handle.to_ascii_lowercase()).into_bytes()
    }

    fn xp_key(player_id: u64) -> Vec<u8> {
        format!("xp:{:020}", player_id).into_bytes()
    }

    fn item_key(name: &str) -> Vec<u8> {
        format!("items:{}", name).into_bytes()
    }

    fn inventory_prefix(player_id: u64) -> Vec<u8> {
        format!("inventory:{:020}:", player_id).into_bytes()
    }

    fn inventory_key(player_id: u64, item_name: &str) -> Vec<u8> {
        format!("inventory:{:020}:{}", player_id, item_name).into_bytes()
    }

    fn mission_key(mission_id: u64) -> Vec<u8> {
        format!("missions:{:020}", mission_id).into_bytes()
    }

    fn completion_prefix(player_id: u64) -> Vec<u8> {
        format!("completions:{:020}:", player_id).into_bytes()
    }

    fn completion_key(player_id: u64, completion_id: u64) -> Vec<u8> {
        format!("completions:{:020}:{:020}", player_id, completion_id).into_bytes()
    }

    fn completion_index_key(player_id: u64, mission_id: u64) -> Vec<u8> {
        format!("completed:{:020}:{:020}", player_id, mission_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, ProgressionError> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: Versioned>(bytes: &[u8]) -> Result<T, ProgressionError> {
        let record: T = bincode::deserialize(bytes)?;
        if record.schema_version() != T::VERSION {
            return Err(ProgressionError::SchemaMismatch {
                entity: T::ENTITY,
                expected: T::VERSION,
                found: record.schema_version(),
            });
        }
        Ok(record)
    }

    fn decode_all<T: Versioned>(
        iter: impl Iterator<Item = sled::Result<(IVec, IVec)>>,
    ) -> Result<Vec<T>, ProgressionError> {
        iter.map(|entry| {
            entry
                .map_err(ProgressionError::from)
                .and_then(|(_key, value)| Self::decode(&value))
        })
        .collect()
    }

    fn tx_decode<T: Versioned>(tree: &TransactionalTree, key: &[u8]) -> TxResult<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(in_tx(Self::decode(&bytes))?)),
            None => Ok(None),
        }
    }

    fn tx_put<T: serde::Serialize>(tree: &TransactionalTree, key: &[u8], value: &T) -> TxResult<()> {
        tree.insert(key, in_tx(Self::serialize(value))?)?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64, ProgressionError> {
        // sled ids start at zero; keep zero free as a "not yet assigned" marker.
        Ok(self.db.generate_id()? + 1)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), ProgressionError> {
        self.db.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert a new player together with its handle index entry and a fresh
    /// `(level 1, 0 points)` ledger. Handles are unique case-insensitively.
    pub fn insert_player(
        &self,
        handle: &str,
        credential_hash: &str,
    ) -> Result<(PlayerRecord, XpRecord), ProgressionError> {
        self.insert_player_with_inventory(handle, credential_hash, &[])
    }

    /// [`insert_player`](Self::insert_player) plus an opening inventory, all in
    /// one transaction. Either the player exists with every `starter` entry or
    /// nothing was written.
    pub fn insert_player_with_inventory(
        &self,
        handle: &str,
        credential_hash: &str,
        starter: &[(&str, u32)],
    ) -> Result<(PlayerRecord, XpRecord), ProgressionError> {
        let player = PlayerRecord::new(self.next_id()?, handle, credential_hash);
        let ledger = XpRecord::new(player.id);
        let handle_key = Self::handle_key(handle);
        let player_key = Self::players_key(player.id);
        let xp_key = Self::xp_key(player.id);
        let entries: Vec<(Vec<u8>, InventoryEntry)> = starter
            .iter()
            .filter(|(_, quantity)| *quantity > 0)
            .map(|(name, quantity)| {
                (
                    Self::inventory_key(player.id, name),
                    InventoryEntry::new(player.id, name, *quantity),
                )
            })
            .collect();

        (&self.players, &self.handles, &self.xp, &self.inventory).transaction(
            |(players, handles, xp, inventory)| -> TxResult<()> {
                if handles.get(handle_key.as_slice())?.is_some() {
                    return ProgressionError::AlreadyExists(format!(
                        "handle '{}' is already taken",
                        player.handle
                    ))
                    .abort();
                }
                Self::tx_put(players, &player_key, &player)?;
                handles.insert(handle_key.as_slice(), &player.id.to_be_bytes()[..])?;
                Self::tx_put(xp, &xp_key, &ledger)?;
                for (key, entry) in &entries {
                    Self::tx_put(inventory, key, entry)?;
                }
                Ok(())
            },
        )?;
        self.flush()?;
        Ok((player, ledger))
    }

    /// Fetch a player record by id.
    pub fn get_player(&self, player_id: u64) -> Result<PlayerRecord, ProgressionError> {
        let Some(bytes) = self.players.get(Self::players_key(player_id))? else {
            return Err(ProgressionError::not_found(format!("player: {}", player_id)));
        };
        Self::decode(&bytes)
    }

    pub fn find_player_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<PlayerRecord>, ProgressionError> {
        let Some(id_bytes) = self.handles.get(Self::handle_key(handle))? else {
            return Ok(None);
        };
        let player_id = decode_u64(&id_bytes)?;
        self.get_player(player_id).map(Some)
    }

    pub fn player_exists(&self, player_id: u64) -> Result<bool, ProgressionError> {
        Ok(self.players.contains_key(Self::players_key(player_id))?)
    }

    /// Insert or update a player record. The handle index is not touched.
    pub fn put_player(&self, mut player: PlayerRecord) -> Result<(), ProgressionError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        player.touch();
        let bytes = Self::serialize(&player)?;
        self.players.insert(Self::players_key(player.id), bytes)?;
        self.players.flush()?;
        Ok(())
    }

    /// Read-modify-write a player record in a single transaction.
    pub fn update_player<F>(&self, player_id: u64, f: F) -> Result<PlayerRecord, ProgressionError>
    where
        F: Fn(&mut PlayerRecord),
    {
        let key = Self::players_key(player_id);
        let updated = self.players.transaction(|tx| -> TxResult<PlayerRecord> {
            let Some(mut player) = Self::tx_decode::<PlayerRecord>(tx, &key)? else {
                return ProgressionError::not_found(format!("player: {}", player_id)).abort();
            };
            f(&mut player);
            player.touch();
            Self::tx_put(tx, &key, &player)?;
            Ok(player)
        })?;
        self.players.flush()?;
        Ok(updated)
    }

    /// Change a player's handle and credential hash. The handle index entry is
    /// swapped in the same transaction, so the old handle is released exactly
    /// when the new one is claimed. A change of case only keeps the same index key.
    pub fn rename_player(
        &self,
        player_id: u64,
        new_handle: &str,
        credential_hash: &str,
    ) -> Result<PlayerRecord, ProgressionError> {
        let player_key = Self::players_key(player_id);
        let new_handle_key = Self::handle_key(new_handle);

        let updated = (&self.players, &self.handles).transaction(
            |(players, handles)| -> TxResult<PlayerRecord> {
                let Some(mut player) = Self::tx_decode::<PlayerRecord>(players, &player_key)? else {
                    return ProgressionError::not_found(format!("player: {}", player_id)).abort();
                };
                let old_handle_key = Self::handle_key(&player.handle);
                if old_handle_key != new_handle_key {
                    if handles.get(new_handle_key.as_slice())?.is_some() {
                        return ProgressionError::AlreadyExists(format!(
                            "handle '{}' is already taken",
                            new_handle
                        ))
                        .abort();
                    }
                    handles.remove(old_handle_key.as_slice())?;
                    handles.insert(new_handle_key.as_slice(), &player_id.to_be_bytes()[..])?;
                }
                player.handle = new_handle.to_string();
                player.credential_hash = credential_hash.to_string();
                player.touch();
                Self::tx_put(players, &player_key, &player)?;
                Ok(player)
            },
        )?;
        self.flush()?;
        Ok(updated)
    }

    /// Page through players in id (registration) order.
    pub fn list_players(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PlayerRecord>, ProgressionError> {
        Self::decode_all(self.players.iter().skip(offset).take(limit))
    }

    pub fn count_players(&self) -> usize {
        self.players.len()
    }

    /// Delete a player and everything it owns (ledger, handle, inventory).
    /// Mission history is kept. Returns the number of inventory entries removed.
    pub fn delete_player(&self, player_id: u64) -> Result<usize, ProgressionError> {
        let player = self.get_player(player_id)?;
        let inventory_keys: Vec<IVec> = self
            .inventory
            .scan_prefix(Self::inventory_prefix(player_id))
            .keys()
            .collect::<Result<_, _>>()?;
        let player_key = Self::players_key(player_id);
        let handle_key = Self::handle_key(&player.handle);
        let xp_key = Self::xp_key(player_id);

        (&self.players, &self.handles, &self.xp, &self.inventory).transaction(
            |(players, handles, xp, inventory)| -> TxResult<()> {
                players.remove(player_key.as_slice())?;
                handles.remove(handle_key.as_slice())?;
                xp.remove(xp_key.as_slice())?;
                for key in &inventory_keys {
                    inventory.remove(&key[..])?;
                }
                Ok(())
            },
        )?;

        // Entries stacked between the scan and the commit above. Once the player
        // key is gone `add_to_inventory` refuses new ones, so this sweep is final.
        let mut removed = inventory_keys.len();
        for key in self.inventory.scan_prefix(Self::inventory_prefix(player_id)).keys() {
            self.inventory.remove(key?)?;
            removed += 1;
        }
        self.flush()?;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // XP ledgers
    // ------------------------------------------------------------------

    pub fn get_xp_record(&self, player_id: u64) -> Result<Option<XpRecord>, ProgressionError> {
        match self.xp.get(Self::xp_key(player_id))? {
            Some(bytes) => Self::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Return the player's ledger, creating a zero ledger if none exists yet.
    /// Fails with `NotFound` when the player itself is unknown.
    pub fn ensure_xp_record(&self, player_id: u64) -> Result<XpRecord, ProgressionError> {
        if !self.player_exists(player_id)? {
            return Err(ProgressionError::not_found(format!("player: {}", player_id)));
        }
        let fresh = XpRecord::new(player_id);
        let bytes = Self::serialize(&fresh)?;
        match self
            .xp
            .compare_and_swap(Self::xp_key(player_id), None::<&[u8]>, Some(bytes))?
        {
            Ok(()) => {
                debug!("provisioned xp ledger for player {}", player_id);
                self.xp.flush()?;
                Ok(fresh)
            }
            Err(existing) => match existing.current {
                Some(current) => Self::decode(&current),
                None => Err(ProgressionError::Internal(format!(
                    "xp ledger for player {} vanished during provisioning",
                    player_id
                ))),
            },
        }
    }

    /// Insert or update an XP record.
    pub fn put_xp_record(&self, mut record: XpRecord) -> Result<(), ProgressionError> {
        record.schema_version = XP_SCHEMA_VERSION;
        let bytes = Self::serialize(&record)?;
        self.xp.insert(Self::xp_key(record.player_id), bytes)?;
        self.xp.flush()?;
        Ok(())
    }

    /// Serialized read-modify-write of one player's ledger.
    ///
    /// sled re-runs the closure when a concurrent transaction touched the same
    /// key, so two racing updates for one player never lose an increment.
    pub fn update_xp_record<T, F>(
        &self,
        player_id: u64,
        f: F,
    ) -> Result<(XpRecord, T), ProgressionError>
    where
        F: Fn(&mut XpRecord) -> Result<T, ProgressionError>,
    {
        let key = Self::xp_key(player_id);
        let result = self.xp.transaction(|tx| -> TxResult<(XpRecord, T)> {
            let Some(mut record) = Self::tx_decode::<XpRecord>(tx, &key)? else {
                return ProgressionError::not_found(format!(
                    "xp record for player: {}",
                    player_id
                ))
                .abort();
            };
            let value = in_tx(f(&mut record))?;
            record.schema_version = XP_SCHEMA_VERSION;
            Self::tx_put(tx, &key, &record)?;
            Ok((record, value))
        })?;
        self.xp.flush()?;
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Item catalog
    // ------------------------------------------------------------------

    pub fn get_item(&self, name: &str) -> Result<Option<ItemRecord>, ProgressionError> {
        match self.items.get(Self::item_key(name))? {
            Some(bytes) => Self::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Insert a catalog entry; fails with `AlreadyExists` if the name is taken.
    pub fn insert_item(&self, item: ItemRecord) -> Result<ItemRecord, ProgressionError> {
        let (stored, created) = self.insert_item_if_absent(item)?;
        if !created {
            return Err(ProgressionError::AlreadyExists(format!(
                "Item '{}' already exists",
                stored.name
            )));
        }
        Ok(stored)
    }

    /// Insert the item unless one with that name exists. Returns the stored
    /// record and whether it was created by this call.
    pub fn insert_item_if_absent(
        &self,
        mut item: ItemRecord,
    ) -> Result<(ItemRecord, bool), ProgressionError> {
        item.schema_version = ITEM_SCHEMA_VERSION;
        let bytes = Self::serialize(&item)?;
        match self
            .items
            .compare_and_swap(Self::item_key(&item.name), None::<&[u8]>, Some(bytes))?
        {
            Ok(()) => {
                self.items.flush()?;
                Ok((item, true))
            }
            Err(existing) => match existing.current {
                Some(current) => Ok((Self::decode(&current)?, false)),
                None => Err(ProgressionError::Internal(format!(
                    "item '{}' vanished during insert",
                    item.name
                ))),
            },
        }
    }

    /// Insert or update a catalog entry.
    pub fn put_item(&self, mut item: ItemRecord) -> Result<(), ProgressionError> {
        item.schema_version = ITEM_SCHEMA_VERSION;
        let bytes = Self::serialize(&item)?;
        self.items.insert(Self::item_key(&item.name), bytes)?;
        self.items.flush()?;
        Ok(())
    }

    /// Page through the catalog in name order.
    pub fn list_items(&self, offset: usize, limit: usize) -> Result<Vec<ItemRecord>, ProgressionError> {
        Self::decode_all(self.items.iter().skip(offset).take(limit))
    }

    // ------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------

    pub fn get_inventory_entry(
        &self,
        player_id: u64,
        item_name: &str,
    ) -> Result<Option<InventoryEntry>, ProgressionError> {
        match self.inventory.get(Self::inventory_key(player_id, item_name))? {
            Some(bytes) => Self::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn list_inventory(&self, player_id: u64) -> Result<Vec<InventoryEntry>, ProgressionError> {
        Self::decode_all(self.inventory.scan_prefix(Self::inventory_prefix(player_id)))
    }

    pub fn list_inventory_page(
        &self,
        player_id: u64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<InventoryEntry>, ProgressionError> {
        Self::decode_all(
            self.inventory
                .scan_prefix(Self::inventory_prefix(player_id))
                .skip(offset)
                .take(limit),
        )
    }

    /// Stack `quantity` onto the player's entry for `item_name`, creating it if
    /// absent. The player must still exist when the write commits.
    pub fn add_to_inventory(
        &self,
        player_id: u64,
        item_name: &str,
        quantity: u32,
    ) -> Result<InventoryEntry, ProgressionError> {
        let player_key = Self::players_key(player_id);
        let key = Self::inventory_key(player_id, item_name);
        let entry = (&self.players, &self.inventory).transaction(
            |(players, inventory)| -> TxResult<InventoryEntry> {
                if players.get(player_key.as_slice())?.is_none() {
                    return ProgressionError::not_found(format!("player: {}", player_id)).abort();
                }
                let entry = match Self::tx_decode::<InventoryEntry>(inventory, &key)? {
                    Some(mut existing) => {
                        let Some(total) = existing.quantity.checked_add(quantity) else {
                            return ProgressionError::bad_request(format!(
                                "quantity of '{}' would overflow",
                                item_name
                            ))
                            .abort();
                        };
                        existing.quantity = total;
                        existing.updated_at = chrono::Utc::now();
                        existing
                    }
                    None => InventoryEntry::new(player_id, item_name, quantity),
                };
                Self::tx_put(inventory, &key, &entry)?;
                Ok(entry)
            },
        )?;
        self.inventory.flush()?;
        Ok(entry)
    }

    /// Take `quantity` off the player's entry. Removing as much as or more than
    /// is held deletes the entry.
    pub fn remove_from_inventory(
        &self,
        player_id: u64,
        item_name: &str,
        quantity: u32,
    ) -> Result<RemovalResult, ProgressionError> {
        let key = Self::inventory_key(player_id, item_name);
        let result = self.inventory.transaction(|tx| -> TxResult<RemovalResult> {
            let Some(mut entry) = Self::tx_decode::<InventoryEntry>(tx, &key)? else {
                return ProgressionError::not_found(format!(
                    "Item '{}' is not in the player's inventory",
                    item_name
                ))
                .abort();
            };
            if quantity >= entry.quantity {
                tx.remove(key.as_slice())?;
                return Ok(RemovalResult::Emptied {
                    removed: entry.quantity,
                });
            }
            entry.quantity -= quantity;
            entry.updated_at = chrono::Utc::now();
            Self::tx_put(tx, &key, &entry)?;
            Ok(RemovalResult::Reduced {
                remaining: entry.quantity,
            })
        })?;
        self.inventory.flush()?;
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Missions
    // ------------------------------------------------------------------

    /// Assign an id to the mission and persist it.
    pub fn insert_mission(&self, mut mission: MissionRecord) -> Result<MissionRecord, ProgressionError> {
        mission.id = self.next_id()?;
        self.put_mission(mission.clone())?;
        Ok(mission)
    }

    /// Insert or update a mission record.
    pub fn put_mission(&self, mut mission: MissionRecord) -> Result<(), ProgressionError> {
        mission.schema_version = MISSION_SCHEMA_VERSION;
        let bytes = Self::serialize(&mission)?;
        self.missions.insert(Self::mission_key(mission.id), bytes)?;
        self.missions.flush()?;
        Ok(())
    }

    pub fn get_mission(&self, mission_id: u64) -> Result<MissionRecord, ProgressionError> {
        let Some(bytes) = self.missions.get(Self::mission_key(mission_id))? else {
            return Err(ProgressionError::not_found(format!("mission: {}", mission_id)));
        };
        Self::decode(&bytes)
    }

    /// All missions in id order.
    pub fn list_missions(&self) -> Result<Vec<MissionRecord>, ProgressionError> {
        Self::decode_all(self.missions.iter())
    }

    /// Active missions whose required level is at most `level`, in id order.
    pub fn list_active_missions_up_to_level(
        &self,
        level: u32,
    ) -> Result<Vec<MissionRecord>, ProgressionError> {
        Ok(self
            .list_missions()?
            .into_iter()
            .filter(|m| m.is_active && m.required_level <= level)
            .collect())
    }

    pub fn count_missions(&self) -> usize {
        self.missions.len()
    }

    /// Insert the given missions in a single transaction, assigning ids.
    pub fn insert_missions(
        &self,
        missions: Vec<MissionRecord>,
    ) -> Result<Vec<MissionRecord>, ProgressionError> {
        let mut stamped = Vec::with_capacity(missions.len());
        for mut mission in missions {
            mission.id = self.next_id()?;
            mission.schema_version = MISSION_SCHEMA_VERSION;
            stamped.push(mission);
        }
        self.missions.transaction(|tx| -> TxResult<()> {
            for mission in &stamped {
                Self::tx_put(tx, &Self::mission_key(mission.id), mission)?;
            }
            Ok(())
        })?;
        self.missions.flush()?;
        Ok(stamped)
    }

    /// Seed the starter missions when the mission catalog is empty.
    pub fn seed_missions_if_needed(&self) -> Result<usize, ProgressionError> {
        if !self.missions.is_empty() {
            return Ok(0);
        }
        let inserted = self.insert_missions(seed_starter_missions())?;
        info!("seeded {} starter missions", inserted.len());
        Ok(inserted.len())
    }

    /// Remove every mission, completion fact and completion index entry in one
    /// transaction, then flush so later inserts never observe stale keys.
    /// Returns `(missions_removed, completions_removed)`.
    pub fn clear_missions_and_history(&self) -> Result<(usize, usize), ProgressionError> {
        let mission_keys: Vec<IVec> = self.missions.iter().keys().collect::<Result<_, _>>()?;
        let completion_keys: Vec<IVec> =
            self.completions.iter().keys().collect::<Result<_, _>>()?;
        let index_keys: Vec<IVec> = self
            .completion_index
            .iter()
            .keys()
            .collect::<Result<_, _>>()?;

        (&self.missions, &self.completions, &self.completion_index).transaction(
            |(missions, completions, index)| -> TxResult<()> {
                for key in &completion_keys {
                    completions.remove(&key[..])?;
                }
                for key in &index_keys {
                    index.remove(&key[..])?;
                }
                for key in &mission_keys {
                    missions.remove(&key[..])?;
                }
                Ok(())
            },
        )?;
        self.flush()?;
        Ok((mission_keys.len(), completion_keys.len()))
    }

    // ------------------------------------------------------------------
    // Mission history
    // ------------------------------------------------------------------

    /// How many times the player has completed the mission.
    pub fn completion_count(&self, player_id: u64, mission_id: u64) -> Result<u64, ProgressionError> {
        match self
            .completion_index
            .get(Self::completion_index_key(player_id, mission_id))?
        {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    pub fn completion_exists(&self, player_id: u64, mission_id: u64) -> Result<bool, ProgressionError> {
        Ok(self.completion_count(player_id, mission_id)? > 0)
    }

    /// Completion facts for one player, most recent first.
    pub fn list_completions_for_player(
        &self,
        player_id: u64,
    ) -> Result<Vec<CompletedMission>, ProgressionError> {
        let mut records: Vec<CompletedMission> =
            Self::decode_all(self.completions.scan_prefix(Self::completion_prefix(player_id)))?;
        records.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    /// Completion facts for one (player, mission) pair, most recent first.
    pub fn find_completions(
        &self,
        player_id: u64,
        mission_id: u64,
    ) -> Result<Vec<CompletedMission>, ProgressionError> {
        Ok(self
            .list_completions_for_player(player_id)?
            .into_iter()
            .filter(|c| c.mission_id == mission_id)
            .collect())
    }

    /// Award the mission's XP and record the completion fact atomically.
    ///
    /// `guard` runs inside the transaction with the current ledger and the number
    /// of prior completions of this mission by this player; returning an error
    /// aborts with nothing written.
    pub fn commit_mission_completion<G>(
        &self,
        player_id: u64,
        mission: &MissionRecord,
        guard: G,
    ) -> Result<CompletionCommit, ProgressionError>
    where
        G: Fn(&XpRecord, u64) -> Result<(), ProgressionError>,
    {
        let completion_id = self.next_id()?;
        let xp_key = Self::xp_key(player_id);
        let index_key = Self::completion_index_key(player_id, mission.id);
        let completion_key = Self::completion_key(player_id, completion_id);

        let commit = (&self.xp, &self.completions, &self.completion_index).transaction(
            |(xp, completions, index)| -> TxResult<CompletionCommit> {
                let Some(before) = Self::tx_decode::<XpRecord>(xp, &xp_key)? else {
                    return ProgressionError::not_found(format!(
                        "xp record for player: {}",
                        player_id
                    ))
                    .abort();
                };
                let prior = match index.get(index_key.as_slice())? {
                    Some(bytes) => in_tx(decode_u64(&bytes))?,
                    None => 0,
                };
                in_tx(guard(&before, prior))?;

                let mut after = before.clone();
                let outcome = after.apply_gain(mission.xp_reward);
                Self::tx_put(xp, &xp_key, &after)?;

                let completion =
                    CompletedMission::new(completion_id, player_id, mission.id, mission.xp_reward);
                Self::tx_put(completions, &completion_key, &completion)?;
                index.insert(index_key.as_slice(), &(prior + 1).to_be_bytes()[..])?;

                Ok(CompletionCommit {
                    before,
                    after,
                    outcome,
                    completion,
                })
            },
        )?;
        self.flush()?;
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> ProgressionStore {
        ProgressionStoreBuilder::new(dir.path())
            .without_mission_seed()
            .open()
            .expect("store")
    }

    #[test]
    fn store_round_trip_player() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let (player, ledger) = store.insert_player("alice", "hash").expect("insert");
        assert!(player.id > 0);
        assert!(player.safe_zone);
        assert_eq!((ledger.level, ledger.points), (1, 0));

        let fetched = store.get_player(player.id).expect("get");
        assert_eq!(fetched.handle, "alice");
        assert_eq!(fetched.schema_version, PLAYER_SCHEMA_VERSION);
        let by_handle = store
            .find_player_by_handle("ALICE")
            .expect("lookup")
            .expect("present");
        assert_eq!(by_handle.id, player.id);
    }

    #[test]
    fn duplicate_handle_is_rejected_case_insensitively() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store.insert_player("Alice", "hash").expect("first");
        let err = store.insert_player("alice", "hash").unwrap_err();
        assert!(matches!(err, ProgressionError::AlreadyExists(_)));
        assert_eq!(store.count_players(), 1);
    }

    #[test]
    fn ensure_xp_record_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let (player, _) = store.insert_player("bob", "hash").expect("insert");
        store
            .update_xp_record(player.id, |xp| {
                xp.points = 42;
                Ok(())
            })
            .expect("update");
        let ledger = store.ensure_xp_record(player.id).expect("ensure");
        assert_eq!(ledger.points, 42);
        assert!(matches!(
            store.ensure_xp_record(9_999).unwrap_err(),
            ProgressionError::NotFound(_)
        ));
    }

    #[test]
    fn failed_update_leaves_ledger_untouched() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let (player, _) = store.insert_player("carol", "hash").expect("insert");
        let err = store
            .update_xp_record(player.id, |xp| -> Result<(), ProgressionError> {
                xp.points = 99;
                Err(ProgressionError::bad_request("nope"))
            })
            .unwrap_err();
        assert!(matches!(err, ProgressionError::BadRequest(_)));
        let ledger = store.get_xp_record(player.id).expect("get").expect("present");
        assert_eq!(ledger.points, 0);
    }

    #[test]
    fn seeding_missions_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = ProgressionStoreBuilder::new(dir.path()).open().expect("store");
            assert_eq!(store.count_missions(), 7);
        }
        let store = open_store(&dir);
        assert_eq!(store.seed_missions_if_needed().expect("seed check"), 0);
        assert_eq!(store.count_missions(), 7);
    }

    #[test]
    fn delete_player_cascades_to_ledger_and_inventory() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let (player, _) = store.insert_player("dave", "hash").expect("insert");
        store.add_to_inventory(player.id, "Rope", 2).expect("add");
        store.add_to_inventory(player.id, "Torch", 1).expect("add");

        assert_eq!(store.delete_player(player.id).expect("delete"), 2);
        assert!(!store.player_exists(player.id).expect("exists"));
        assert!(store.get_xp_record(player.id).expect("xp").is_none());
        assert!(store.list_inventory(player.id).expect("inv").is_empty());
        assert!(store.find_player_by_handle("dave").expect("lookup").is_none());
        // Handle is free again.
        store.insert_player("dave", "hash").expect("re-register");
    }

    #[test]
    fn inventory_writes_require_a_live_player() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let err = store.add_to_inventory(4242, "Rope", 1).unwrap_err();
        assert!(matches!(err, ProgressionError::NotFound(_)));

        let (player, _) = store.insert_player("ghost", "hash").expect("insert");
        store.add_to_inventory(player.id, "Rope", 1).expect("add");
        store.delete_player(player.id).expect("delete");
        let err = store.add_to_inventory(player.id, "Rope", 1).unwrap_err();
        assert!(matches!(err, ProgressionError::NotFound(_)));
        assert!(store.list_inventory(player.id).expect("inv").is_empty());
    }

    #[test]
    fn starter_inventory_commits_with_the_player() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let starter = [("Game Map", 1), ("Healing Potion", 3)];
        let (player, _) = store
            .insert_player_with_inventory("erin", "hash", &starter)
            .expect("insert");
        let held: Vec<(String, u32)> = store
            .list_inventory(player.id)
            .expect("inv")
            .into_iter()
            .map(|entry| (entry.item_name, entry.quantity))
            .collect();
        assert_eq!(
            held,
            vec![("Game Map".to_string(), 1), ("Healing Potion".to_string(), 3)]
        );

        let err = store
            .insert_player_with_inventory("ERIN", "hash", &starter)
            .unwrap_err();
        assert!(matches!(err, ProgressionError::AlreadyExists(_)));
        assert_eq!(store.count_players(), 1);
        assert_eq!(store.inventory.len(), 2);
        assert_eq!(store.xp.len(), 1);
    }

    #[test]
    fn rename_player_swaps_handle_index() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let (frank, _) = store.insert_player("frank", "old-hash").expect("insert");
        let (gina, _) = store.insert_player("gina", "hash").expect("insert");

        let renamed = store
            .rename_player(frank.id, "francis", "new-hash")
            .expect("rename");
        assert_eq!(renamed.handle, "francis");
        assert_eq!(renamed.credential_hash, "new-hash");
        assert!(store.find_player_by_handle("frank").expect("lookup").is_none());
        assert_eq!(
            store.find_player_by_handle("FRANCIS").expect("lookup").map(|p| p.id),
            Some(frank.id)
        );
        // The released handle can be claimed again.
        store.insert_player("frank", "hash").expect("reuse");

        let err = store.rename_player(frank.id, "Gina", "x").unwrap_err();
        assert!(matches!(err, ProgressionError::AlreadyExists(_)));
        assert_eq!(store.get_player(frank.id).expect("get").handle, "francis");
        assert_eq!(
            store.find_player_by_handle("gina").expect("lookup").map(|p| p.id),
            Some(gina.id)
        );

        let recased = store.rename_player(gina.id, "Gina", "hash").expect("recase");
        assert_eq!(recased.handle, "Gina");
        assert_eq!(
            store.find_player_by_handle("gina").expect("lookup").map(|p| p.id),
            Some(gina.id)
        );

        let err = store.rename_player(999, "nobody", "x").unwrap_err();
        assert!(matches!(err, ProgressionError::NotFound(_)));
    }

    #[test]
    fn temporary_store_opens_without_path() {
        let store = ProgressionStoreBuilder::new("unused")
            .temporary()
            .open()
            .expect("temporary store");
        assert_eq!(store.count_missions(), 7);
    }
}
