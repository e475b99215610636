//! Room store: lazy-loading room cache backed by one JSON file per room.
//!
//! Rooms are materialized on first reference and stay resident until the
//! maintenance pass decides they have been idle long enough. Zone membership,
//! the id -> file cache and the next-room-id counter are maintained for every
//! room on disk, not only for resident ones.
//!
//! Layout on disk:
//!
//! ```text
//! {data_dir}/world_state.json          next room id and current round
//! {data_dir}/rooms/{zone_folder}/{id}.json
//! ```

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::WorldConfig;
use crate::logutil::preview;
use crate::metrics;
use crate::world::biomes::BiomeCatalog;
use crate::world::collaborators::MobFactory;
use crate::world::errors::WorldError;
use crate::world::room::{Room, ROOM_SCHEMA_VERSION};
use crate::world::types::{RoomExit, RoomId};
use crate::world::zones::{validate_zone_name, zone_to_folder, ZoneConfig, ZoneRegistry};

const ROOM_FILE_EXT: &str = "json";
const NEW_ROOM_TITLE: &str = "An Unfinished Room";
const NEW_ROOM_DESCRIPTION: &str = "Bare walls wait for someone to describe them.";
const NEW_ZONE_BIOME: &str = "city";

/// Hex sha256 of a description, used as its pool key.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Shared, deduplicated room descriptions keyed by content hash.
#[derive(Debug, Default)]
pub struct DescriptionPool {
    entries: HashMap<String, Arc<str>>,
}

impl DescriptionPool {
    pub fn intern(&mut self, text: &str) -> Arc<str> {
        self.entries
            .entry(content_hash(text))
            .or_insert_with(|| Arc::from(text))
            .clone()
    }

    pub fn get(&self, hash: &str) -> Option<Arc<str>> {
        self.entries.get(hash).cloned()
    }

    /// Drop descriptions no resident room refers to.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, text| Arc::strong_count(text) > 1);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorldStateFile {
    next_room_id: RoomId,
    /// Round the clock had reached. Saved rounds in room files are relative to it.
    #[serde(default)]
    current_round: u64,
}

pub struct RoomStore {
    rooms_dir: PathBuf,
    state_path: PathBuf,
    careful_save: bool,
    start_room: RoomId,
    biomes: BiomeCatalog,
    rooms: HashMap<RoomId, Room>,
    zones: ZoneRegistry,
    descriptions: DescriptionPool,
    file_cache: HashMap<RoomId, PathBuf>,
    next_room_id: RoomId,
    current_round: u64,
}

impl RoomStore {
    pub fn open(config: &WorldConfig, biomes: BiomeCatalog) -> Result<Self, WorldError> {
        let rooms_dir = config.rooms_dir();
        fs::create_dir_all(&rooms_dir)?;

        let state_path = config.world_state_path();
        let (next_room_id, current_round) = if state_path.exists() {
            let text = fs::read_to_string(&state_path).map_err(|e| WorldError::load(&state_path, e))?;
            let state: WorldStateFile =
                serde_json::from_str(&text).map_err(|e| WorldError::load(&state_path, e))?;
            (state.next_room_id.max(1), state.current_round)
        } else {
            (1, 0)
        };

        Ok(Self {
            rooms_dir,
            state_path,
            careful_save: config.careful_save,
            start_room: config.start_room,
            biomes,
            rooms: HashMap::new(),
            zones: ZoneRegistry::new(),
            descriptions: DescriptionPool::default(),
            file_cache: HashMap::new(),
            next_room_id,
            current_round,
        })
    }

    pub fn rooms_dir(&self) -> &Path {
        &self.rooms_dir
    }

    pub fn biomes(&self) -> &BiomeCatalog {
        &self.biomes
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    pub fn zones_mut(&mut self) -> &mut ZoneRegistry {
        &mut self.zones
    }

    pub fn descriptions(&self) -> &DescriptionPool {
        &self.descriptions
    }

    pub fn prune_descriptions(&mut self) -> usize {
        self.descriptions.prune()
    }

    pub fn next_room_id(&self) -> RoomId {
        self.next_room_id
    }

    pub fn start_room(&self) -> RoomId {
        self.start_room
    }

    pub fn current_round(&self) -> u64 {
        self.current_round
    }

    /// Round stamped onto rooms as they load.
    pub fn set_current_round(&mut self, round: u64) {
        self.current_round = round;
    }

    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    pub fn room_mut(&mut self, room_id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&room_id)
    }

    pub fn is_resident(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    pub fn resident_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn resident_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Rooms known to exist on disk.
    pub fn room_count_on_disk(&self) -> usize {
        self.file_cache.len()
    }

    fn room_path(&self, zone: &str, room_id: RoomId) -> PathBuf {
        self.rooms_dir
            .join(zone_to_folder(zone))
            .join(format!("{room_id}.{ROOM_FILE_EXT}"))
    }

    /// Resolve a room, loading it from disk if it is not resident. Id 0 is the start room.
    pub fn load_room(&mut self, room_id: RoomId) -> Option<&mut Room> {
        let room_id = if room_id == 0 { self.start_room } else { room_id };

        if self.rooms.contains_key(&room_id) {
            debug!("Room cache hit: {}", room_id);
            return self.rooms.get_mut(&room_id);
        }

        debug!("Room cache miss: {}", room_id);
        let path = self.find_room_file(room_id)?;
        let room = match read_room_file(&path) {
            Ok(room) if room.room_id == room_id => room,
            Ok(room) => {
                warn!(
                    "Room file {} holds room {} instead of {}",
                    path.display(),
                    room.room_id,
                    room_id
                );
                metrics::inc_load_failures();
                return None;
            }
            Err(e) => {
                warn!("Could not load room {}: {}", room_id, e);
                metrics::inc_load_failures();
                self.file_cache.remove(&room_id);
                return None;
            }
        };

        if let Err(e) = self.register(room, Some(path)) {
            warn!("Room {} failed validation on load: {}", room_id, e);
            metrics::inc_load_failures();
            return None;
        }
        metrics::inc_rooms_loaded();
        self.rooms.get_mut(&room_id)
    }

    fn find_room_file(&mut self, room_id: RoomId) -> Option<PathBuf> {
        if let Some(path) = self.file_cache.get(&room_id) {
            if path.exists() {
                return Some(path.clone());
            }
            debug!("Cached path for room {} is gone", room_id);
            self.file_cache.remove(&room_id);
        }

        let file_name = format!("{room_id}.{ROOM_FILE_EXT}");
        let found = self
            .room_files()
            .ok()?
            .into_iter()
            .find(|p| p.file_name().is_some_and(|n| n == file_name.as_str()))?;
        self.file_cache.insert(room_id, found.clone());
        Some(found)
    }

    /// Every room file under the rooms directory, zone folders one level deep.
    fn room_files(&self) -> Result<Vec<PathBuf>, WorldError> {
        let mut files = Vec::new();
        if !self.rooms_dir.is_dir() {
            return Ok(files);
        }
        for entry in fs::read_dir(&self.rooms_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                for inner in fs::read_dir(&path)? {
                    let inner = inner?.path();
                    if is_room_file(&inner) {
                        files.push(inner);
                    }
                }
            } else if is_room_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Validate a new room and make it resident. Refuses ids that are already in use.
    pub fn add_room(&mut self, room: Room) -> Result<(), WorldError> {
        if self.rooms.contains_key(&room.room_id) || self.file_cache.contains_key(&room.room_id) {
            return Err(WorldError::validation(room.room_id, "room id already in use"));
        }
        self.register(room, None)
    }

    fn register(&mut self, mut room: Room, path: Option<PathBuf>) -> Result<(), WorldError> {
        if room.biome.is_empty() {
            if let Some(biome) = self.zones.default_biome(&room.zone) {
                room.biome = biome.to_string();
            }
        }
        room.validate(&self.biomes)?;

        room.description = self.descriptions.intern(&room.description);
        if room.room_id >= self.next_room_id {
            self.next_room_id = room.room_id + 1;
        }
        self.zones.observe(&room);
        room.touch(self.current_round);

        let path = path.unwrap_or_else(|| self.room_path(&room.zone, room.room_id));
        self.file_cache.insert(room.room_id, path);
        debug!(
            "Room {} ({}) resident: {}",
            room.room_id,
            room.zone,
            preview(&room.title)
        );
        self.rooms.insert(room.room_id, room);
        Ok(())
    }

    fn allocate_room_id(&mut self) -> RoomId {
        let id = self.next_room_id;
        self.next_room_id += 1;
        id
    }

    pub fn save_room(&mut self, room_id: RoomId) -> Result<(), WorldError> {
        let room = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| WorldError::NotFound(format!("room {room_id}")))?;
        let path = self.save_room_record(room)?;
        self.file_cache.insert(room_id, path);
        Ok(())
    }

    /// Write a room to its zone folder. Returns the path written.
    pub fn save_room_record(&self, room: &Room) -> Result<PathBuf, WorldError> {
        let path = self.room_path(&room.zone, room.room_id);
        let content = serde_json::to_string_pretty(room)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| WorldError::Persistence {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let written = if self.careful_save {
            write_file_locked(&path, &content)
        } else {
            fs::write(&path, content)
        };
        written.map_err(|source| WorldError::Persistence {
            path: path.clone(),
            source,
        })?;

        metrics::inc_rooms_saved();
        debug!("Saved room {} to {}", room.room_id, path.display());
        Ok(path)
    }

    pub fn save_all(&mut self) -> Result<usize, WorldError> {
        let ids = self.resident_ids();
        for id in &ids {
            self.save_room(*id)?;
        }
        self.save_world_state()?;
        Ok(ids.len())
    }

    pub fn save_world_state(&self) -> Result<(), WorldError> {
        let content = serde_json::to_string_pretty(&WorldStateFile {
            next_room_id: self.next_room_id,
            current_round: self.current_round,
        })?;
        if let Some(dir) = self.state_path.parent() {
            fs::create_dir_all(dir)?;
        }
        write_file_locked(&self.state_path, &content).map_err(|source| WorldError::Persistence {
            path: self.state_path.clone(),
            source,
        })
    }

    /// Startup scan: read every room file once to build zone metadata and the file cache.
    /// Any unreadable or invalid room aborts the scan.
    pub fn load_all_room_zones(&mut self) -> Result<usize, WorldError> {
        let mut entrances: HashSet<RoomId> = HashSet::new();
        let mut seen: Vec<(RoomId, String)> = Vec::new();

        let mut files = self.room_files()?;
        // roots first so zone default biomes are known before their members
        let mut parsed = Vec::with_capacity(files.len());
        for path in files.drain(..) {
            let room = read_room_file(&path)?;
            parsed.push((path, room));
        }
        parsed.sort_by_key(|(_, room)| (!room.is_zone_root(), room.room_id));

        for (path, mut room) in parsed {
            let stem_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<RoomId>().ok());
            if stem_id != Some(room.room_id) {
                return Err(WorldError::load(
                    &path,
                    format!("file name does not match room id {}", room.room_id),
                ));
            }
            if let Some(previous) = self.file_cache.get(&room.room_id) {
                if previous != &path {
                    return Err(WorldError::load(
                        &path,
                        format!("room id {} also defined in {}", room.room_id, previous.display()),
                    ));
                }
            }

            if room.biome.is_empty() {
                if let Some(biome) = self.zones.default_biome(&room.zone) {
                    room.biome = biome.to_string();
                }
            }
            room.validate(&self.biomes)?;

            for target in room.exit_targets() {
                if target != room.room_id {
                    entrances.insert(target);
                }
            }
            if room.room_id >= self.next_room_id {
                self.next_room_id = room.room_id + 1;
            }
            self.zones.observe(&room);
            self.file_cache.insert(room.room_id, path);
            seen.push((room.room_id, room.zone.clone()));
        }

        for (room_id, zone) in &seen {
            if !entrances.contains(room_id) && *room_id != self.start_room {
                warn!("Room {} ({}) has no entrance", room_id, zone);
            }
        }

        self.save_world_state()?;
        info!(
            "Indexed {} rooms across {} zones (next room id {})",
            seen.len(),
            self.zones.len(),
            self.next_room_id
        );
        Ok(seen.len())
    }

    /// Idle, empty rooms that may be unloaded, oldest first, capped so at
    /// least `min_resident` rooms stay in memory.
    pub fn eviction_candidates(&self, now: u64, idle_rounds: u64, min_resident: usize) -> Vec<RoomId> {
        let quota = self.rooms.len().saturating_sub(min_resident);
        if quota == 0 {
            return Vec::new();
        }
        let threshold = now.saturating_sub(idle_rounds);
        let mut candidates: Vec<(u64, RoomId)> = self
            .rooms
            .values()
            .filter(|r| r.player_count() == 0 && r.last_visited() < threshold)
            .map(|r| (r.last_visited(), r.room_id))
            .collect();
        candidates.sort_unstable();
        candidates.truncate(quota);
        candidates.into_iter().map(|(_, id)| id).collect()
    }

    /// Save and unload a room. Refuses rooms with players. On a failed save
    /// the room stays resident and the error is returned. Mobs that call
    /// this room home are destroyed; wanderers from elsewhere are left alive.
    pub fn evict(&mut self, room_id: RoomId, mobs: &mut dyn MobFactory) -> Result<bool, WorldError> {
        let Some(room) = self.rooms.get(&room_id) else {
            return Ok(false);
        };
        if room.player_count() > 0 {
            return Ok(false);
        }
        self.save_room_record(room)?;

        let Some(room) = self.rooms.remove(&room_id) else {
            return Ok(false);
        };
        for instance_id in room.mobs() {
            let lives_here = mobs
                .get_instance(*instance_id)
                .is_some_and(|m| m.home_room_id() == room_id);
            if lives_here {
                mobs.destroy_instance(*instance_id);
            }
        }
        for spawn in &room.spawn_info {
            if let Some(instance_id) = spawn.instance_id {
                let still_here = mobs
                    .get_instance(instance_id)
                    .is_some_and(|m| m.room_id() == room_id);
                if still_here {
                    mobs.destroy_instance(instance_id);
                }
            }
        }

        metrics::inc_rooms_evicted();
        info!("Unloaded room {} ({})", room_id, room.zone);
        Ok(true)
    }

    /// Root room's zone config for a zone, loading the root if necessary.
    pub fn zone_config(&mut self, zone: &str) -> Option<ZoneConfig> {
        let root = self.zones.root(zone).ok()?;
        self.load_room(root)?.zone_config.clone()
    }

    /// Create a zone with a fresh root room.
    pub fn create_zone(&mut self, name: &str) -> Result<RoomId, WorldError> {
        validate_zone_name(name)?;
        let name = name.trim();
        if self
            .zones
            .zone_names()
            .iter()
            .any(|z| z.eq_ignore_ascii_case(name))
        {
            return Err(WorldError::InvalidZone(format!("zone {name} already exists")));
        }

        let room_id = self.allocate_room_id();
        let mut room = Room::new(room_id, name, NEW_ROOM_TITLE, NEW_ROOM_DESCRIPTION).with_biome(NEW_ZONE_BIOME);
        room.zone_config = Some(ZoneConfig::for_root(room_id));
        self.add_room(room)?;
        self.save_room(room_id)?;
        self.save_world_state()?;
        info!("Created zone {} with root room {}", name, room_id);
        Ok(room_id)
    }

    /// Create a room in the same zone as `from`, reachable from it through `exit_name`.
    pub fn build_room(
        &mut self,
        from: RoomId,
        exit_name: &str,
        map_direction: Option<&str>,
    ) -> Result<RoomId, WorldError> {
        let source = self
            .load_room(from)
            .ok_or_else(|| WorldError::NotFound(format!("room {from}")))?;
        if source.exits.contains_key(exit_name) {
            return Err(WorldError::validation(
                from,
                format!("exit {exit_name:?} already exists"),
            ));
        }
        let zone = source.zone.clone();
        let biome = source.biome.clone();

        let room_id = self.allocate_room_id();
        let room = Room::new(room_id, zone, NEW_ROOM_TITLE, NEW_ROOM_DESCRIPTION).with_biome(biome);
        self.add_room(room)?;
        self.save_room(room_id)?;
        self.connect_room(from, room_id, exit_name, map_direction)?;
        self.save_world_state()?;
        Ok(room_id)
    }

    /// Add a one-way exit from `from` to `to`.
    pub fn connect_room(
        &mut self,
        from: RoomId,
        to: RoomId,
        exit_name: &str,
        map_direction: Option<&str>,
    ) -> Result<(), WorldError> {
        if exit_name.trim().is_empty() {
            return Err(WorldError::validation(from, "exit name is empty"));
        }
        if self.load_room(to).is_none() {
            return Err(WorldError::Reference(format!("exit target room {to}")));
        }
        let source = self
            .load_room(from)
            .ok_or_else(|| WorldError::NotFound(format!("room {from}")))?;
        let mut exit = RoomExit::to(to);
        exit.map_direction = map_direction.map(str::to_string);
        source.set_exit(exit_name.trim(), exit);
        self.save_room(from)
    }

    /// Move a non-root room into another existing zone, relocating its file.
    pub fn move_to_zone(&mut self, room_id: RoomId, zone: &str) -> Result<(), WorldError> {
        let zone = self
            .zones
            .find_zone_name(zone)
            .ok_or_else(|| WorldError::NotFound(format!("zone {zone}")))?;
        let old_path = self.file_cache.get(&room_id).cloned();

        let room = self
            .load_room(room_id)
            .ok_or_else(|| WorldError::NotFound(format!("room {room_id}")))?;
        if room.is_zone_root() {
            return Err(WorldError::InvalidZone(format!(
                "room {room_id} is the root of zone {}",
                room.zone
            )));
        }
        if room.zone == zone {
            return Ok(());
        }
        let old_zone = std::mem::replace(&mut room.zone, zone.clone());

        self.zones.remove_room(&old_zone, room_id);
        if let Some(room) = self.rooms.get(&room_id) {
            self.zones.observe(room);
        }
        self.save_room(room_id)?;

        if let Some(old) = old_path {
            if Some(&old) != self.file_cache.get(&room_id) {
                if let Err(e) = fs::remove_file(&old) {
                    warn!("Could not remove old room file {}: {}", old.display(), e);
                }
            }
        }
        info!("Moved room {} from {} to {}", room_id, old_zone, zone);
        Ok(())
    }

    /// Resident room with the most floor items, for cleanup tooling.
    pub fn room_with_most_items(&self, skip: &[RoomId]) -> Option<(RoomId, usize)> {
        self.rooms
            .values()
            .filter(|r| !skip.contains(&r.room_id) && !r.items.is_empty())
            .map(|r| (r.room_id, r.items.len()))
            .max_by_key(|(id, n)| (*n, std::cmp::Reverse(*id)))
    }
}

fn is_room_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|ext| ext == ROOM_FILE_EXT)
        && !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
}

fn read_room_file(path: &Path) -> Result<Room, WorldError> {
    let text = fs::read_to_string(path).map_err(|e| WorldError::load(path, e))?;
    let room: Room = serde_json::from_str(&text).map_err(|e| WorldError::load(path, e))?;
    if room.schema_version != ROOM_SCHEMA_VERSION {
        return Err(WorldError::SchemaMismatch {
            entity: "room",
            expected: ROOM_SCHEMA_VERSION,
            found: room.schema_version,
        });
    }
    Ok(room)
}

/// Lock the destination, write a sibling temp file, fsync and rename it into place.
fn write_file_locked(path: &Path, content: &str) -> std::io::Result<()> {
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    lock_file.lock_exclusive()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("room.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e),
        }
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    drop(lock_file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (RoomStore, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let config = WorldConfig::with_data_dir(dir.path().to_string_lossy().to_string());
        let store = RoomStore::open(&config, BiomeCatalog::builtin()).expect("open store");
        (store, dir)
    }

    #[test]
    fn description_pool_dedupes() {
        let mut pool = DescriptionPool::default();
        let a = pool.intern("A quiet lane.");
        let b = pool.intern("A quiet lane.");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&content_hash("A quiet lane.")).as_deref(), Some("A quiet lane."));
        drop(a);
        drop(b);
        assert_eq!(pool.prune(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn careful_save_leaves_no_temp_files() {
        let (mut store, dir) = create_test_store();
        let room = Room::new(5, "Glade", "Glade", "Soft grass.").with_biome("forest");
        store.add_room(room).expect("add");
        store.save_room(5).expect("save");

        let zone_dir = dir.path().join("rooms").join("glade");
        let names: Vec<String> = fs::read_dir(&zone_dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["5.json".to_string()]);
        assert_eq!(store.next_room_id(), 6);
    }

    #[test]
    fn rejects_duplicate_ids_and_unknown_biomes() {
        let (mut store, _dir) = create_test_store();
        let room = Room::new(1, "Glade", "Glade", "Soft grass.").with_biome("forest");
        store.add_room(room.clone()).expect("add");
        assert!(store.add_room(room).is_err());

        let lava = Room::new(2, "Glade", "Lava", "Hot.").with_biome("lava");
        assert!(matches!(
            store.add_room(lava),
            Err(WorldError::Validation { room_id: 2, .. })
        ));
    }

    #[test]
    fn empty_biome_inherits_zone_default() {
        let (mut store, _dir) = create_test_store();
        store
            .add_room(Room::new(1, "Marsh", "Edge", "Reeds.").with_biome("swamp"))
            .expect("add");
        store
            .add_room(Room::new(2, "Marsh", "Deeper", "More reeds."))
            .expect("add");
        assert_eq!(store.room(2).map(|r| r.biome.as_str()), Some("swamp"));
    }

    #[test]
    fn missing_room_is_none() {
        let (mut store, _dir) = create_test_store();
        assert!(store.load_room(404).is_none());
    }
}
