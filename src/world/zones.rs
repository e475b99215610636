//! Zone registry: named partitions of rooms and their shared configuration.

use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::world::errors::WorldError;
use crate::world::mutators::MutatorList;
use crate::world::room::Room;
use crate::world::types::RoomId;

/// Random mob level range for spawns without a fixed level.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MobAutoScale {
    #[serde(default)]
    pub minimum: u32,
    #[serde(default)]
    pub maximum: u32,
}

impl MobAutoScale {
    pub fn is_enabled(&self) -> bool {
        self.minimum > 0
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let max = self.maximum.max(self.minimum);
        rng.gen_range(self.minimum..=max)
    }
}

/// Zone-wide settings. Stored on the zone's root room, whose id it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneConfig {
    pub room_id: RoomId,
    #[serde(default)]
    pub mob_auto_scale: MobAutoScale,
    #[serde(default, skip_serializing_if = "MutatorList::is_empty")]
    pub mutators: MutatorList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_biome: Option<String>,
}

impl ZoneConfig {
    pub fn for_root(room_id: RoomId) -> Self {
        Self {
            room_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneInfo {
    pub root_room_id: Option<RoomId>,
    pub default_biome: Option<String>,
    pub has_zone_mutators: bool,
    pub room_ids: BTreeSet<RoomId>,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: HashMap<String, ZoneInfo>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a room's membership, creating the zone on first sight.
    pub fn observe(&mut self, room: &Room) {
        let zone = self.zones.entry(room.zone.clone()).or_default();
        zone.room_ids.insert(room.room_id);
        if let Some(cfg) = &room.zone_config {
            if cfg.room_id == room.room_id {
                zone.root_room_id = Some(room.room_id);
                zone.has_zone_mutators = !cfg.mutators.is_empty();
                if cfg.default_biome.is_some() {
                    zone.default_biome = cfg.default_biome.clone();
                }
            }
        }
        if zone.default_biome.is_none() && !room.biome.is_empty() {
            zone.default_biome = Some(room.biome.clone());
        }
    }

    pub fn remove_room(&mut self, zone: &str, room_id: RoomId) {
        if let Some(info) = self.zones.get_mut(zone) {
            info.room_ids.remove(&room_id);
            if info.root_room_id == Some(room_id) {
                info.root_room_id = None;
            }
        }
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.zones.contains_key(zone)
    }

    pub fn get(&self, zone: &str) -> Option<&ZoneInfo> {
        self.zones.get(zone)
    }

    pub fn root(&self, zone: &str) -> Result<RoomId, WorldError> {
        self.zones
            .get(zone)
            .ok_or_else(|| WorldError::NotFound(format!("zone {zone}")))?
            .root_room_id
            .ok_or_else(|| WorldError::NotFound(format!("root room of zone {zone}")))
    }

    /// Root room and member count.
    pub fn stats(&self, zone: &str) -> Result<(RoomId, usize), WorldError> {
        let info = self
            .zones
            .get(zone)
            .ok_or_else(|| WorldError::NotFound(format!("zone {zone}")))?;
        let root = info
            .root_room_id
            .ok_or_else(|| WorldError::NotFound(format!("root room of zone {zone}")))?;
        Ok((root, info.room_ids.len()))
    }

    pub fn room_count(&self, zone: &str) -> usize {
        self.zones.get(zone).map_or(0, |z| z.room_ids.len())
    }

    pub fn room_ids(&self, zone: &str) -> Vec<RoomId> {
        self.zones
            .get(zone)
            .map(|z| z.room_ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn default_biome(&self, zone: &str) -> Option<&str> {
        self.zones.get(zone)?.default_biome.as_deref()
    }

    /// Zones whose root carries zone-wide mutators, as (zone, root room).
    pub fn zones_with_mutators(&self) -> Vec<(String, RoomId)> {
        let mut out: Vec<(String, RoomId)> = self
            .zones
            .iter()
            .filter(|(_, z)| z.has_zone_mutators)
            .filter_map(|(name, z)| z.root_room_id.map(|r| (name.clone(), r)))
            .collect();
        out.sort();
        out
    }

    pub fn set_has_zone_mutators(&mut self, zone: &str, flag: bool) {
        if let Some(info) = self.zones.get_mut(zone) {
            info.has_zone_mutators = flag;
        }
    }

    pub fn zone_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.zones.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Resolve a typed zone name: exact, then case-insensitive, then substring.
    pub fn find_zone_name(&self, partial: &str) -> Option<String> {
        if self.zones.contains_key(partial) {
            return Some(partial.to_string());
        }
        let needle = partial.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let names = self.zone_names();
        names
            .iter()
            .find(|n| n.to_lowercase() == needle)
            .or_else(|| names.iter().find(|n| n.to_lowercase().contains(&needle)))
            .cloned()
    }
}

/// Zone names are letters, digits, underscores and spaces.
pub fn validate_zone_name(name: &str) -> Result<(), WorldError> {
    if name.trim().is_empty() {
        return Err(WorldError::InvalidZone("zone name is empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
    {
        return Err(WorldError::InvalidZone(format!(
            "{name:?} may only contain letters, numbers, spaces and underscores"
        )));
    }
    Ok(())
}

/// Directory a zone's room files live in.
pub fn zone_to_folder(zone: &str) -> String {
    zone.trim().to_lowercase().replace(' ', "_")
}
