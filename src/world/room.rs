//! The room entity: identity, exits, contents, spawn rules, mutators and the
//! transient occupancy and visitor state that never hits disk.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::world::biomes::BiomeCatalog;
use crate::world::clock::GameClock;
use crate::world::collaborators::{Actor, AggroTarget, EventBus, MobFactory, UserDirectory, WorldMessage};
use crate::world::errors::WorldError;
use crate::world::matching::find_match_in;
use crate::world::mutators::{MutatorCatalog, MutatorList, MutatorSpec};
use crate::world::types::{
    AreaEffect, AreaEffectType, Container, FindFlags, Item, ItemId, MobInstanceId, RoomExit,
    RoomId, ScratchValue, Sign, SpawnInfo, TemporaryExit, UserId, VisitorType,
};
use crate::world::zones::ZoneConfig;

pub const ROOM_SCHEMA_VERSION: u8 = 1;
pub const DEFAULT_MAP_SYMBOL: char = '•';
pub const DEFAULT_MAP_LEGEND: &str = "Room";

/// Diagonals must be typed in full; `south` should never pick `southeast`.
const EXACT_ONLY_EXITS: [&str; 4] = ["southeast", "southwest", "northeast", "northwest"];

fn room_schema_version() -> u8 {
    ROOM_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(default = "room_schema_version")]
    pub schema_version: u8,
    pub room_id: RoomId,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_config: Option<ZoneConfig>,
    pub title: String,
    pub description: Arc<str>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub map_symbol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub map_legend: String,
    #[serde(default)]
    pub biome: String,
    #[serde(default)]
    pub exits: BTreeMap<String, RoomExit>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exits_temp: BTreeMap<String, TemporaryExit>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stash: Vec<Item>,
    #[serde(default)]
    pub gold: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spawn_info: Vec<SpawnInfo>,
    #[serde(default, skip_serializing_if = "MutatorList::is_empty")]
    pub mutators: MutatorList,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signs: Vec<Sign>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub long_term_data: BTreeMap<String, ScratchValue>,

    #[serde(skip)]
    temp_data: HashMap<String, ScratchValue>,
    #[serde(skip)]
    effects: HashMap<AreaEffectType, AreaEffect>,
    #[serde(skip)]
    players: Vec<UserId>,
    #[serde(skip)]
    mobs: Vec<MobInstanceId>,
    #[serde(skip)]
    visitors: HashMap<VisitorType, HashMap<u32, u64>>,
    #[serde(skip)]
    last_visited: u64,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        zone: impl Into<String>,
        title: impl Into<String>,
        description: impl AsRef<str>,
    ) -> Self {
        Self {
            schema_version: ROOM_SCHEMA_VERSION,
            room_id,
            zone: zone.into(),
            zone_config: None,
            title: title.into(),
            description: Arc::from(description.as_ref()),
            map_symbol: String::new(),
            map_legend: String::new(),
            biome: String::new(),
            exits: BTreeMap::new(),
            exits_temp: BTreeMap::new(),
            containers: BTreeMap::new(),
            items: Vec::new(),
            stash: Vec::new(),
            gold: 0,
            spawn_info: Vec::new(),
            mutators: MutatorList::new(),
            signs: Vec::new(),
            long_term_data: BTreeMap::new(),
            temp_data: HashMap::new(),
            effects: HashMap::new(),
            players: Vec::new(),
            mobs: Vec::new(),
            visitors: HashMap::new(),
            last_visited: 0,
        }
    }

    pub fn with_biome(mut self, biome: impl Into<String>) -> Self {
        self.biome = biome.into();
        self
    }

    pub fn with_exit(mut self, name: impl Into<String>, exit: RoomExit) -> Self {
        self.exits.insert(name.into(), exit);
        self
    }

    pub fn is_zone_root(&self) -> bool {
        self.zone_config
            .as_ref()
            .is_some_and(|cfg| cfg.room_id == self.room_id)
    }

    pub fn validate(&mut self, biomes: &BiomeCatalog) -> Result<(), WorldError> {
        if self.title.trim().is_empty() {
            return Err(WorldError::validation(self.room_id, "title is empty"));
        }
        if self.description.trim().is_empty() {
            return Err(WorldError::validation(self.room_id, "description is empty"));
        }
        if self.zone.trim().is_empty() {
            return Err(WorldError::validation(self.room_id, "zone is empty"));
        }
        for spawn in &mut self.spawn_info {
            spawn.validate(self.room_id)?;
        }
        if !biomes.contains(&self.biome) {
            return Err(WorldError::validation(
                self.room_id,
                format!("unknown biome {:?}", self.biome),
            ));
        }
        if self
            .zone_config
            .as_ref()
            .is_some_and(|cfg| cfg.room_id != self.room_id)
        {
            debug!("Room {} dropping zone config that names another room", self.room_id);
            self.zone_config = None;
        }
        Ok(())
    }

    // ---- floor contents ----

    pub fn add_item(&mut self, item: Item, stash: bool) {
        if stash {
            self.stash.push(item);
        } else {
            self.items.push(item);
        }
    }

    pub fn remove_item(&mut self, item: &Item, stash: bool) -> bool {
        let list = if stash { &mut self.stash } else { &mut self.items };
        match list.iter().position(|i| i == item) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Fuzzy floor lookup returning `(close, exact)`. `!<id>` matches by item id.
    pub fn floor_matches(&self, name: &str, stash: bool) -> (Option<&Item>, Option<&Item>) {
        let list = if stash { &self.stash } else { &self.items };
        if let Some(id) = name.strip_prefix('!').and_then(|s| s.parse::<ItemId>().ok()) {
            let hit = list.iter().find(|i| i.item_id == id);
            return (hit, hit);
        }
        let names: Vec<&str> = list.iter().map(|i| i.name.as_str()).collect();
        let (close, exact) = find_match_in(name, &names);
        (close.map(|i| &list[i]), exact.map(|i| &list[i]))
    }

    pub fn find_on_floor(&self, name: &str, stash: bool) -> Option<&Item> {
        let (close, exact) = self.floor_matches(name, stash);
        exact.or(close)
    }

    /// Anywhere in the room: floor, stash or a container.
    pub fn is_item_present(&self, item_id: ItemId) -> bool {
        self.items.iter().any(|i| i.item_id == item_id)
            || self.stash.iter().any(|i| i.item_id == item_id)
            || self.containers.values().any(|c| c.contains_item_id(item_id))
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    // ---- containers ----

    pub fn find_container_by_name(&self, name: &str) -> Option<String> {
        let names: Vec<&String> = self.containers.keys().collect();
        let (close, exact) = find_match_in(name, &names);
        exact.or(close).map(|idx| names[idx].clone())
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.get(name)
    }

    pub fn container_mut(&mut self, name: &str) -> Option<&mut Container> {
        self.containers.get_mut(name)
    }

    /// Add a container, suffixing the name with a number if it is taken. Returns the name used.
    pub fn add_container(&mut self, name: &str, container: Container) -> String {
        let mut actual = name.to_string();
        let mut n = 2;
        while self.containers.contains_key(&actual) {
            actual = format!("{name} {n}");
            n += 1;
        }
        self.containers.insert(actual.clone(), container);
        actual
    }

    pub fn remove_container(&mut self, name: &str) -> Option<Container> {
        self.containers.remove(name)
    }

    // ---- exits ----

    pub fn set_exit(&mut self, name: impl Into<String>, exit: RoomExit) {
        self.exits.insert(name.into(), exit);
    }

    pub fn remove_exit(&mut self, name: &str) -> Option<RoomExit> {
        self.exits.remove(name)
    }

    /// Resolve a typed exit name to `(display name, target)`, covering temporary exits.
    pub fn find_exit_by_name(&self, search: &str) -> Option<(String, RoomId)> {
        let names: Vec<&String> = self.exits.keys().chain(self.exits_temp.keys()).collect();
        let (close, exact) = find_match_in(search, &names);
        let close = names[close?].as_str();

        let chosen = match exact {
            Some(idx) => names[idx].as_str(),
            None => {
                if EXACT_ONLY_EXITS.contains(&close) {
                    return None;
                }
                let search = search.trim().to_lowercase();
                let lowered = close.to_lowercase();
                let portal_hit = lowered.contains("portal") && "portal".starts_with(search.as_str());
                if lowered.starts_with(&search) || portal_hit {
                    close
                } else {
                    return None;
                }
            }
        };

        if let Some(exit) = self.exits.get(chosen) {
            return Some((chosen.to_string(), exit.room_id));
        }
        self.exits_temp
            .get(chosen)
            .map(|t| (t.title.clone(), t.room_id))
    }

    /// Permanent exits plus those granted by live mutators.
    pub fn exits_with_mutators(&self, catalog: &MutatorCatalog) -> BTreeMap<String, RoomExit> {
        let mut all = self.exits.clone();
        for id in self.mutators.active_ids() {
            if let Some(spec) = catalog.get(id) {
                for (name, exit) in &spec.exits {
                    all.entry(name.clone()).or_insert_with(|| exit.clone());
                }
            }
        }
        all
    }

    /// Every room one step away, temporary exits included.
    pub fn exit_targets(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self
            .exits
            .values()
            .map(|e| e.room_id)
            .chain(self.exits_temp.values().map(|t| t.room_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn add_temporary_exit(&mut self, name: &str, mut exit: TemporaryExit) -> bool {
        if self.exits_temp.contains_key(name) || self.exits.contains_key(name) {
            return false;
        }
        if exit.title.is_empty() {
            exit.title = name.to_string();
        }
        self.exits_temp.insert(name.to_string(), exit);
        true
    }

    pub fn remove_temporary_exit(&mut self, name: &str) -> Option<TemporaryExit> {
        self.exits_temp.remove(name)
    }

    pub fn find_temporary_exit_by_user_id(&self, user_id: UserId) -> Option<(&str, &TemporaryExit)> {
        self.exits_temp
            .iter()
            .find(|(_, t)| t.user_id == Some(user_id))
            .map(|(name, t)| (name.as_str(), t))
    }

    /// Remove and return temporary exits that expired before `now`.
    pub fn prune_temporary_exits(&mut self, now: DateTime<Utc>) -> Vec<(String, TemporaryExit)> {
        let expired: Vec<String> = self
            .exits_temp
            .iter()
            .filter(|(_, t)| t.expires < now)
            .map(|(name, _)| name.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|name| self.exits_temp.remove(&name).map(|t| (name, t)))
            .collect()
    }

    // ---- signs ----

    /// Post a sign. Replaces the existing sign for the same audience and returns true in that case.
    pub fn add_sign(&mut self, text: impl Into<String>, visible_user_id: Option<UserId>, days: i64) -> bool {
        let sign = Sign {
            visible_user_id,
            display_text: text.into(),
            expires: Utc::now() + Duration::days(days),
        };
        if let Some(existing) = self
            .signs
            .iter_mut()
            .find(|s| s.visible_user_id == visible_user_id)
        {
            *existing = sign;
            return true;
        }
        self.signs.push(sign);
        false
    }

    pub fn visible_signs(&self, user_id: Option<UserId>) -> Vec<&Sign> {
        self.signs
            .iter()
            .filter(|s| s.visible_user_id.is_none() || s.visible_user_id == user_id)
            .collect()
    }

    pub fn prune_signs(&mut self, now: DateTime<Utc>) -> Vec<Sign> {
        let (expired, kept): (Vec<Sign>, Vec<Sign>) =
            std::mem::take(&mut self.signs).into_iter().partition(|s| s.expires < now);
        self.signs = kept;
        expired
    }

    // ---- occupants ----

    pub fn add_player(&mut self, user_id: UserId) {
        if !self.players.contains(&user_id) {
            self.players.push(user_id);
        }
    }

    pub fn remove_player(&mut self, user_id: UserId) -> bool {
        let before = self.players.len();
        self.players.retain(|id| *id != user_id);
        before != self.players.len()
    }

    pub fn players(&self) -> &[UserId] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn add_mob(&mut self, instance_id: MobInstanceId) {
        if !self.mobs.contains(&instance_id) {
            self.mobs.push(instance_id);
        }
    }

    pub fn remove_mob(&mut self, instance_id: MobInstanceId) -> bool {
        let before = self.mobs.len();
        self.mobs.retain(|id| *id != instance_id);
        before != self.mobs.len()
    }

    pub fn mobs(&self) -> &[MobInstanceId] {
        &self.mobs
    }

    /// Players matching any of the flags. No flags returns everyone.
    pub fn get_players(&self, filter: FindFlags, users: &dyn UserDirectory) -> Vec<UserId> {
        if filter.is_empty() {
            return self.players.clone();
        }
        self.players
            .iter()
            .copied()
            .filter(|id| {
                users
                    .get_by_user_id(*id)
                    .is_some_and(|u| actor_matches(u, filter, false))
            })
            .collect()
    }

    /// Mobs matching any of the flags. No flags returns everyone.
    pub fn get_mobs(&self, filter: FindFlags, mobs: &dyn MobFactory) -> Vec<MobInstanceId> {
        if filter.is_empty() {
            return self.mobs.clone();
        }
        self.mobs
            .iter()
            .copied()
            .filter(|id| {
                let Some(mob) = mobs.get_instance(*id) else {
                    return false;
                };
                if filter.contains(FindFlags::NATIVE) {
                    if mob.home_room_id() == self.room_id {
                        return true;
                    }
                    if filter == FindFlags::NATIVE {
                        return false;
                    }
                }
                if filter.contains(FindFlags::HOSTILE) && mob.is_hostile() {
                    return true;
                }
                actor_matches(mob, filter, mob.is_hostile())
            })
            .collect()
    }

    pub fn send_text(&self, bus: &mut dyn EventBus, text: &str, exclude_user_ids: &[UserId]) {
        if self.players.iter().all(|p| exclude_user_ids.contains(p)) {
            return;
        }
        bus.publish(WorldMessage::Room {
            room_id: self.room_id,
            text: text.to_string(),
            exclude_user_ids: exclude_user_ids.to_vec(),
        });
    }

    // ---- visitors ----

    pub fn mark_visited(&mut self, id: u32, kind: VisitorType, clock: &GameClock, subtract_turns: u64) {
        let expires = (clock.turn_count() + clock.visitor_window_turns()).saturating_sub(subtract_turns);
        self.visitors.entry(kind).or_default().insert(id, expires);
        self.last_visited = clock.round_count();
    }

    pub fn has_visited(&self, id: u32, kind: VisitorType) -> bool {
        self.visitors
            .get(&kind)
            .is_some_and(|ledger| ledger.contains_key(&id))
    }

    /// Recent visitors with the fraction of their recency window still left.
    pub fn visitors(&self, kind: VisitorType, clock: &GameClock) -> Vec<(u32, f64)> {
        let window = clock.visitor_window_turns().max(1) as f64;
        let now = clock.turn_count();
        let mut out: Vec<(u32, f64)> = self
            .visitors
            .get(&kind)
            .map(|ledger| {
                ledger
                    .iter()
                    .map(|(id, expires)| (*id, (expires.saturating_sub(now) as f64 / window).min(1.0)))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Re-stamp present occupants, then drop expired entries. Returns how many were dropped.
    /// Re-stamping does not count as a visit for unloading purposes.
    pub fn prune_visitors(&mut self, clock: &GameClock) -> usize {
        let now = clock.turn_count();
        let fresh = now + clock.visitor_window_turns();
        if !self.players.is_empty() {
            let ledger = self.visitors.entry(VisitorType::User).or_default();
            for user_id in &self.players {
                ledger.insert(*user_id, fresh);
            }
        }
        if !self.mobs.is_empty() {
            let ledger = self.visitors.entry(VisitorType::Mob).or_default();
            for instance_id in &self.mobs {
                ledger.insert(*instance_id, fresh);
            }
        }

        let mut pruned = 0;
        for ledger in self.visitors.values_mut() {
            let before = ledger.len();
            ledger.retain(|_, expires| *expires >= now);
            pruned += before - ledger.len();
        }
        self.visitors.retain(|_, ledger| !ledger.is_empty());
        pruned
    }

    pub fn last_visited(&self) -> u64 {
        self.last_visited
    }

    pub fn touch(&mut self, round: u64) {
        self.last_visited = round;
    }

    // ---- area effects ----

    /// Start an effect unless one of the same kind is burning or cooling down.
    pub fn add_effect(&mut self, effect: AreaEffect) -> bool {
        if let Some(existing) = self.effects.get(&effect.effect) {
            if !existing.is_expired(effect.started_round) {
                return false;
            }
        }
        self.effects.insert(effect.effect, effect);
        true
    }

    pub fn has_effect(&self, kind: AreaEffectType, now: u64) -> bool {
        self.effects.get(&kind).is_some_and(|e| e.is_active(now))
    }

    pub fn is_burning(&self, now: u64) -> bool {
        self.has_effect(AreaEffectType::Wildfire, now)
    }

    /// True exactly once per fire: the first time it is checked after the
    /// flames have died down.
    pub fn finish_wildfire(&mut self, now: u64) -> bool {
        match self.effects.get_mut(&AreaEffectType::Wildfire) {
            Some(fire) if !fire.is_active(now) && !fire.spread => {
                fire.spread = true;
                true
            }
            _ => false,
        }
    }

    pub fn remove_expired_effects(&mut self, now: u64) -> usize {
        let before = self.effects.len();
        self.effects.retain(|_, e| !e.is_expired(now));
        before - self.effects.len()
    }

    // ---- scratch data ----

    pub fn set_long_term_data(&mut self, key: &str, value: Option<ScratchValue>) {
        match value {
            Some(v) => {
                self.long_term_data.insert(key.to_string(), v);
            }
            None => {
                self.long_term_data.remove(key);
            }
        }
    }

    pub fn get_long_term_data(&self, key: &str) -> Option<&ScratchValue> {
        self.long_term_data.get(key)
    }

    pub fn set_temp_data(&mut self, key: &str, value: Option<ScratchValue>) {
        match value {
            Some(v) => {
                self.temp_data.insert(key.to_string(), v);
            }
            None => {
                self.temp_data.remove(key);
            }
        }
    }

    pub fn get_temp_data(&self, key: &str) -> Option<&ScratchValue> {
        self.temp_data.get(key)
    }

    // ---- presentation ----

    fn active_specs<'a>(&self, catalog: &'a MutatorCatalog, zone_active: &[String]) -> Vec<&'a MutatorSpec> {
        self.mutators
            .active_ids()
            .into_iter()
            .map(str::to_string)
            .chain(zone_active.iter().cloned())
            .filter_map(|id| catalog.get(&id))
            .collect()
    }

    /// Title after mutator text changes. Room mutators apply before zone mutators.
    pub fn display_title(&self, catalog: &MutatorCatalog, zone_active: &[String]) -> String {
        self.active_specs(catalog, zone_active)
            .into_iter()
            .filter_map(|spec| spec.name_modifier.as_ref())
            .fold(self.title.clone(), |text, m| m.apply(&text))
    }

    pub fn display_description(&self, catalog: &MutatorCatalog, zone_active: &[String]) -> String {
        self.active_specs(catalog, zone_active)
            .into_iter()
            .filter_map(|spec| spec.description_modifier.as_ref())
            .fold(self.description.to_string(), |text, m| m.apply(&text))
    }

    pub fn mutator_alerts(&self, catalog: &MutatorCatalog, zone_active: &[String]) -> Vec<String> {
        self.active_specs(catalog, zone_active)
            .into_iter()
            .filter_map(|spec| spec.alert_modifier.as_ref())
            .map(|m| m.apply(""))
            .collect()
    }

    pub fn is_dark(&self, biomes: &BiomeCatalog) -> bool {
        biomes.get(&self.biome).is_some_and(|b| b.is_dark())
    }

    /// Map symbol and legend: room overrides first, then the biome, then defaults.
    pub fn map_symbol_and_legend(&self, biomes: &BiomeCatalog) -> (char, String) {
        let biome = biomes.get(&self.biome);
        let symbol = match self.map_symbol.as_str() {
            "" => biome.map(|b| b.symbol).unwrap_or(DEFAULT_MAP_SYMBOL),
            "*" => DEFAULT_MAP_SYMBOL,
            s => s.chars().next().unwrap_or(DEFAULT_MAP_SYMBOL),
        };
        let legend = if !self.map_legend.is_empty() {
            self.map_legend.clone()
        } else {
            biome
                .map(|b| b.name.clone())
                .unwrap_or_else(|| DEFAULT_MAP_LEGEND.to_string())
        };
        (symbol, legend)
    }
}

/// Shared player/mob filter logic; any matching flag selects the actor.
fn actor_matches<A: Actor + ?Sized>(actor: &A, filter: FindFlags, hostile: bool) -> bool {
    let aggro = actor.aggro();
    match aggro {
        Some(AggroTarget::User(_)) if filter.contains(FindFlags::FIGHTING_PLAYER) => return true,
        Some(AggroTarget::Mob(_)) if filter.contains(FindFlags::FIGHTING_MOB) => return true,
        _ => {}
    }
    if filter.contains(FindFlags::HAS_LIGHT) && actor.emits_light() {
        return true;
    }
    let charmed = actor.is_charmed();
    if filter.contains(FindFlags::CHARMED) && charmed {
        return true;
    }
    if filter.contains(FindFlags::NEUTRAL) && !charmed && aggro.is_none() && !hostile {
        return true;
    }
    if filter.contains(FindFlags::MERCHANT) && actor.has_shop() {
        return true;
    }
    if filter.contains(FindFlags::DOWNED) && actor.health() < 1 {
        return true;
    }
    if filter.contains(FindFlags::BUFFED) && actor.buff_count() > 0 {
        return true;
    }
    filter.contains(FindFlags::HAS_PET) && actor.has_pet()
}
