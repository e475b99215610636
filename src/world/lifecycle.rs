//! Per-round room passes: spawn resolution, mutator upkeep and buffs,
//! maintenance (visitors, expiries, unloading) and player movement.

use chrono::Utc;
use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;

use crate::metrics;
use crate::world::clock::GameClock;
use crate::world::collaborators::{EventBus, Services, WorldMessage};
use crate::world::errors::WorldError;
use crate::world::mutators::MutatorCatalog;
use crate::world::room::Room;
use crate::world::state::WorldState;
use crate::world::store::RoomStore;
use crate::world::types::{
    AreaEffect, BuffId, Container, FindFlags, GameLock, Item, ItemId, RoomId, ScratchValue,
    SpawnInfo, UserId, VisitorType, BURNING_BUFF_ID,
};
use crate::world::zones::MobAutoScale;

/// What one maintenance pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub visitors_pruned: usize,
    pub expired_exits: usize,
    pub expired_signs: usize,
    pub despawned_containers: usize,
    pub descriptions_pruned: usize,
    pub evicted: usize,
    pub evictions_failed: usize,
    pub items_burned: usize,
    pub fires_spread: usize,
}

/// Buff ids granted by a set of live mutators.
#[derive(Debug, Default)]
struct MutatorBuffs {
    players: Vec<BuffId>,
    mobs: Vec<BuffId>,
    natives: Vec<BuffId>,
}

impl MutatorBuffs {
    fn collect(catalog: &MutatorCatalog, active: &[String]) -> Self {
        let mut buffs = Self::default();
        for spec in active.iter().filter_map(|id| catalog.get(id)) {
            buffs.players.extend(&spec.player_buff_ids);
            buffs.mobs.extend(&spec.mob_buff_ids);
            buffs.natives.extend(&spec.native_buff_ids);
        }
        buffs
    }

    fn is_empty(&self) -> bool {
        self.players.is_empty() && self.mobs.is_empty() && self.natives.is_empty()
    }
}

impl WorldState {
    /// Make a room ready to be looked at: mutators current, stale containers
    /// gone, spawns filled. Optionally repeats this once for empty neighbours.
    pub fn prepare_room(&mut self, room_id: RoomId, check_adjacent: bool) {
        let Some((room_id, zone)) = self
            .store
            .load_room(room_id)
            .map(|r| (r.room_id, r.zone.clone()))
        else {
            debug!("Prepare skipped, room {} not found", room_id);
            return;
        };
        let auto_scale = self
            .store
            .zone_config(&zone)
            .map(|cfg| cfg.mob_auto_scale)
            .unwrap_or_default();

        let now = self.clock.round_count();
        let Self {
            store,
            clock,
            mutators,
            services,
            ..
        } = self;
        let Some(room) = store.room_mut(room_id) else {
            return;
        };

        room.mutators.update(now, mutators, clock);
        expire_containers(room, now, services.events.as_mut());
        resolve_spawns(room, now, clock, auto_scale, services);

        if !check_adjacent {
            return;
        }
        let neighbours: Vec<RoomId> = room
            .exits
            .values()
            .map(|e| e.room_id)
            .filter(|id| *id != room_id)
            .collect();
        for neighbour in neighbours {
            let empty = self
                .store
                .load_room(neighbour)
                .is_some_and(|r| r.player_count() == 0);
            if empty {
                self.prepare_room(neighbour, false);
            }
        }
    }

    /// Once per round for every resident room.
    pub fn round_tick(&mut self) {
        let now = self.clock.round_count();
        let Self {
            store,
            clock,
            mutators,
            services,
            ..
        } = self;

        let mut zone_active: Vec<(String, Vec<String>)> = Vec::new();
        for (zone, root) in store.zones().zones_with_mutators() {
            let Some(root_room) = store.load_room(root) else {
                warn!("Zone {} root room {} is missing", zone, root);
                continue;
            };
            let Some(cfg) = root_room.zone_config.as_mut() else {
                continue;
            };
            cfg.mutators.update(now, mutators, clock);
            let still_has = !cfg.mutators.is_empty();
            let active: Vec<String> = cfg.mutators.active_ids().into_iter().map(str::to_string).collect();
            store.zones_mut().set_has_zone_mutators(&zone, still_has);
            zone_active.push((zone, active));
        }

        for room_id in store.resident_ids() {
            let Some(room) = store.room_mut(room_id) else {
                continue;
            };
            room.mutators.update(now, mutators, clock);

            let mut active: Vec<String> = room
                .mutators
                .active_ids()
                .into_iter()
                .map(str::to_string)
                .collect();
            if let Some((_, zone_ids)) = zone_active.iter().find(|(z, _)| *z == room.zone) {
                active.extend(zone_ids.iter().cloned());
            }
            let buffs = MutatorBuffs::collect(mutators, &active);
            if !buffs.is_empty() {
                grant_buffs(room, &buffs, services);
            }

            clear_vanished_spawns(room, now, services);

            if room.player_count() > 0 {
                for instance_id in room.mobs() {
                    if let Some(mob) = services.mobs.get_instance_mut(*instance_id) {
                        mob.reset_boredom();
                    }
                }
            }

            room.remove_expired_effects(now);
        }
    }

    /// Visitor pruning, expiries, wildfire upkeep and unloading of idle rooms.
    pub fn room_maintenance(&mut self) -> MaintenanceReport {
        let now = self.clock.round_count();
        let wall_now = Utc::now();
        let mut report = MaintenanceReport::default();
        let mut spread_to = Vec::new();
        let Self {
            store,
            clock,
            services,
            config,
            ..
        } = self;

        for room_id in store.resident_ids() {
            let Some(room) = store.room_mut(room_id) else {
                continue;
            };
            report.visitors_pruned += room.prune_visitors(clock);

            for (_, exit) in room.prune_temporary_exits(wall_now) {
                room.send_text(services.events.as_mut(), &format!("The {} vanishes.", exit.title), &[]);
                report.expired_exits += 1;
            }

            for sign in room.prune_signs(wall_now) {
                match sign.visible_user_id {
                    None => room.send_text(services.events.as_mut(), "A sign crumbles to dust.", &[]),
                    Some(user_id) if room.players().contains(&user_id) => {
                        services.events.publish(WorldMessage::User {
                            user_id,
                            text: "The rune you had enscribed here has faded away.".to_string(),
                        });
                    }
                    Some(_) => {}
                }
                report.expired_signs += 1;
            }

            report.despawned_containers += expire_containers(room, now, services.events.as_mut());

            if room.is_burning(now) {
                burn_occupants(room, services);
                report.items_burned += burn_floor_items(room, services.events.as_mut());
            } else if room.finish_wildfire(now) {
                room.send_text(services.events.as_mut(), "The burning finally subsides.", &[]);
                let mut rng = rand::thread_rng();
                for target in room.exit_targets() {
                    if rng.gen_range(0..100) < config.world.wildfire_spread_percent {
                        spread_to.push(target);
                    }
                }
            }
        }

        for room_id in spread_to {
            if ignite(store, services, room_id, now) {
                report.fires_spread += 1;
            }
        }

        let candidates = store.eviction_candidates(
            now,
            config.world.unload_idle_rounds,
            config.world.min_resident_rooms,
        );
        for room_id in candidates {
            if store.room(room_id).is_some_and(|r| r.is_burning(now)) {
                continue;
            }
            match store.evict(room_id, services.mobs.as_mut()) {
                Ok(true) => report.evicted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Could not unload room {}: {}", room_id, e);
                    report.evictions_failed += 1;
                }
            }
        }

        report.descriptions_pruned = store.prune_descriptions();
        if report.evicted > 0 {
            info!(
                "Maintenance at round {}: unloaded {} rooms, {} resident",
                now,
                report.evicted,
                store.resident_count()
            );
        }
        report
    }

    /// Move a user into a room. Returns false when the room cannot be found.
    pub fn move_player(&mut self, user_id: UserId, to_room: RoomId) -> Result<bool, WorldError> {
        let from_room = self
            .services
            .users
            .get_by_user_id(user_id)
            .map(|u| u.room_id())
            .ok_or_else(|| WorldError::NotFound(format!("user {user_id}")))?;

        let Some(target) = self.store.load_room(to_room) else {
            return Ok(false);
        };
        let target_id = target.room_id;
        let zone = target.zone.clone();
        if target.player_count() == 0 {
            self.prepare_room(target_id, true);
        }
        let zone_active = zone_active_mutators(&mut self.store, &zone);

        let Self {
            store,
            clock,
            mutators,
            services,
            ..
        } = self;

        if from_room != target_id {
            if let Some(old) = store.load_room(from_room) {
                old.mark_visited(user_id, VisitorType::User, clock, 1);
                old.remove_player(user_id);
            }
        }

        let Some(room) = store.room_mut(target_id) else {
            return Ok(false);
        };
        room.mark_visited(user_id, VisitorType::User, clock, 0);
        room.add_player(user_id);

        let mut active: Vec<String> = room
            .mutators
            .active_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        active.extend(zone_active);
        let buffs = MutatorBuffs::collect(mutators, &active);

        if let Some(user) = services.users.get_by_user_id_mut(user_id) {
            for buff_id in &buffs.players {
                if !user.has_buff(*buff_id) {
                    user.add_buff(*buff_id);
                }
            }
            user.place(target_id, &zone);
        }
        debug!("User {} moved {} -> {}", user_id, from_room, target_id);
        Ok(true)
    }

    /// Relay text into every resident neighbour that has an exit leading back here.
    pub fn send_text_to_exits(&mut self, room_id: RoomId, text: &str, exclude_user_ids: &[UserId]) {
        relay_to_exits(&self.store, self.services.events.as_mut(), room_id, text, exclude_user_ids);
    }

    /// Set a room on fire. Only biomes that burn catch, and a room that is
    /// burning or still cooling down from a fire is left alone.
    pub fn ignite_room(&mut self, room_id: RoomId) -> bool {
        let now = self.clock.round_count();
        let Self { store, services, .. } = self;
        ignite(store, services, room_id, now)
    }

    /// Spawn an item unless it is already here, someone here carries it, or
    /// it was spawned here less than `round_frequency` rounds ago.
    pub fn repeat_spawn_item(
        &mut self,
        room_id: RoomId,
        item_id: ItemId,
        round_frequency: u64,
        container: Option<&str>,
    ) -> bool {
        let now = self.clock.round_count();
        let Self { store, services, .. } = self;
        let Some(room) = store.load_room(room_id) else {
            return false;
        };

        let spawn_key = match container {
            Some(name) => format!("{name}-{item_id}"),
            None => item_id.to_string(),
        };
        if let Some(name) = container {
            match room.container(name) {
                Some(c) if c.contains_item_id(item_id) => return false,
                Some(_) => {}
                None => return false,
            }
        }
        if room.items.iter().chain(room.stash.iter()).any(|i| i.item_id == item_id) {
            return false;
        }
        if let Some(ScratchValue::Int(last)) = room.get_temp_data(&spawn_key) {
            if (*last as u64).saturating_add(round_frequency) > now {
                return false;
            }
        }
        if occupant_carries(room, item_id, services) {
            return false;
        }
        let Some(item) = services.items.new_item(item_id) else {
            warn!("Item catalog has no item {}", item_id);
            return false;
        };

        room.set_temp_data(&spawn_key, Some(ScratchValue::Int(now as i64)));
        match container.and_then(|name| room.container_mut(name)) {
            Some(c) => c.add_item(item),
            None => room.add_item(item, false),
        }
        metrics::record_item_spawn(&room.zone);
        true
    }

    /// Add a container that crumbles after `duration`. Returns its final name.
    pub fn spawn_temp_container(
        &mut self,
        room_id: RoomId,
        name: &str,
        duration: &str,
        lock_difficulty: u8,
        contents: Vec<Item>,
    ) -> Result<String, WorldError> {
        let despawn_round = self.clock.add_period(self.clock.round_count(), duration)?;
        let room = self
            .store
            .load_room(room_id)
            .ok_or_else(|| WorldError::NotFound(format!("room {room_id}")))?;
        let container = Container {
            lock: GameLock::new(lock_difficulty),
            items: contents,
            despawn_round: Some(despawn_round),
            ..Container::default()
        };
        Ok(room.add_container(name, container))
    }

    /// Attach a mutator to a room. False when it is unknown or already live.
    pub fn add_room_mutator(&mut self, room_id: RoomId, mutator_id: &str) -> bool {
        let now = self.clock.round_count();
        let Self {
            store,
            clock,
            mutators,
            ..
        } = self;
        store
            .load_room(room_id)
            .is_some_and(|room| room.mutators.add(mutator_id, mutators, now, clock))
    }

    /// Attach a mutator to every room of a zone through the zone root.
    pub fn add_zone_mutator(&mut self, zone: &str, mutator_id: &str) -> Result<bool, WorldError> {
        let now = self.clock.round_count();
        let root = self.store.zones().root(zone)?;
        let Self {
            store,
            clock,
            mutators,
            ..
        } = self;
        let room = store
            .load_room(root)
            .ok_or_else(|| WorldError::NotFound(format!("room {root}")))?;
        let Some(cfg) = room.zone_config.as_mut() else {
            return Err(WorldError::InvalidZone(format!("{zone} root has no zone config")));
        };
        let added = cfg.mutators.add(mutator_id, mutators, now, clock);
        if added {
            store.zones_mut().set_has_zone_mutators(zone, true);
        }
        Ok(added)
    }
}

fn zone_active_mutators(store: &mut RoomStore, zone: &str) -> Vec<String> {
    store
        .zone_config(zone)
        .map(|cfg| {
            cfg.mutators
                .active_ids()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn expire_containers(room: &mut Room, now: u64, bus: &mut dyn EventBus) -> usize {
    let expired: Vec<String> = room
        .containers
        .iter()
        .filter(|(_, c)| c.despawn_round.is_some_and(|r| r <= now))
        .map(|(name, _)| name.clone())
        .collect();
    for name in &expired {
        room.remove_container(name);
        room.send_text(bus, &format!("The {name} crumbles to dust."), &[]);
    }
    expired.len()
}

fn grant_buffs(room: &Room, buffs: &MutatorBuffs, services: &mut Services) {
    for user_id in room.players() {
        if let Some(user) = services.users.get_by_user_id_mut(*user_id) {
            for buff_id in &buffs.players {
                if !user.has_buff(*buff_id) {
                    user.add_buff(*buff_id);
                }
            }
        }
    }
    let natives = room.get_mobs(FindFlags::NATIVE, services.mobs.as_ref());
    for instance_id in room.mobs() {
        let native = natives.contains(instance_id);
        if let Some(mob) = services.mobs.get_instance_mut(*instance_id) {
            let extra: &[BuffId] = if native { &buffs.natives } else { &[] };
            for buff_id in buffs.mobs.iter().chain(extra) {
                if !mob.has_buff(*buff_id) {
                    mob.add_buff(*buff_id);
                }
            }
        }
    }
}

fn relay_to_exits(
    store: &RoomStore,
    events: &mut dyn EventBus,
    room_id: RoomId,
    text: &str,
    exclude_user_ids: &[UserId],
) {
    let Some(room) = store.room(room_id) else {
        return;
    };
    for target_id in room.exit_targets() {
        let Some(target) = store.room(target_id) else {
            continue;
        };
        for (exit_name, exit) in &target.exits {
            if exit.room_id == room_id {
                target.send_text(events, &format!("(From {exit_name}) {text}"), exclude_user_ids);
            }
        }
    }
}

fn ignite(store: &mut RoomStore, services: &mut Services, room_id: RoomId, now: u64) -> bool {
    let Some(biome) = store.load_room(room_id).map(|r| r.biome.clone()) else {
        return false;
    };
    if !store.biomes().get(&biome).is_some_and(|b| b.burns) {
        debug!("Room {} ({}) does not burn", room_id, biome);
        return false;
    }
    let Some(room) = store.room_mut(room_id) else {
        return false;
    };
    if !room.add_effect(AreaEffect::wildfire(now)) {
        return false;
    }
    info!("Wildfire started in room {} at round {}", room_id, now);
    room.send_text(services.events.as_mut(), "A wildfire burns through the area!", &[]);
    relay_to_exits(store, services.events.as_mut(), room_id, "You notice a wildfire start!", &[]);
    true
}

fn burn_occupants(room: &Room, services: &mut Services) {
    for user_id in room.players() {
        if let Some(user) = services.users.get_by_user_id_mut(*user_id) {
            if !user.has_buff(BURNING_BUFF_ID) {
                user.add_buff(BURNING_BUFF_ID);
            }
        }
    }
    for instance_id in room.mobs() {
        if let Some(mob) = services.mobs.get_instance_mut(*instance_id) {
            if !mob.has_buff(BURNING_BUFF_ID) {
                mob.add_buff(BURNING_BUFF_ID);
            }
        }
    }
}

fn burn_floor_items(room: &mut Room, events: &mut dyn EventBus) -> usize {
    let burned = std::mem::take(&mut room.items);
    for item in &burned {
        room.send_text(
            events,
            &format!("The {} that was laying on the ground is destroyed by flames.", item.name),
            &[],
        );
    }
    burned.len()
}

fn clear_vanished_spawns(room: &mut Room, now: u64, services: &Services) {
    let mut vanished = Vec::new();
    for spawn in room.spawn_info.iter_mut() {
        if let Some(instance_id) = spawn.instance_id {
            if services.mobs.get_instance(instance_id).is_none() {
                spawn.instance_id = None;
                spawn.despawned_round = Some(now);
                vanished.push(instance_id);
            }
        }
    }
    for instance_id in vanished {
        room.remove_mob(instance_id);
    }
}

fn occupant_carries(room: &Room, item_id: ItemId, services: &Services) -> bool {
    room.players().iter().any(|id| {
        services
            .users
            .get_by_user_id(*id)
            .is_some_and(|u| u.carries_item(item_id))
    }) || room.mobs().iter().any(|id| {
        services
            .mobs
            .get_instance(*id)
            .is_some_and(|m| m.carries_item(item_id))
    })
}

fn spawn_level(spawn: &SpawnInfo, auto_scale: MobAutoScale) -> Option<u32> {
    if let Some(level) = spawn.level.filter(|l| *l > 0) {
        return Some(level);
    }
    if !auto_scale.is_enabled() {
        return None;
    }
    let rolled = i64::from(auto_scale.roll(&mut rand::thread_rng())) + i64::from(spawn.level_mod);
    Some(rolled.max(1) as u32)
}

/// Walk the spawn rules, rebuilding the list and swapping it back in.
fn resolve_spawns(room: &mut Room, now: u64, clock: &GameClock, auto_scale: MobAutoScale, services: &mut Services) {
    let mut spawns = std::mem::take(&mut room.spawn_info);

    for spawn in spawns.iter_mut() {
        if let Some(instance_id) = spawn.instance_id {
            if services.mobs.get_instance(instance_id).is_none() {
                debug!("Room {} spawn instance {} is gone", room.room_id, instance_id);
                spawn.instance_id = None;
                spawn.despawned_round = Some(now);
                room.remove_mob(instance_id);
            }
            continue;
        }

        if let Some(despawned) = spawn.despawned_round {
            match clock.add_period(despawned, spawn.respawn_rate()) {
                Ok(ready) if now < ready => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!("Room {} spawn has a bad respawn rate: {}", room.room_id, e);
                    continue;
                }
            }
        }

        if let Some(mob_id) = spawn.mob_id {
            spawn_mob(room, spawn, mob_id, auto_scale, services);
            continue;
        }

        spawn_item_and_gold(room, spawn, now, services);
    }

    room.spawn_info = spawns;
}

fn spawn_mob(room: &mut Room, spawn: &mut SpawnInfo, mob_id: u32, auto_scale: MobAutoScale, services: &mut Services) {
    let level = spawn_level(spawn, auto_scale);
    let Some(instance_id) = services.mobs.new_mob_by_id(mob_id, room.room_id, level) else {
        warn!("Mob factory could not create mob {} for room {}", mob_id, room.room_id);
        metrics::record_spawn_failure(&room.zone);
        return;
    };
    if let Some(mob) = services.mobs.get_instance_mut(instance_id) {
        mob.apply_spawn_overrides(&spawn.overrides());
        mob.place(room.room_id, &room.zone);
    }
    room.add_mob(instance_id);
    spawn.instance_id = Some(instance_id);
    spawn.despawned_round = None;
    metrics::record_mob_spawn(&room.zone);
    debug!("Room {} spawned mob {} as instance {}", room.room_id, mob_id, instance_id);

    if let Some(message) = &spawn.message {
        room.send_text(services.events.as_mut(), message, &[]);
    }
}

fn spawn_item_and_gold(room: &mut Room, spawn: &mut SpawnInfo, now: u64, services: &mut Services) {
    let carried = spawn
        .item_id
        .is_some_and(|id| occupant_carries(room, id, services));

    match spawn.container.as_deref() {
        None => {
            if let Some(item_id) = spawn.item_id {
                let on_floor = room.find_on_floor(&format!("!{item_id}"), false).is_some();
                if !on_floor && !carried {
                    match services.items.new_item(item_id) {
                        Some(item) => {
                            room.add_item(item, false);
                            metrics::record_item_spawn(&room.zone);
                        }
                        None => {
                            warn!("Item catalog has no item {} for room {}", item_id, room.room_id);
                            metrics::record_spawn_failure(&room.zone);
                        }
                    }
                }
            }
            if room.gold < spawn.gold {
                room.gold = spawn.gold;
            }
            spawn.despawned_round = Some(now);
        }
        Some(wanted) => {
            let Some(name) = room.find_container_by_name(wanted) else {
                warn!("Room {} spawn names missing container {:?}", room.room_id, wanted);
                return;
            };
            let zone = room.zone.clone();
            let Some(container) = room.container_mut(&name) else {
                return;
            };
            if let Some(item_id) = spawn.item_id {
                if !container.contains_item_id(item_id) && !carried {
                    match services.items.new_item(item_id) {
                        Some(item) => {
                            container.add_item(item);
                            metrics::record_item_spawn(&zone);
                        }
                        None => metrics::record_spawn_failure(&zone),
                    }
                }
            }
            if container.gold < spawn.gold {
                container.gold = spawn.gold;
            }
            spawn.despawned_round = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_level_wins_over_auto_scale() {
        let mut spawn = SpawnInfo::mob(4);
        spawn.level = Some(7);
        let scale = MobAutoScale { minimum: 2, maximum: 3 };
        assert_eq!(spawn_level(&spawn, scale), Some(7));
    }

    #[test]
    fn auto_scale_applies_level_mod_with_floor() {
        let mut spawn = SpawnInfo::mob(4);
        spawn.level_mod = -10;
        let scale = MobAutoScale { minimum: 2, maximum: 3 };
        assert_eq!(spawn_level(&spawn, scale), Some(1));

        spawn.level_mod = 1;
        let level = spawn_level(&spawn, scale).expect("level");
        assert!((3..=4).contains(&level));

        assert_eq!(spawn_level(&spawn, MobAutoScale::default()), None);
    }

    #[test]
    fn buffs_collect_from_active_specs() {
        let mut catalog = MutatorCatalog::new();
        let mut fog = crate::world::mutators::MutatorSpec::new("fog");
        fog.player_buff_ids = vec![3];
        fog.native_buff_ids = vec![9];
        catalog.insert(fog).expect("insert");

        let buffs = MutatorBuffs::collect(&catalog, &["fog".to_string(), "missing".to_string()]);
        assert_eq!(buffs.players, vec![3]);
        assert!(buffs.mobs.is_empty());
        assert_eq!(buffs.natives, vec![9]);
    }
}
