//! Shared fixtures for integration tests: a world rooted in a temp dir and
//! in-memory stand-ins for the mob, user, item and message systems.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mudworld::config::{Config, WorldConfig};
use mudworld::world::biomes::BiomeCatalog;
use mudworld::world::collaborators::{
    Actor, EventBus, ItemCatalog, Mob, MobFactory, User, UserDirectory,
};
use mudworld::world::mutators::MutatorCatalog;
use mudworld::world::types::{
    BuffId, Item, ItemId, MobId, MobInstanceId, RoomId, SpawnOverrides, UserId,
};
use mudworld::world::{RoomStore, Services, WorldMessage, WorldState};
use tempfile::TempDir;

/// Config rooted in `dir` with unloading allowed down to zero resident rooms.
pub fn test_config(dir: &TempDir) -> Config {
    let mut world = WorldConfig::with_data_dir(dir.path().to_string_lossy().to_string());
    world.min_resident_rooms = 0;
    Config {
        world,
        ..Config::default()
    }
}

pub fn open_store(dir: &TempDir) -> RoomStore {
    RoomStore::open(&test_config(dir).world, BiomeCatalog::builtin()).expect("open store")
}

pub fn open_world(config: Config, mutators: MutatorCatalog, services: Services) -> WorldState {
    WorldState::with_catalogs(config, BiomeCatalog::builtin(), mutators, services).expect("open world")
}

#[derive(Debug, Default)]
pub struct FakeItems;

impl ItemCatalog for FakeItems {
    fn new_item(&self, item_id: ItemId) -> Option<Item> {
        if item_id >= 900 {
            return None;
        }
        Some(Item::new(item_id, format!("thing {item_id}")))
    }
}

#[derive(Debug, Clone)]
pub struct FakeMob {
    pub instance_id: MobInstanceId,
    pub mob_id: MobId,
    pub name: String,
    pub home: RoomId,
    pub room: RoomId,
    pub level: Option<u32>,
    pub hostile: bool,
    pub buffs: Vec<BuffId>,
    pub boredom_resets: u32,
    pub carried: Vec<ItemId>,
}

impl Actor for FakeMob {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_buff(&self, buff_id: BuffId) -> bool {
        self.buffs.contains(&buff_id)
    }

    fn add_buff(&mut self, buff_id: BuffId) {
        self.buffs.push(buff_id);
    }

    fn buff_count(&self) -> usize {
        self.buffs.len()
    }

    fn health(&self) -> i32 {
        10
    }

    fn carries_item(&self, item_id: ItemId) -> bool {
        self.carried.contains(&item_id)
    }
}

impl Mob for FakeMob {
    fn instance_id(&self) -> MobInstanceId {
        self.instance_id
    }

    fn mob_id(&self) -> MobId {
        self.mob_id
    }

    fn home_room_id(&self) -> RoomId {
        self.home
    }

    fn room_id(&self) -> RoomId {
        self.room
    }

    fn is_hostile(&self) -> bool {
        self.hostile
    }

    fn apply_spawn_overrides(&mut self, overrides: &SpawnOverrides) {
        if let Some(name) = &overrides.name {
            self.name = name.clone();
        }
        self.hostile |= overrides.force_hostile;
        self.buffs.extend(&overrides.buff_ids);
    }

    fn place(&mut self, room_id: RoomId, _zone: &str) {
        self.room = room_id;
    }

    fn reset_boredom(&mut self) {
        self.boredom_resets += 1;
    }
}

/// Creates any mob id below 900.
#[derive(Debug, Default)]
pub struct FakeMobs {
    next_instance: MobInstanceId,
    pub instances: HashMap<MobInstanceId, FakeMob>,
}

impl MobFactory for FakeMobs {
    fn new_mob_by_id(
        &mut self,
        mob_id: MobId,
        home_room_id: RoomId,
        level: Option<u32>,
    ) -> Option<MobInstanceId> {
        if mob_id >= 900 {
            return None;
        }
        self.next_instance += 1;
        let instance_id = self.next_instance;
        self.instances.insert(
            instance_id,
            FakeMob {
                instance_id,
                mob_id,
                name: format!("mob {mob_id}"),
                home: home_room_id,
                room: home_room_id,
                level,
                hostile: false,
                buffs: Vec::new(),
                boredom_resets: 0,
                carried: Vec::new(),
            },
        );
        Some(instance_id)
    }

    fn get_instance(&self, instance_id: MobInstanceId) -> Option<&dyn Mob> {
        self.instances.get(&instance_id).map(|m| m as &dyn Mob)
    }

    fn get_instance_mut(&mut self, instance_id: MobInstanceId) -> Option<&mut dyn Mob> {
        self.instances
            .get_mut(&instance_id)
            .map(|m| m as &mut dyn Mob)
    }

    fn destroy_instance(&mut self, instance_id: MobInstanceId) {
        self.instances.remove(&instance_id);
    }
}

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub user_id: UserId,
    pub name: String,
    pub room: RoomId,
    pub buffs: Vec<BuffId>,
    pub carried: Vec<ItemId>,
}

impl FakeUser {
    pub fn new(user_id: UserId, room: RoomId) -> Self {
        Self {
            user_id,
            name: format!("user{user_id}"),
            room,
            buffs: Vec::new(),
            carried: Vec::new(),
        }
    }
}

impl Actor for FakeUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_buff(&self, buff_id: BuffId) -> bool {
        self.buffs.contains(&buff_id)
    }

    fn add_buff(&mut self, buff_id: BuffId) {
        self.buffs.push(buff_id);
    }

    fn buff_count(&self) -> usize {
        self.buffs.len()
    }

    fn health(&self) -> i32 {
        20
    }

    fn carries_item(&self, item_id: ItemId) -> bool {
        self.carried.contains(&item_id)
    }
}

impl User for FakeUser {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn room_id(&self) -> RoomId {
        self.room
    }

    fn place(&mut self, room_id: RoomId, _zone: &str) {
        self.room = room_id;
    }
}

#[derive(Debug, Default)]
pub struct FakeUsers {
    pub users: HashMap<UserId, FakeUser>,
}

impl FakeUsers {
    pub fn with(mut self, user: FakeUser) -> Self {
        self.users.insert(user.user_id, user);
        self
    }
}

impl UserDirectory for FakeUsers {
    fn get_by_user_id(&self, user_id: UserId) -> Option<&dyn User> {
        self.users.get(&user_id).map(|u| u as &dyn User)
    }

    fn get_by_user_id_mut(&mut self, user_id: UserId) -> Option<&mut dyn User> {
        self.users.get_mut(&user_id).map(|u| u as &mut dyn User)
    }
}

/// Keeps every published message; clone the handle before boxing it.
#[derive(Debug, Clone, Default)]
pub struct RecordingBus {
    pub messages: Arc<Mutex<Vec<WorldMessage>>>,
}

impl RecordingBus {
    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("bus lock")
            .iter()
            .map(|m| match m {
                WorldMessage::Room { text, .. } | WorldMessage::User { text, .. } => text.clone(),
            })
            .collect()
    }
}

impl EventBus for RecordingBus {
    fn publish(&mut self, message: WorldMessage) {
        self.messages.lock().expect("bus lock").push(message);
    }
}

/// Fakes for every collaborator plus a handle on the recorded messages.
pub fn fake_services(users: FakeUsers) -> (Services, RecordingBus) {
    let bus = RecordingBus::default();
    let services = Services::new(
        Box::new(FakeItems),
        Box::new(FakeMobs::default()),
        Box::new(users),
        Box::new(bus.clone()),
    );
    (services, bus)
}
