//! Narrow contracts for the systems the world core talks to but does not own:
//! item definitions, mob instances, connected users and message delivery.

use std::collections::HashMap;

use log::info;

use crate::logutil::preview;
use crate::world::types::{
    BuffId, Item, ItemId, MobId, MobInstanceId, RoomId, SpawnOverrides, UserId,
};

/// Who a character is currently fighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggroTarget {
    User(UserId),
    Mob(MobInstanceId),
}

/// State shared by players and mobs that room filters and buffs care about.
pub trait Actor {
    fn name(&self) -> &str;
    fn has_buff(&self, buff_id: BuffId) -> bool;
    fn add_buff(&mut self, buff_id: BuffId);
    fn buff_count(&self) -> usize;
    fn health(&self) -> i32;

    fn aggro(&self) -> Option<AggroTarget> {
        None
    }

    fn is_charmed(&self) -> bool {
        false
    }

    fn emits_light(&self) -> bool {
        false
    }

    fn has_pet(&self) -> bool {
        false
    }

    fn has_shop(&self) -> bool {
        false
    }

    fn carries_item(&self, _item_id: ItemId) -> bool {
        false
    }
}

pub trait Mob: Actor {
    fn instance_id(&self) -> MobInstanceId;
    fn mob_id(&self) -> MobId;
    fn home_room_id(&self) -> RoomId;
    /// Room the mob currently stands in.
    fn room_id(&self) -> RoomId;
    fn is_hostile(&self) -> bool;
    fn apply_spawn_overrides(&mut self, overrides: &SpawnOverrides);
    fn place(&mut self, room_id: RoomId, zone: &str);
    fn reset_boredom(&mut self);
}

pub trait User: Actor {
    fn user_id(&self) -> UserId;
    fn room_id(&self) -> RoomId;
    fn place(&mut self, room_id: RoomId, zone: &str);
}

pub trait ItemCatalog {
    fn new_item(&self, item_id: ItemId) -> Option<Item>;
}

pub trait MobFactory {
    /// Create a mob instance. `None` when the mob id is unknown or creation failed.
    fn new_mob_by_id(
        &mut self,
        mob_id: MobId,
        home_room_id: RoomId,
        level: Option<u32>,
    ) -> Option<MobInstanceId>;
    fn get_instance(&self, instance_id: MobInstanceId) -> Option<&dyn Mob>;
    fn get_instance_mut(&mut self, instance_id: MobInstanceId) -> Option<&mut dyn Mob>;
    fn destroy_instance(&mut self, instance_id: MobInstanceId);
}

pub trait UserDirectory {
    fn get_by_user_id(&self, user_id: UserId) -> Option<&dyn User>;
    fn get_by_user_id_mut(&mut self, user_id: UserId) -> Option<&mut dyn User>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldMessage {
    /// Broadcast to everyone in a room except the listed users.
    Room {
        room_id: RoomId,
        text: String,
        exclude_user_ids: Vec<UserId>,
    },
    User {
        user_id: UserId,
        text: String,
    },
}

pub trait EventBus {
    fn publish(&mut self, message: WorldMessage);
}

/// The collaborators a running world needs.
pub struct Services {
    pub items: Box<dyn ItemCatalog + Send + Sync>,
    pub mobs: Box<dyn MobFactory + Send + Sync>,
    pub users: Box<dyn UserDirectory + Send + Sync>,
    pub events: Box<dyn EventBus + Send + Sync>,
}

impl Services {
    pub fn new(
        items: Box<dyn ItemCatalog + Send + Sync>,
        mobs: Box<dyn MobFactory + Send + Sync>,
        users: Box<dyn UserDirectory + Send + Sync>,
        events: Box<dyn EventBus + Send + Sync>,
    ) -> Self {
        Self {
            items,
            mobs,
            users,
            events,
        }
    }

    /// Stand-alone services for running the world without a game server attached.
    pub fn detached() -> Self {
        Self::new(
            Box::new(detached::NamedItems::default()),
            Box::new(detached::NoMobs),
            Box::new(detached::NoUsers),
            Box::new(detached::LogBus),
        )
    }
}

pub mod detached {
    use super::*;

    /// Items are named after their id unless a name was registered.
    #[derive(Debug, Default)]
    pub struct NamedItems {
        names: HashMap<ItemId, String>,
    }

    impl NamedItems {
        pub fn with_name(mut self, item_id: ItemId, name: impl Into<String>) -> Self {
            self.names.insert(item_id, name.into());
            self
        }
    }

    impl ItemCatalog for NamedItems {
        fn new_item(&self, item_id: ItemId) -> Option<Item> {
            let name = self
                .names
                .get(&item_id)
                .cloned()
                .unwrap_or_else(|| format!("item #{item_id}"));
            Some(Item::new(item_id, name))
        }
    }

    /// Never produces mobs.
    #[derive(Debug, Default)]
    pub struct NoMobs;

    impl MobFactory for NoMobs {
        fn new_mob_by_id(&mut self, _: MobId, _: RoomId, _: Option<u32>) -> Option<MobInstanceId> {
            None
        }

        fn get_instance(&self, _: MobInstanceId) -> Option<&dyn Mob> {
            None
        }

        fn get_instance_mut(&mut self, _: MobInstanceId) -> Option<&mut dyn Mob> {
            None
        }

        fn destroy_instance(&mut self, _: MobInstanceId) {}
    }

    #[derive(Debug, Default)]
    pub struct NoUsers;

    impl UserDirectory for NoUsers {
        fn get_by_user_id(&self, _: UserId) -> Option<&dyn User> {
            None
        }

        fn get_by_user_id_mut(&mut self, _: UserId) -> Option<&mut dyn User> {
            None
        }
    }

    /// Writes every message to the log.
    #[derive(Debug, Default)]
    pub struct LogBus;

    impl EventBus for LogBus {
        fn publish(&mut self, message: WorldMessage) {
            match message {
                WorldMessage::Room { room_id, text, .. } => {
                    info!("[room {}] {}", room_id, preview(&text))
                }
                WorldMessage::User { user_id, text } => {
                    info!("[user {}] {}", user_id, preview(&text))
                }
            }
        }
    }
}
