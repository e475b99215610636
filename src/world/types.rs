use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::world::clock::GameClock;
use crate::world::errors::WorldError;
use crate::world::matching::find_match_in;

pub type RoomId = u32;
pub type MobId = u32;
pub type MobInstanceId = u32;
pub type ItemId = u32;
pub type UserId = u32;
pub type BuffId = u32;

/// Respawn period applied to spawn rules that do not name one.
pub const DEFAULT_RESPAWN_RATE: &str = "15 real minutes";

/// Buff given to anyone standing in a burning room.
pub const BURNING_BUFF_ID: BuffId = 22;
pub const WILDFIRE_BURN_ROUNDS: u64 = 15;
/// Rounds after a fire dies down before the room can burn again.
pub const WILDFIRE_COOLDOWN_ROUNDS: u64 = 150;

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// A concrete item lying in a room or container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub item_id: ItemId,
    pub name: String,
}

impl Item {
    pub fn new(item_id: ItemId, name: impl Into<String>) -> Self {
        Self {
            item_id,
            name: name.into(),
        }
    }
}

/// Lock shared by exits and containers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameLock {
    #[serde(default)]
    pub difficulty: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_round: Option<u64>,
    /// Period string after which an unlocked lock snaps shut again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relock_interval: Option<String>,
}

impl GameLock {
    pub fn new(difficulty: u8) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn is_unset(&self) -> bool {
        self.difficulty == 0 && self.unlocked_round.is_none() && self.relock_interval.is_none()
    }

    pub fn is_locked(&self, now: u64, clock: &GameClock, default_relock: &str) -> bool {
        if self.difficulty == 0 {
            return false;
        }
        let Some(unlocked) = self.unlocked_round else {
            return true;
        };
        let relock_at = self
            .relock_interval
            .as_deref()
            .and_then(|p| clock.add_period(unlocked, p).ok())
            .or_else(|| clock.add_period(unlocked, default_relock).ok())
            .unwrap_or(unlocked);
        now >= relock_at
    }

    pub fn set_unlocked(&mut self, now: u64) {
        self.unlocked_round = Some(now);
    }

    pub fn set_locked(&mut self) {
        self.unlocked_round = None;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomExit {
    pub room_id: RoomId,
    #[serde(default, skip_serializing_if = "is_false")]
    pub secret: bool,
    /// Rendering direction used instead of the exit name, e.g. `"north-x2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_direction: Option<String>,
    #[serde(default, skip_serializing_if = "GameLock::is_unset")]
    pub lock: GameLock,
}

impl RoomExit {
    pub fn to(room_id: RoomId) -> Self {
        Self {
            room_id,
            ..Self::default()
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_map_direction(mut self, direction: impl Into<String>) -> Self {
        self.map_direction = Some(direction.into());
        self
    }

    pub fn with_lock(mut self, difficulty: u8) -> Self {
        self.lock = GameLock::new(difficulty);
        self
    }
}

/// Player-created exit with a wall-clock lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemporaryExit {
    pub room_id: RoomId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Container {
    #[serde(default, skip_serializing_if = "GameLock::is_unset")]
    pub lock: GameLock,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub gold: u32,
    /// Temporary containers vanish once this round is reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub despawn_round: Option<u64>,
    /// Crafting recipes: target item id -> required input item ids.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recipes: BTreeMap<ItemId, Vec<ItemId>>,
}

impl Container {
    pub fn add_item(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn remove_item(&mut self, item: &Item) -> bool {
        match self.items.iter().position(|i| i == item) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Fuzzy lookup by item name. Exact matches win over partial ones.
    pub fn find_item(&self, name: &str) -> Option<&Item> {
        let names: Vec<&str> = self.items.iter().map(|i| i.name.as_str()).collect();
        let (close, exact) = find_match_in(name, &names);
        exact.or(close).map(|idx| &self.items[idx])
    }

    pub fn count(&self, item_id: ItemId) -> usize {
        self.items.iter().filter(|i| i.item_id == item_id).count()
    }

    pub fn contains_item_id(&self, item_id: ItemId) -> bool {
        self.items.iter().any(|i| i.item_id == item_id)
    }

    /// First recipe target whose full multiset of inputs is present.
    pub fn recipe_ready(&self) -> Option<ItemId> {
        if self.items.is_empty() {
            return None;
        }
        'recipes: for (target, inputs) in &self.recipes {
            if inputs.is_empty() {
                continue;
            }
            let mut needed: HashMap<ItemId, usize> = HashMap::new();
            for id in inputs {
                *needed.entry(*id).or_insert(0) += 1;
            }
            for item in &self.items {
                if let Some(n) = needed.get_mut(&item.item_id) {
                    *n = n.saturating_sub(1);
                }
            }
            for remaining in needed.values() {
                if *remaining > 0 {
                    continue 'recipes;
                }
            }
            return Some(*target);
        }
        None
    }
}

/// Rule describing a mob, or an item and/or gold, that should exist in a room.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpawnInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mob_id: Option<MobId>,
    /// Live mob instance spawned by this rule.
    #[serde(skip)]
    pub instance_id: Option<MobInstanceId>,
    /// Spawn into the named container instead of the floor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub gold: u32,
    /// Text broadcast to the room when the spawn happens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_hostile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wander: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub idle_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quest_flags: Vec<String>,
    /// Permanent buffs applied to the spawned mob.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buff_ids: Vec<BuffId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub level_mod: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub despawned_round: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respawn_rate: Option<String>,
}

fn is_zero_i32(n: &i32) -> bool {
    *n == 0
}

impl SpawnInfo {
    pub fn mob(mob_id: MobId) -> Self {
        Self {
            mob_id: Some(mob_id),
            ..Self::default()
        }
    }

    pub fn item(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn gold(amount: u32) -> Self {
        Self {
            gold: amount,
            ..Self::default()
        }
    }

    pub fn with_respawn_rate(mut self, rate: impl Into<String>) -> Self {
        self.respawn_rate = Some(rate.into());
        self
    }

    pub fn in_container(mut self, name: impl Into<String>) -> Self {
        self.container = Some(name.into());
        self
    }

    pub fn is_mob(&self) -> bool {
        self.mob_id.is_some()
    }

    pub fn respawn_rate(&self) -> &str {
        self.respawn_rate.as_deref().unwrap_or(DEFAULT_RESPAWN_RATE)
    }

    /// Enforce mob xor item/gold, fill the default respawn rate, check the period parses.
    pub fn validate(&mut self, room_id: RoomId) -> Result<(), WorldError> {
        if self.mob_id.is_some() && (self.item_id.is_some() || self.gold > 0) {
            return Err(WorldError::validation(
                room_id,
                format!(
                    "spawn for mob {:?} also names item {:?} / gold {}",
                    self.mob_id, self.item_id, self.gold
                ),
            ));
        }
        if self.mob_id.is_none() && self.item_id.is_none() && self.gold == 0 {
            return Err(WorldError::validation(room_id, "spawn names nothing to spawn"));
        }
        if self.respawn_rate.as_deref().map_or(true, |r| r.trim().is_empty()) {
            self.respawn_rate = Some(DEFAULT_RESPAWN_RATE.to_string());
        }
        crate::world::clock::Period::parse(self.respawn_rate())
            .map_err(|e| WorldError::validation(room_id, e.to_string()))?;
        Ok(())
    }

    pub fn overrides(&self) -> SpawnOverrides {
        SpawnOverrides {
            name: self.name.clone(),
            idle_commands: self.idle_commands.clone(),
            force_hostile: self.force_hostile,
            max_wander: self.max_wander,
            buff_ids: self.buff_ids.clone(),
            script_tag: self.script_tag.clone(),
            quest_flags: self.quest_flags.clone(),
        }
    }
}

/// Per-spawn adjustments handed to a freshly created mob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOverrides {
    pub name: Option<String>,
    pub idle_commands: Vec<String>,
    pub force_hostile: bool,
    pub max_wander: Option<i32>,
    pub buff_ids: Vec<BuffId>,
    pub script_tag: Option<String>,
    pub quest_flags: Vec<String>,
}

/// Text posted in a room, optionally visible to a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_user_id: Option<UserId>,
    pub display_text: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaEffectType {
    Wildfire,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaEffect {
    pub effect: AreaEffectType,
    pub started_round: u64,
    pub duration_rounds: u64,
    pub cooldown_rounds: u64,
    /// Set once the effect has reached past its room after burning out.
    pub spread: bool,
}

impl AreaEffect {
    pub fn wildfire(now: u64) -> Self {
        Self {
            effect: AreaEffectType::Wildfire,
            started_round: now,
            duration_rounds: WILDFIRE_BURN_ROUNDS,
            cooldown_rounds: WILDFIRE_COOLDOWN_ROUNDS,
            spread: false,
        }
    }

    pub fn is_active(&self, now: u64) -> bool {
        now < self.started_round.saturating_add(self.duration_rounds)
    }

    pub fn is_cooling_down(&self, now: u64) -> bool {
        !self.is_active(now)
            && now
                < self
                    .started_round
                    .saturating_add(self.duration_rounds)
                    .saturating_add(self.cooldown_rounds)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        !self.is_active(now) && !self.is_cooling_down(now)
    }
}

/// Script-settable room data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScratchValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Id(u32),
}

impl From<i64> for ScratchValue {
    fn from(v: i64) -> Self {
        ScratchValue::Int(v)
    }
}

impl From<bool> for ScratchValue {
    fn from(v: bool) -> Self {
        ScratchValue::Bool(v)
    }
}

impl From<&str> for ScratchValue {
    fn from(v: &str) -> Self {
        ScratchValue::Text(v.to_string())
    }
}

impl From<String> for ScratchValue {
    fn from(v: String) -> Self {
        ScratchValue::Text(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorType {
    User,
    Mob,
}

/// Bitmask filter for occupant queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FindFlags(u16);

impl FindFlags {
    pub const NONE: FindFlags = FindFlags(0);
    pub const CHARMED: FindFlags = FindFlags(1);
    pub const NEUTRAL: FindFlags = FindFlags(1 << 1);
    pub const FIGHTING_PLAYER: FindFlags = FindFlags(1 << 2);
    pub const FIGHTING_MOB: FindFlags = FindFlags(1 << 3);
    pub const HOSTILE: FindFlags = FindFlags(1 << 4);
    pub const MERCHANT: FindFlags = FindFlags(1 << 5);
    pub const DOWNED: FindFlags = FindFlags(1 << 6);
    pub const BUFFED: FindFlags = FindFlags(1 << 7);
    pub const HAS_LIGHT: FindFlags = FindFlags(1 << 8);
    pub const HAS_PET: FindFlags = FindFlags(1 << 9);
    pub const NATIVE: FindFlags = FindFlags(1 << 10);

    pub const FIGHTING: FindFlags = FindFlags(Self::FIGHTING_PLAYER.0 | Self::FIGHTING_MOB.0);
    pub const IDLE: FindFlags = FindFlags(Self::CHARMED.0 | Self::NEUTRAL.0);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if any bit of `other` is set.
    pub fn contains(self, other: FindFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for FindFlags {
    type Output = FindFlags;

    fn bitor(self, rhs: FindFlags) -> FindFlags {
        FindFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FindFlags {
    fn bitor_assign(&mut self, rhs: FindFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for FindFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#013b}", self.0)
    }
}
