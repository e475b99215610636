//! Process-wide world counters.
//! Cheap atomics bumped by the store and the lifecycle scheduler; read by the CLI.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

static ROOMS_LOADED: AtomicU64 = AtomicU64::new(0);
static ROOMS_SAVED: AtomicU64 = AtomicU64::new(0);
static ROOMS_EVICTED: AtomicU64 = AtomicU64::new(0);
static LOAD_FAILURES: AtomicU64 = AtomicU64::new(0);
static ROUNDS_TICKED: AtomicU64 = AtomicU64::new(0);

static ZONE_SPAWNS: OnceLock<Mutex<HashMap<String, ZoneSpawnCounter>>> = OnceLock::new();

pub fn inc_rooms_loaded() {
    ROOMS_LOADED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_rooms_saved() {
    ROOMS_SAVED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_rooms_evicted() {
    ROOMS_EVICTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_load_failures() {
    LOAD_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_rounds_ticked() {
    ROUNDS_TICKED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZoneSpawnCounter {
    pub mobs: u64,
    pub items: u64,
    pub failures: u64,
}

fn zone_spawns() -> MutexGuard<'static, HashMap<String, ZoneSpawnCounter>> {
    ZONE_SPAWNS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn record_mob_spawn(zone: &str) {
    let mut guard = zone_spawns();
    let counter = guard.entry(zone.to_string()).or_default();
    counter.mobs = counter.mobs.saturating_add(1);
}

pub fn record_item_spawn(zone: &str) {
    let mut guard = zone_spawns();
    let counter = guard.entry(zone.to_string()).or_default();
    counter.items = counter.items.saturating_add(1);
}

pub fn record_spawn_failure(zone: &str) {
    let mut guard = zone_spawns();
    let counter = guard.entry(zone.to_string()).or_default();
    counter.failures = counter.failures.saturating_add(1);
}

pub fn zone_spawns_snapshot() -> HashMap<String, ZoneSpawnCounter> {
    zone_spawns().clone()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorldCounters {
    pub rooms_loaded: u64,
    pub rooms_saved: u64,
    pub rooms_evicted: u64,
    pub load_failures: u64,
    pub rounds_ticked: u64,
}

pub fn snapshot() -> WorldCounters {
    WorldCounters {
        rooms_loaded: ROOMS_LOADED.load(Ordering::Relaxed),
        rooms_saved: ROOMS_SAVED.load(Ordering::Relaxed),
        rooms_evicted: ROOMS_EVICTED.load(Ordering::Relaxed),
        load_failures: LOAD_FAILURES.load(Ordering::Relaxed),
        rounds_ticked: ROUNDS_TICKED.load(Ordering::Relaxed),
    }
}
