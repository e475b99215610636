//! # World simulation core
//!
//! Rooms, zones and the round-driven passes that keep them alive.
//!
//! - [`store`] resolves room ids to live rooms, loading lazily and unloading idle ones
//! - [`lifecycle`] runs spawns, mutators, buffs, visitor decay and expiries each round
//! - [`graph`] and [`map`] crawl the room graph and draw it
//! - [`state`] ties it together behind one lock
//!
//! Everything the core does not own (items, mobs, users, message delivery) is
//! reached through the traits in [`collaborators`].

pub mod biomes;
pub mod clock;
pub mod collaborators;
pub mod errors;
pub mod graph;
pub mod lifecycle;
pub mod map;
pub mod matching;
pub mod mutators;
pub mod room;
pub mod seed;
pub mod state;
pub mod store;
pub mod types;
pub mod zones;

pub use biomes::{BiomeCatalog, BiomeInfo};
pub use clock::{GameClock, GameDate, Period};
pub use collaborators::{Services, WorldMessage};
pub use errors::WorldError;
pub use graph::{direction_delta, Map2D, MapMode, RoomGraph};
pub use lifecycle::MaintenanceReport;
pub use mutators::{MutatorCatalog, MutatorSpec};
pub use room::Room;
pub use state::{World, WorldState};
pub use store::RoomStore;
pub use zones::{ZoneConfig, ZoneRegistry};
