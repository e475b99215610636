//! # mudworld - world simulation core for a text MUD
//!
//! mudworld owns the spatial graph of rooms and everything that changes in it
//! over game time: lazy room loading and unloading, mob and item respawns,
//! room and zone mutators, visitor trails, temporary exits and signs, and the
//! map crawler used to draw the surroundings.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mudworld::config::Config;
//! use mudworld::world::{Services, World, WorldState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let world = World::new(WorldState::open(config, Services::detached())?);
//!
//!     // one turn; round passes run on round boundaries
//!     if let Some(report) = world.write().tick() {
//!         println!("{report:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - rooms, zones, the store, lifecycle passes and map building
//! - [`config`] - configuration management and validation
//! - [`logutil`] - log-safe previews of room text
//! - [`metrics`] - process-wide counters
//!
//! ## Time
//!
//! ```text
//! turn ──(turns_per_round)──▶ round ──(rounds_per_day)──▶ game day
//! ```
//!
//! Rounds drive spawns, mutators and unloading; turns drive visitor recency.

pub mod config;
pub mod logutil;
pub mod metrics;
pub mod world;
