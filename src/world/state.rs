//! The world as one owned object: configuration, clock, room store, catalogs
//! and collaborators, plus the shared handle the game loop locks per tick.

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{error, info, warn};

use crate::config::Config;
use crate::metrics;
use crate::world::biomes::BiomeCatalog;
use crate::world::clock::GameClock;
use crate::world::collaborators::Services;
use crate::world::errors::WorldError;
use crate::world::lifecycle::MaintenanceReport;
use crate::world::mutators::MutatorCatalog;
use crate::world::store::RoomStore;

pub struct WorldState {
    pub(crate) config: Config,
    pub(crate) clock: GameClock,
    pub(crate) store: RoomStore,
    pub(crate) mutators: MutatorCatalog,
    pub(crate) services: Services,
    last_report: Option<MaintenanceReport>,
}

impl WorldState {
    /// Load catalogs, open the store and index every room on disk.
    /// Any unreadable or invalid room file fails the whole open.
    pub fn open(config: Config, services: Services) -> Result<Self, WorldError> {
        let biomes = match &config.world.biomes_file {
            Some(path) => BiomeCatalog::load(Path::new(path))?,
            None => BiomeCatalog::builtin(),
        };
        let mutators = MutatorCatalog::load(&config.world.mutators_dir())?;
        Self::with_catalogs(config, biomes, mutators, services)
    }

    pub fn with_catalogs(
        config: Config,
        biomes: BiomeCatalog,
        mutators: MutatorCatalog,
        services: Services,
    ) -> Result<Self, WorldError> {
        let mut store = RoomStore::open(&config.world, biomes)?;
        if let Err(e) = store.load_all_room_zones() {
            error!("World load failed: {}", e);
            return Err(e);
        }
        info!(
            "World open: {} rooms, {} zones, {} mutators",
            store.room_count_on_disk(),
            store.zones().len(),
            mutators.len()
        );

        let mut clock = GameClock::new(&config.timing);
        clock.set_round(store.current_round());
        if store.current_round() > 0 {
            info!("Resuming world clock at round {}", store.current_round());
        }

        Ok(Self {
            clock,
            config,
            store,
            mutators,
            services,
            last_report: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RoomStore {
        &mut self.store
    }

    pub fn mutators(&self) -> &MutatorCatalog {
        &self.mutators
    }

    pub fn mutators_mut(&mut self) -> &mut MutatorCatalog {
        &mut self.mutators
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    pub fn last_report(&self) -> Option<&MaintenanceReport> {
        self.last_report.as_ref()
    }

    /// Advance one turn. On a round boundary run the round passes and return
    /// the maintenance report.
    pub fn tick(&mut self) -> Option<MaintenanceReport> {
        if !self.clock.advance_turn() {
            return None;
        }
        Some(self.on_new_round())
    }

    /// Step whole rounds, running every round pass.
    pub fn run_rounds(&mut self, rounds: u64) -> Option<MaintenanceReport> {
        let mut last = None;
        for _ in 0..rounds {
            while !self.clock.advance_turn() {}
            last = Some(self.on_new_round());
        }
        last
    }

    fn on_new_round(&mut self) -> MaintenanceReport {
        let now = self.clock.round_count();
        metrics::inc_rounds_ticked();
        self.store.set_current_round(now);

        self.round_tick();
        let report = self.room_maintenance();

        let cadence = self.config.timing.rounds_per_autosave;
        if cadence > 0 && now % cadence == 0 {
            match self.save_all() {
                Ok(n) => info!("Autosaved {} rooms at round {}", n, now),
                Err(e) => warn!("Autosave at round {} failed: {}", now, e),
            }
        }

        self.last_report = Some(report.clone());
        report
    }

    /// Save every resident room and the world state, including the current round.
    pub fn save_all(&mut self) -> Result<usize, WorldError> {
        self.store.set_current_round(self.clock.round_count());
        self.store.save_all()
    }
}

/// Cloneable handle to the single world lock.
#[derive(Clone)]
pub struct World {
    inner: Arc<RwLock<WorldState>>,
}

impl World {
    pub fn new(state: WorldState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, WorldState> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Held for the duration of a tick.
    pub fn write(&self) -> RwLockWriteGuard<'_, WorldState> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
