//! Mutators: named, possibly temporary modifications applied to a room or a whole zone.
//!
//! A [`MutatorSpec`] is the shared template loaded once at startup into a
//! [`MutatorCatalog`]. Rooms and zone configs only carry [`Mutator`] instances,
//! which reference a spec by id and track their own spawn/despawn rounds.
//!
//! Instance state machine:
//!
//! * `Uninitialized` becomes `Despawned` when the respawn period is tied to a
//!   time of day (`"noon"`, `"sunrise"`, ...), otherwise `Live`.
//! * `Live` decays once `now >= since + decay_rate`, either into another spec
//!   (`decay_into_id`, staying live) or into `Despawned`.
//! * `Despawned` comes back to life once `now >= since + respawn_rate`. Without a
//!   respawn rate it is terminal and the instance gets pruned.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::world::clock::{GameClock, Period};
use crate::world::errors::WorldError;
use crate::world::types::{BuffId, RoomExit};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextBehavior {
    Prepend,
    Append,
    #[default]
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextModifier {
    #[serde(default)]
    pub behavior: TextBehavior,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_pattern: Option<String>,
}

impl TextModifier {
    pub fn apply(&self, base: &str) -> String {
        match self.behavior {
            TextBehavior::Replace => self.text.clone(),
            TextBehavior::Prepend if base.is_empty() => self.text.clone(),
            TextBehavior::Append if base.is_empty() => self.text.clone(),
            TextBehavior::Prepend => format!("{} {}", self.text, base),
            TextBehavior::Append => format!("{} {}", base, self.text),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutatorSpec {
    pub mutator_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_modifier: Option<TextModifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_modifier: Option<TextModifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_modifier: Option<TextModifier>,
    /// Spec this mutator turns into when it decays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_into_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub player_buff_ids: Vec<BuffId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mob_buff_ids: Vec<BuffId>,
    /// Buffs for mobs whose home room is the mutated room.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub native_buff_ids: Vec<BuffId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respawn_rate: Option<String>,
    /// Exits that only exist while the mutator is live.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exits: BTreeMap<String, RoomExit>,
}

impl MutatorSpec {
    pub fn new(mutator_id: impl Into<String>) -> Self {
        Self {
            mutator_id: mutator_id.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        if self.mutator_id.trim().is_empty() {
            return Err(WorldError::Reference("mutator with empty id".to_string()));
        }
        for rate in [&self.decay_rate, &self.respawn_rate].into_iter().flatten() {
            Period::parse(rate)?;
        }
        Ok(())
    }

    /// Respawn period names a time of day, so the mutator starts out dormant.
    pub fn respawn_is_phase_locked(&self) -> bool {
        self.respawn_rate
            .as_deref()
            .and_then(|r| Period::parse(r).ok())
            .is_some_and(|p| p.is_calendar_phase())
    }
}

/// All known mutator templates, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MutatorCatalog {
    specs: HashMap<String, MutatorSpec>,
}

impl MutatorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every `*.json` file in `dir`, one spec per file. A missing directory is an empty catalog.
    pub fn load(dir: &Path) -> Result<Self, WorldError> {
        let mut catalog = Self::new();
        if !dir.is_dir() {
            debug!("No mutator directory at {}", dir.display());
            return Ok(catalog);
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|e| WorldError::load(&path, e))?;
            let spec: MutatorSpec =
                serde_json::from_str(&text).map_err(|e| WorldError::load(&path, e))?;
            spec.validate().map_err(|e| WorldError::load(&path, e))?;
            catalog.specs.insert(spec.mutator_id.clone(), spec);
        }

        for spec in catalog.specs.values() {
            if let Some(next) = &spec.decay_into_id {
                if !catalog.specs.contains_key(next) {
                    warn!(
                        "Mutator {} decays into unknown mutator {}",
                        spec.mutator_id, next
                    );
                }
            }
        }

        info!("Loaded {} mutators from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    pub fn insert(&mut self, spec: MutatorSpec) -> Result<(), WorldError> {
        spec.validate()?;
        self.specs.insert(spec.mutator_id.clone(), spec);
        Ok(())
    }

    pub fn get(&self, mutator_id: &str) -> Option<&MutatorSpec> {
        self.specs.get(mutator_id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.specs.keys().map(|k| k.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutatorState {
    #[default]
    Uninitialized,
    Live {
        since: u64,
    },
    Despawned {
        since: u64,
    },
}

/// A mutator attached to a room or zone. The id and the round of its last
/// spawn or despawn are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "MutatorRecord", into = "MutatorRecord")]
pub struct Mutator {
    pub mutator_id: String,
    pub state: MutatorState,
}

/// On-disk form of [`Mutator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MutatorRecord {
    mutator_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spawned_round: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    despawned_round: Option<u64>,
}

impl From<MutatorRecord> for Mutator {
    fn from(record: MutatorRecord) -> Self {
        let state = match (record.spawned_round, record.despawned_round) {
            (_, Some(since)) => MutatorState::Despawned { since },
            (Some(since), None) => MutatorState::Live { since },
            (None, None) => MutatorState::Uninitialized,
        };
        Self {
            mutator_id: record.mutator_id,
            state,
        }
    }
}

impl From<Mutator> for MutatorRecord {
    fn from(mutator: Mutator) -> Self {
        let (spawned_round, despawned_round) = match mutator.state {
            MutatorState::Uninitialized => (None, None),
            MutatorState::Live { since } => (Some(since), None),
            MutatorState::Despawned { since } => (None, Some(since)),
        };
        Self {
            mutator_id: mutator.mutator_id,
            spawned_round,
            despawned_round,
        }
    }
}

impl Mutator {
    pub fn new(mutator_id: impl Into<String>) -> Self {
        Self {
            mutator_id: mutator_id.into(),
            state: MutatorState::Uninitialized,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, MutatorState::Live { .. })
    }

    /// Despawned with nothing that could ever bring it back.
    pub fn is_removable(&self, spec: Option<&MutatorSpec>) -> bool {
        matches!(self.state, MutatorState::Despawned { .. })
            && spec.map_or(true, |s| s.respawn_rate.is_none())
    }

    /// Advance the state machine to `now`.
    pub fn update(&mut self, now: u64, spec: &MutatorSpec, clock: &GameClock) {
        if self.state == MutatorState::Uninitialized {
            self.state = if spec.respawn_is_phase_locked() {
                MutatorState::Despawned { since: now }
            } else {
                MutatorState::Live { since: now }
            };
        }

        match self.state {
            MutatorState::Despawned { since } => {
                let Some(rate) = spec.respawn_rate.as_deref() else {
                    return;
                };
                match clock.add_period(since, rate) {
                    Ok(respawn_round) if now >= respawn_round => {
                        self.state = MutatorState::Live {
                            since: respawn_round,
                        };
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Mutator {} respawn rate: {}", self.mutator_id, e),
                }
            }
            MutatorState::Live { since } => {
                let Some(rate) = spec.decay_rate.as_deref() else {
                    return;
                };
                match clock.add_period(since, rate) {
                    Ok(decay_round) if now >= decay_round => {
                        if let Some(next) = &spec.decay_into_id {
                            debug!("Mutator {} decays into {}", self.mutator_id, next);
                            self.mutator_id = next.clone();
                            self.state = MutatorState::Live { since: now };
                        } else {
                            self.state = MutatorState::Despawned { since: now };
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Mutator {} decay rate: {}", self.mutator_id, e),
                }
            }
            MutatorState::Uninitialized => {}
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MutatorList(Vec<Mutator>);

impl MutatorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a mutator, or revive a dead one with the same id.
    pub fn add(&mut self, mutator_id: &str, catalog: &MutatorCatalog, now: u64, clock: &GameClock) -> bool {
        let Some(spec) = catalog.get(mutator_id) else {
            warn!("Refusing to add unknown mutator {}", mutator_id);
            return false;
        };

        if let Some(existing) = self.0.iter_mut().find(|m| m.mutator_id == mutator_id) {
            if existing.is_live() {
                return false;
            }
            existing.state = MutatorState::Uninitialized;
            existing.update(now, spec, clock);
            return true;
        }

        let mut mutator = Mutator::new(mutator_id);
        mutator.update(now, spec, clock);
        self.0.push(mutator);
        true
    }

    /// Despawn a live mutator. It stays in the list if it can respawn.
    pub fn remove(&mut self, mutator_id: &str, now: u64) -> bool {
        match self
            .0
            .iter_mut()
            .find(|m| m.mutator_id == mutator_id && m.is_live())
        {
            Some(m) => {
                m.state = MutatorState::Despawned { since: now };
                true
            }
            None => false,
        }
    }

    /// Advance every mutator, then drop the ones that can never return.
    pub fn update(&mut self, now: u64, catalog: &MutatorCatalog, clock: &GameClock) {
        let mut kept = Vec::with_capacity(self.0.len());
        for mut mutator in std::mem::take(&mut self.0) {
            match catalog.get(&mutator.mutator_id) {
                Some(spec) => mutator.update(now, spec, clock),
                None => {
                    debug!("Mutator {} has no spec, leaving untouched", mutator.mutator_id);
                    kept.push(mutator);
                    continue;
                }
            }
            if !mutator.is_removable(catalog.get(&mutator.mutator_id)) {
                kept.push(mutator);
            }
        }
        self.0 = kept;
    }

    pub fn active_ids(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|m| m.is_live())
            .map(|m| m.mutator_id.as_str())
            .collect()
    }

    pub fn is_live(&self, mutator_id: &str) -> bool {
        self.0
            .iter()
            .any(|m| m.mutator_id == mutator_id && m.is_live())
    }

    pub fn get(&self, mutator_id: &str) -> Option<&Mutator> {
        self.0.iter().find(|m| m.mutator_id == mutator_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutator> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
