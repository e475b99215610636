//! Biome catalog: environmental classification of rooms.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::world::errors::WorldError;
use crate::world::types::{BuffId, ItemId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BiomeInfo {
    pub name: String,
    pub symbol: char,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dark: bool,
    #[serde(default)]
    pub lit: bool,
    /// Item needed to enter rooms of this biome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_item_id: Option<ItemId>,
    #[serde(default)]
    pub burns: bool,
    /// Buffs applied on entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buff_ids: Vec<BuffId>,
}

impl BiomeInfo {
    fn new(name: &str, symbol: char, description: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol,
            description: description.to_string(),
            dark: false,
            lit: false,
            required_item_id: None,
            burns: false,
            buff_ids: Vec::new(),
        }
    }

    fn lit(mut self) -> Self {
        self.lit = true;
        self
    }

    fn dark(mut self) -> Self {
        self.dark = true;
        self
    }

    fn burns(mut self) -> Self {
        self.burns = true;
        self
    }

    pub fn is_lit(&self) -> bool {
        self.lit && !self.dark
    }

    pub fn is_dark(&self) -> bool {
        !self.lit && self.dark
    }
}

#[derive(Debug, Clone)]
pub struct BiomeCatalog {
    biomes: HashMap<String, BiomeInfo>,
}

impl BiomeCatalog {
    /// The standard biome table.
    pub fn builtin() -> Self {
        let mut water = BiomeInfo::new("Deep Water", '≈', "Water too deep to wade; a boat is needed.");
        water.required_item_id = Some(20030);
        let mut snow = BiomeInfo::new("Snow", '❄', "Frozen ground that saps warmth from travellers.");
        snow.buff_ids = vec![31];
        let mut desert = BiomeInfo::new("Desert", '*', "Sand and heat in every direction.");
        desert.buff_ids = vec![33];

        let entries = [
            ("city", BiomeInfo::new("City", '•', "Paved streets, shops and a watchful guard.").lit()),
            ("fort", BiomeInfo::new("Fort", '•', "Walls and barracks built to house soldiers.").lit()),
            ("road", BiomeInfo::new("Road", '•', "Well travelled paths leading into the countryside.")),
            ("house", BiomeInfo::new("House", '⌂', "A dwelling, occupied or abandoned.").lit().burns()),
            ("shore", BiomeInfo::new("Shore", '~', "The edge where land meets water.")),
            ("water", water),
            ("forest", BiomeInfo::new("Forest", '♣', "Dense trees and thick undergrowth.").burns()),
            ("mountains", BiomeInfo::new("Mountains", '⩕', "Steep rocky slopes and narrow passes.")),
            ("cliffs", BiomeInfo::new("Cliffs", '▼', "Sheer drops along broken rock.")),
            ("swamp", BiomeInfo::new("Swamp", '♨', "Murky water and rotting vegetation.").dark()),
            ("snow", snow),
            ("spiderweb", BiomeInfo::new("Spiderweb", '🕸', "Sticky strands stretched across everything.").dark()),
            ("cave", BiomeInfo::new("Cave", '⌬', "Tunnels beneath the earth, lightless.").dark()),
            ("desert", desert),
            ("farmland", BiomeInfo::new("Farmland", ',', "Tilled fields and scattered farmsteads.").burns()),
        ];

        Self {
            biomes: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Load a replacement table from a JSON object keyed by biome name.
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let text = std::fs::read_to_string(path).map_err(|e| WorldError::load(path, e))?;
        let raw: HashMap<String, BiomeInfo> =
            serde_json::from_str(&text).map_err(|e| WorldError::load(path, e))?;
        if raw.is_empty() {
            return Err(WorldError::load(path, "biome table is empty"));
        }
        Ok(Self {
            biomes: raw
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&BiomeInfo> {
        self.biomes.get(&name.trim().to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.biomes.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

impl Default for BiomeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
