//! Breadth-first room crawl with relative coordinates, and its projection to
//! a fixed-size grid for map rendering.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::debug;

use crate::world::errors::WorldError;
use crate::world::store::RoomStore;
use crate::world::types::{MobInstanceId, RoomExit, RoomId, UserId, VisitorType};

/// Grid step for one exit direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionDelta {
    pub dx: i32,
    pub dy: i32,
    pub arrow: char,
}

/// Resolve a map direction. Accepts the eight compass names with an
/// optional `-x2`/`-x3` stretch or `-gap`/`-gap2`/`-gap3` blank connector.
pub fn direction_delta(name: &str) -> Option<DirectionDelta> {
    let (base, suffix) = match name.split_once('-') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (name, None),
    };
    let (dx, dy, arrow) = match base {
        "north" => (0, -1, '│'),
        "south" => (0, 1, '│'),
        "west" => (-1, 0, '─'),
        "east" => (1, 0, '─'),
        "northwest" => (-1, -1, '╲'),
        "northeast" => (1, -1, '╱'),
        "southwest" => (-1, 1, '╱'),
        "southeast" => (1, 1, '╲'),
        _ => return None,
    };
    let (scale, arrow) = match suffix {
        None => (1, arrow),
        Some("x2") => (2, arrow),
        Some("x3") => (3, arrow),
        Some("gap") => (1, ' '),
        Some("gap2") => (2, ' '),
        Some("gap3") => (3, ' '),
        Some(_) => return None,
    };
    Some(DirectionDelta {
        dx: dx * scale,
        dy: dy * scale,
        arrow,
    })
}

/// What the crawl is allowed to follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MapMode {
    #[default]
    All,
    AllButSecrets,
    /// Only rooms the point-of-view user visited recently.
    Tracking,
    /// Everything within the sprawl limit.
    Radius,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub room_id: RoomId,
    pub symbol: char,
    pub legend: String,
    pub x: i32,
    pub y: i32,
    /// Edges from the root.
    pub sprawl: u32,
    /// Map direction -> target room.
    pub exits: BTreeMap<String, RoomId>,
    pub secret_exits: BTreeSet<String>,
    pub mob_ids: Vec<MobInstanceId>,
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapCell {
    pub room_id: RoomId,
    pub symbol: char,
    pub legend: String,
    pub exits: Vec<DirectionDelta>,
    pub secret_exits: Vec<DirectionDelta>,
}

/// Row-major grid of optional cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map2D {
    rows: Vec<Vec<Option<MapCell>>>,
}

impl Map2D {
    fn blank(width: usize, height: usize) -> Self {
        Self {
            rows: vec![vec![None; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&MapCell> {
        self.rows.get(y)?.get(x)?.as_ref()
    }

    pub fn rows(&self) -> &[Vec<Option<MapCell>>] {
        &self.rows
    }

    pub fn find(&self, room_id: RoomId) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(y, row)| {
            row.iter()
                .position(|c| c.as_ref().is_some_and(|c| c.room_id == room_id))
                .map(|x| (x, y))
        })
    }
}

/// Room fields the crawl needs, copied out of the store.
struct RoomSnapshot {
    room_id: RoomId,
    zone: String,
    symbol: char,
    legend: String,
    exits: Vec<(String, RoomExit)>,
    mob_ids: Vec<MobInstanceId>,
    user_ids: Vec<UserId>,
    pov_visited: bool,
}

fn snapshot(store: &mut RoomStore, room_id: RoomId, pov_user: Option<UserId>) -> Option<RoomSnapshot> {
    let room_id = store.load_room(room_id)?.room_id;
    let room = store.room(room_id)?;
    let (symbol, legend) = room.map_symbol_and_legend(store.biomes());
    Some(RoomSnapshot {
        room_id,
        zone: room.zone.clone(),
        symbol,
        legend,
        exits: room
            .exits
            .iter()
            .map(|(name, exit)| (name.clone(), exit.clone()))
            .collect(),
        mob_ids: room.mobs().to_vec(),
        user_ids: room.players().to_vec(),
        pov_visited: pov_user.is_some_and(|u| room.has_visited(u, VisitorType::User)),
    })
}

fn map_direction(name: &str, exit: &RoomExit) -> String {
    exit.map_direction.clone().unwrap_or_else(|| name.to_string())
}

type Frontier = (RoomId, BTreeMap<String, RoomExit>);

#[derive(Debug, Clone)]
pub struct RoomGraph {
    root: Option<RoomId>,
    zone: Option<String>,
    zone_room_count: usize,
    nodes: HashMap<RoomId, GraphNode>,
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
    limit_width: usize,
    limit_height: usize,
    pov_user: Option<UserId>,
    mode: MapMode,
    max_sprawl: u32,
    symbol_overrides: HashMap<RoomId, (char, String)>,
}

impl RoomGraph {
    pub fn new(limit_width: usize, limit_height: usize, mode: MapMode, pov_user: Option<UserId>) -> Self {
        Self {
            root: None,
            zone: None,
            zone_room_count: 0,
            nodes: HashMap::new(),
            min_x: 0,
            max_x: 0,
            min_y: 0,
            max_y: 0,
            limit_width,
            limit_height,
            pov_user,
            mode,
            max_sprawl: 0,
            symbol_overrides: HashMap::new(),
        }
    }

    /// Hide nodes further than `sprawl` edges from the root. Zero disables the limit.
    pub fn with_max_sprawl(mut self, sprawl: u32) -> Self {
        self.max_sprawl = sprawl;
        self
    }

    pub fn root(&self) -> Option<RoomId> {
        self.root
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn width(&self) -> usize {
        (self.max_x - self.min_x + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.max_y - self.min_y + 1) as usize
    }

    /// `(min_x, min_y, max_x, max_y)` relative to the root.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }

    pub fn node(&self, room_id: RoomId) -> Option<&GraphNode> {
        self.nodes.get(&room_id)
    }

    pub fn room_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn room_ids_with_players(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self
            .nodes
            .values()
            .filter(|n| !n.user_ids.is_empty())
            .map(|n| n.room_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn room_ids_with_mobs(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self
            .nodes
            .values()
            .filter(|n| !n.mob_ids.is_empty())
            .map(|n| n.room_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Show `symbol`/`legend` for these rooms whatever they would normally show.
    pub fn add_room_symbol_overrides(&mut self, symbol: char, legend: &str, room_ids: &[RoomId]) {
        for room_id in room_ids {
            self.symbol_overrides
                .insert(*room_id, (symbol, legend.to_string()));
        }
    }

    /// Crawl outward from `root`. A built graph is never rebuilt in place.
    pub fn build(
        &mut self,
        store: &mut RoomStore,
        root: RoomId,
        symbol_overrides: &HashMap<RoomId, char>,
    ) -> Result<(), WorldError> {
        if self.root.is_some() {
            return Ok(());
        }
        let snap = snapshot(store, root, self.pov_user)
            .ok_or_else(|| WorldError::NotFound(format!("room {root}")))?;

        self.root = Some(snap.room_id);
        self.zone_room_count = store.zones().room_count(&snap.zone);
        self.zone = Some(snap.zone.clone());

        let root_exits: BTreeMap<String, RoomExit> = snap
            .exits
            .iter()
            .map(|(name, exit)| (map_direction(name, exit), exit.clone()))
            .filter(|(dir, _)| direction_delta(dir).is_some())
            .collect();
        self.nodes.insert(
            snap.room_id,
            GraphNode {
                room_id: snap.room_id,
                symbol: snap.symbol,
                legend: snap.legend,
                x: 0,
                y: 0,
                sprawl: 0,
                exits: BTreeMap::new(),
                secret_exits: BTreeSet::new(),
                mob_ids: snap.mob_ids,
                user_ids: snap.user_ids,
            },
        );

        let mut queue: VecDeque<Frontier> = VecDeque::new();
        queue.push_back((snap.room_id, root_exits));

        while let Some((source, exits)) = queue.pop_front() {
            if let Some(symbol) = symbol_overrides.get(&source) {
                if let Some(node) = self.nodes.get_mut(&source) {
                    node.symbol = *symbol;
                }
            }
            for (direction, exit) in exits {
                if let Some(next) = self.add_node(store, source, &direction, &exit) {
                    queue.push_back(next);
                }
            }
        }

        debug!(
            "Graph from room {}: {} rooms, {}x{}",
            root,
            self.nodes.len(),
            self.width(),
            self.height()
        );
        Ok(())
    }

    /// Link `source` to the exit target. Returns the target and its exits to
    /// crawl when the target is new.
    fn add_node(
        &mut self,
        store: &mut RoomStore,
        source: RoomId,
        direction: &str,
        exit: &RoomExit,
    ) -> Option<Frontier> {
        let snap = snapshot(store, exit.room_id, self.pov_user)?;

        if self.mode == MapMode::AllButSecrets && exit.secret {
            return None;
        }
        if self.pov_user.is_some() && !snap.pov_visited {
            if exit.secret || self.mode == MapMode::Tracking {
                return None;
            }
        }

        let delta = direction_delta(direction)?;
        let is_new = !self.nodes.contains_key(&snap.room_id);
        let (src_x, src_y, src_sprawl) = {
            let src = self.nodes.get(&source)?;
            (src.x, src.y, src.sprawl)
        };
        let (x, y) = (src_x + delta.dx, src_y + delta.dy);
        // bounds may have grown since this exit was queued
        if is_new && !self.fits(x, y) {
            return None;
        }

        if let Some(src) = self.nodes.get_mut(&source) {
            src.exits.insert(direction.to_string(), snap.room_id);
            if exit.secret {
                src.secret_exits.insert(direction.to_string());
            }
        }
        if !is_new {
            return None;
        }

        self.nodes.insert(
            snap.room_id,
            GraphNode {
                room_id: snap.room_id,
                symbol: snap.symbol,
                legend: snap.legend,
                x,
                y,
                sprawl: src_sprawl + 1,
                exits: BTreeMap::new(),
                secret_exits: BTreeSet::new(),
                mob_ids: snap.mob_ids,
                user_ids: snap.user_ids,
            },
        );

        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);

        let mut next = BTreeMap::new();
        for (name, target) in snap.exits {
            let dir = map_direction(&name, &target);
            let Some(d) = direction_delta(&dir) else {
                continue;
            };
            if self.nodes.contains_key(&target.room_id) || self.fits(x + d.dx, y + d.dy) {
                next.insert(dir, target);
            }
        }
        Some((snap.room_id, next))
    }

    /// Whether a new node at `(x, y)` stays inside the clipped box. Once an
    /// axis exceeds its limit, that axis stops growing.
    fn fits(&self, x: i32, y: i32) -> bool {
        let maxed_width = self.width() > self.limit_width;
        let maxed_height = self.height() > self.limit_height;
        !(maxed_width && (x < self.min_x || x > self.max_x))
            && !(maxed_height && (y < self.min_y || y > self.max_y))
    }

    /// Project onto a `width` x `height` grid centred on `center`. Returns the
    /// grid and the centre's cell. `0 x 0` projects the whole graph.
    pub fn generate_2d_map(&self, width: usize, height: usize, center: RoomId) -> (Map2D, usize, usize) {
        let Some(center_node) = self.nodes.get(&center) else {
            return (Map2D::blank(1, 1), 0, 0);
        };

        let (width, height, x_start, y_start) = if width == 0 && height == 0 {
            (self.width(), self.height(), self.min_x, self.min_y)
        } else {
            (
                width.max(1),
                height.max(1),
                center_node.x - (width / 2) as i32,
                center_node.y - (height / 2) as i32,
            )
        };
        let x_end = x_start + width as i32;
        let y_end = y_start + height as i32;

        let mut map = Map2D::blank(width, height);
        for node in self.nodes.values() {
            if self.max_sprawl > 0 && node.sprawl > self.max_sprawl {
                continue;
            }
            if node.x < x_start || node.x >= x_end || node.y < y_start || node.y >= y_end {
                continue;
            }
            let (symbol, legend) = match self.symbol_overrides.get(&node.room_id) {
                Some((symbol, legend)) => (*symbol, legend.clone()),
                None => (node.symbol, node.legend.clone()),
            };
            let mut exits = Vec::new();
            let mut secret_exits = Vec::new();
            for direction in node.exits.keys() {
                if let Some(delta) = direction_delta(direction) {
                    if node.secret_exits.contains(direction) {
                        secret_exits.push(delta);
                    }
                    exits.push(delta);
                }
            }
            let cx = (node.x - x_start) as usize;
            let cy = (node.y - y_start) as usize;
            map.rows[cy][cx] = Some(MapCell {
                room_id: node.room_id,
                symbol,
                legend,
                exits,
                secret_exits,
            });
        }

        let cx = (center_node.x - x_start) as usize;
        let cy = (center_node.y - y_start) as usize;
        (map, cx, cy)
    }

    /// True when the zone this graph was built over has changed shape.
    pub fn changed(&self, store: &RoomStore) -> bool {
        let (Some(root), Some(zone)) = (self.root, self.zone.as_deref()) else {
            return true;
        };
        let Some(info) = store.zones().get(zone) else {
            return true;
        };
        if !info.room_ids.contains(&root) {
            return true;
        }
        match store.zones().stats(zone) {
            Ok((zone_root, count)) => {
                if count != self.zone_room_count {
                    debug!(
                        "Graph for zone {} is stale: {} rooms, built over {}",
                        zone, count, self.zone_room_count
                    );
                }
                zone_root != root || count != self.zone_room_count
            }
            Err(_) => true,
        }
    }
}
