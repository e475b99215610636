//! Text rendering for projected maps.

use std::collections::BTreeSet;

use crate::world::graph::{direction_delta, Map2D};
use crate::world::room::DEFAULT_MAP_SYMBOL;
use crate::world::store::RoomStore;
use crate::world::types::RoomId;

const MARKER: char = '@';
const BUSY_SYMBOL: char = '⚠';
const TINY_SIZE: usize = 5;

/// Draw a projected map. Rooms sit on even cells with connectors between
/// them; `marker` replaces the symbol at that map cell. A legend follows.
pub fn render(map: &Map2D, marker: Option<(usize, usize)>) -> String {
    let (w, h) = (map.width(), map.height());
    if w == 0 || h == 0 {
        return String::new();
    }
    let canvas_w = w * 2 - 1;
    let canvas_h = h * 2 - 1;
    let mut canvas = vec![vec![' '; canvas_w]; canvas_h];
    let mut legend: BTreeSet<(char, String)> = BTreeSet::new();

    for (y, row) in map.rows().iter().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let Some(cell) = cell else {
                continue;
            };
            let (cx, cy) = (x as i32 * 2, y as i32 * 2);
            for exit in &cell.exits {
                let (sx, sy) = (exit.dx.signum(), exit.dy.signum());
                let steps = exit.dx.abs().max(exit.dy.abs()) * 2;
                // connector cells only; the far end belongs to the target room
                for step in 1..steps {
                    let (px, py) = (cx + sx * step, cy + sy * step);
                    if px < 0 || py < 0 || px as usize >= canvas_w || py as usize >= canvas_h {
                        break;
                    }
                    if px % 2 == 0 && py % 2 == 0 {
                        continue;
                    }
                    let slot = &mut canvas[py as usize][px as usize];
                    if *slot == ' ' {
                        *slot = exit.arrow;
                    }
                }
            }
            canvas[cy as usize][cx as usize] = cell.symbol;
            legend.insert((cell.symbol, cell.legend.clone()));
        }
    }

    if let Some((mx, my)) = marker {
        if mx < w && my < h {
            canvas[my * 2][mx * 2] = MARKER;
        }
    }

    let mut out = String::new();
    for line in canvas {
        let line: String = line.into_iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    if !legend.is_empty() {
        out.push('\n');
        for (symbol, name) in legend {
            out.push_str(&format!("{symbol} {name}\n"));
        }
    }
    out
}

/// 5x5 boxed view of the immediate exits around a room, `@` in the middle.
/// Secret exits are left out; occupied neighbours show a warning symbol.
pub fn tiny_map(store: &mut RoomStore, room_id: RoomId) -> Vec<String> {
    let mut grid = [[' '; TINY_SIZE]; TINY_SIZE];
    let origin = (TINY_SIZE / 2) as i32;
    grid[origin as usize][origin as usize] = MARKER;

    let exits: Vec<(String, RoomId)> = match store.load_room(room_id) {
        Some(room) => room
            .exits
            .iter()
            .filter(|(_, e)| !e.secret)
            .map(|(name, e)| (e.map_direction.clone().unwrap_or_else(|| name.clone()), e.room_id))
            .collect(),
        None => Vec::new(),
    };

    for (direction, target) in exits {
        let Some(delta) = direction_delta(&direction) else {
            continue;
        };
        let (sx, sy) = (delta.dx.signum(), delta.dy.signum());
        if sx == 0 && sy == 0 {
            continue;
        }
        let symbol = match store.load_room(target) {
            Some(r) if r.player_count() > 0 || !r.mobs().is_empty() => BUSY_SYMBOL,
            Some(r) => r.map_symbol.chars().next().unwrap_or(DEFAULT_MAP_SYMBOL),
            None => DEFAULT_MAP_SYMBOL,
        };

        let (tx, ty) = (origin + delta.dx * 2, origin + delta.dy * 2);
        let (mut x_steps, mut y_steps) = ((delta.dx * 2).abs(), (delta.dy * 2).abs());
        let (mut px, mut py) = (origin, origin);
        while x_steps > 0 || y_steps > 0 {
            if x_steps > 0 {
                x_steps -= 1;
            }
            if y_steps > 0 {
                y_steps -= 1;
            }
            px += sx;
            py += sy;
            if px < 0 || py < 0 || px >= TINY_SIZE as i32 || py >= TINY_SIZE as i32 {
                continue;
            }
            grid[py as usize][px as usize] = if px == tx && py == ty { symbol } else { delta.arrow };
        }
    }

    let mut lines = Vec::with_capacity(TINY_SIZE + 2);
    lines.push("╔═════╗".to_string());
    for row in grid {
        lines.push(format!("║{}║", row.iter().collect::<String>()));
    }
    lines.push("╚═════╝".to_string());
    lines
}
