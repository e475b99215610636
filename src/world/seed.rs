//! Starter world written by `mudworld init` and used by tests.

use std::collections::BTreeMap;

use log::info;

use crate::world::errors::WorldError;
use crate::world::room::Room;
use crate::world::store::RoomStore;
use crate::world::types::{Container, RoomExit, SpawnInfo};
use crate::world::zones::{MobAutoScale, ZoneConfig};

pub const STARTER_ZONE: &str = "Starter Town";

pub const TOWN_SQUARE: u32 = 1;
pub const NORTH_GATE: u32 = 2;
pub const MARKET_ROW: u32 = 3;
pub const OLD_CHAPEL: u32 = 4;
pub const LANTERN_LANE: u32 = 5;
pub const KINGS_ROAD: u32 = 6;
pub const CRYPT: u32 = 7;

pub const TOWN_GUARD_MOB_ID: u32 = 1;
pub const BREAD_ITEM_ID: u32 = 101;
pub const FLOUR_ITEM_ID: u32 = 102;
pub const WATER_ITEM_ID: u32 = 103;

fn starter_rooms() -> Vec<Room> {
    let mut square = Room::new(
        TOWN_SQUARE,
        STARTER_ZONE,
        "Town Square",
        "Cobbles worn smooth by generations of boots surround a dry fountain.",
    )
    .with_biome("city")
    .with_exit("north", RoomExit::to(NORTH_GATE))
    .with_exit("east", RoomExit::to(MARKET_ROW))
    .with_exit("south", RoomExit::to(OLD_CHAPEL))
    .with_exit("west", RoomExit::to(LANTERN_LANE));
    square.zone_config = Some(ZoneConfig {
        room_id: TOWN_SQUARE,
        mob_auto_scale: MobAutoScale { minimum: 1, maximum: 3 },
        default_biome: Some("city".to_string()),
        ..ZoneConfig::default()
    });
    let mut guard = SpawnInfo::mob(TOWN_GUARD_MOB_ID).with_respawn_rate("1 hour");
    guard.message = Some("A town guard strolls in from the barracks.".to_string());
    square.spawn_info.push(guard);

    let gate = Room::new(
        NORTH_GATE,
        STARTER_ZONE,
        "North Gate",
        "A squat gatehouse watches over the road out of town.",
    )
    .with_biome("fort")
    .with_exit("south", RoomExit::to(TOWN_SQUARE))
    .with_exit("north", RoomExit::to(KINGS_ROAD));

    let mut market = Room::new(
        MARKET_ROW,
        STARTER_ZONE,
        "Market Row",
        "Empty stalls lean against each other, waiting for market day.",
    )
    .with_biome("city")
    .with_exit("west", RoomExit::to(TOWN_SQUARE));
    market.containers.insert(
        "baker's crate".to_string(),
        Container {
            recipes: BTreeMap::from([(BREAD_ITEM_ID, vec![FLOUR_ITEM_ID, WATER_ITEM_ID])]),
            ..Container::default()
        },
    );
    market
        .spawn_info
        .push(SpawnInfo::item(FLOUR_ITEM_ID).in_container("crate"));
    market.spawn_info.push(SpawnInfo::gold(5).with_respawn_rate("1 day"));

    let chapel = Room::new(
        OLD_CHAPEL,
        STARTER_ZONE,
        "Old Chapel",
        "Dust hangs in the light from a cracked rose window.",
    )
    .with_biome("house")
    .with_exit("north", RoomExit::to(TOWN_SQUARE))
    .with_exit(
        "loose flagstone",
        RoomExit::to(CRYPT).secret().with_map_direction("east"),
    );

    let lane = Room::new(
        LANTERN_LANE,
        STARTER_ZONE,
        "Lantern Lane",
        "Iron lanterns hang from every eave along this narrow lane.",
    )
    .with_biome("city")
    .with_exit("east", RoomExit::to(TOWN_SQUARE));

    let road = Room::new(
        KINGS_ROAD,
        STARTER_ZONE,
        "King's Road",
        "The road runs north between hedgerows towards distant hills.",
    )
    .with_biome("road")
    .with_exit("south", RoomExit::to(NORTH_GATE));

    let crypt = Room::new(
        CRYPT,
        STARTER_ZONE,
        "Crypt",
        "Cold stone niches line a low passage beneath the chapel.",
    )
    .with_biome("cave")
    .with_exit("up", RoomExit::to(OLD_CHAPEL).with_map_direction("west"));

    vec![square, gate, market, chapel, lane, road, crypt]
}

/// Write the starter zone. Does nothing when the store already has rooms.
pub fn seed_starter_world(store: &mut RoomStore) -> Result<usize, WorldError> {
    if store.room_count_on_disk() > 0 {
        return Ok(0);
    }
    let rooms = starter_rooms();
    let count = rooms.len();
    for room in rooms {
        let room_id = room.room_id;
        store.add_room(room)?;
        store.save_room(room_id)?;
    }
    store.save_world_state()?;
    info!("Seeded {} rooms in zone {}", count, STARTER_ZONE);
    Ok(count)
}
