/// Integration tests for wildfires: which rooms catch, what a fire does to
/// the people and things inside, and how it spreads once it burns out.
mod common;

use mudworld::world::collaborators::{Actor, MobFactory, UserDirectory};
use mudworld::world::mutators::MutatorCatalog;
use mudworld::world::room::Room;
use mudworld::world::types::{Item, RoomExit, BURNING_BUFF_ID, WILDFIRE_BURN_ROUNDS};
use mudworld::world::zones::ZoneConfig;
use mudworld::world::WorldState;
use tempfile::TempDir;

use common::{fake_services, open_world, test_config, FakeUser, FakeUsers, RecordingBus};

const FIELD: u32 = 1;
const WOOD: u32 = 2;
const BARROW: u32 = 3;

fn setup_world(
    spread_percent: u32,
    idle_rounds: u64,
    users: FakeUsers,
) -> (WorldState, RecordingBus, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let mut config = test_config(&dir);
    config.world.wildfire_spread_percent = spread_percent;
    config.world.unload_idle_rounds = idle_rounds;
    let (services, bus) = fake_services(users);
    let mut state = open_world(config, MutatorCatalog::new(), services);

    let mut field = Room::new(FIELD, "Dry Hills", "Field", "Parched grass sways.")
        .with_biome("farmland")
        .with_exit("east", RoomExit::to(WOOD))
        .with_exit("down", RoomExit::to(BARROW));
    field.zone_config = Some(ZoneConfig::for_root(FIELD));
    let wood = Room::new(WOOD, "Dry Hills", "Pinewood", "Needles crunch underfoot.")
        .with_biome("forest")
        .with_exit("west", RoomExit::to(FIELD));
    let barrow = Room::new(BARROW, "Dry Hills", "Barrow", "Cold stone and older bones.")
        .with_biome("cave")
        .with_exit("up", RoomExit::to(FIELD));

    for room in [field, wood, barrow] {
        state.store_mut().add_room(room).expect("add room");
    }
    (state, bus, dir)
}

fn burning(state: &WorldState, room_id: u32) -> bool {
    let now = state.clock().round_count();
    state
        .store()
        .room(room_id)
        .is_some_and(|r| r.is_burning(now))
}

#[test]
fn only_rooms_that_burn_catch_fire() {
    let users = FakeUsers::default()
        .with(FakeUser::new(8, FIELD))
        .with(FakeUser::new(9, WOOD));
    let (mut state, bus, _dir) = setup_world(0, 450, users);
    state.move_player(8, FIELD).expect("known user");
    state.move_player(9, WOOD).expect("known user");

    assert!(!state.ignite_room(BARROW), "stone does not burn");
    assert!(!state.ignite_room(99));
    assert!(state.ignite_room(FIELD));
    assert!(!state.ignite_room(FIELD), "already burning");
    assert!(burning(&state, FIELD));

    let texts = bus.texts();
    assert!(texts.contains(&"A wildfire burns through the area!".to_string()));
    assert!(texts.contains(&"(From west) You notice a wildfire start!".to_string()));
}

#[test]
fn fire_burns_occupants_and_floor_items() {
    let (mut state, bus, _dir) = setup_world(0, 450, FakeUsers::default().with(FakeUser::new(8, FIELD)));
    state.move_player(8, FIELD).expect("known user");
    let goat = state
        .services_mut()
        .mobs
        .new_mob_by_id(40, FIELD, None)
        .expect("goat");
    {
        let field = state.store_mut().room_mut(FIELD).expect("field");
        field.add_mob(goat);
        field.add_item(Item::new(6, "straw hat"), false);
    }

    assert!(state.ignite_room(FIELD));
    let report = state.run_rounds(1).expect("report");
    assert_eq!(report.items_burned, 1);
    assert!(state.store().room(FIELD).expect("field").items.is_empty());
    assert!(bus
        .texts()
        .contains(&"The straw hat that was laying on the ground is destroyed by flames.".to_string()));

    let user = state.services().users.get_by_user_id(8).expect("user");
    assert!(user.has_buff(BURNING_BUFF_ID));
    let user_buffs = user.buff_count();
    let mob = state.services().mobs.get_instance(goat).expect("goat");
    assert!(mob.has_buff(BURNING_BUFF_ID));

    state.run_rounds(1);
    let user = state.services().users.get_by_user_id(8).expect("user");
    assert_eq!(user.buff_count(), user_buffs, "burning is not stacked");
}

#[test]
fn burnt_out_fire_spreads_to_neighbours_that_burn() {
    let (mut state, bus, _dir) = setup_world(100, 450, FakeUsers::default().with(FakeUser::new(8, FIELD)));
    state.move_player(8, FIELD).expect("known user");
    assert!(state.ignite_room(FIELD));

    let report = state.run_rounds(WILDFIRE_BURN_ROUNDS - 1).expect("report");
    assert_eq!(report.fires_spread, 0);
    assert!(burning(&state, FIELD));

    let report = state.run_rounds(1).expect("report");
    assert_eq!(report.fires_spread, 1);
    assert!(!burning(&state, FIELD));
    assert!(burning(&state, WOOD));
    assert!(!burning(&state, BARROW));
    assert!(bus.texts().contains(&"The burning finally subsides.".to_string()));

    // the wood burns out in turn but the field is still cooling down
    let report = state.run_rounds(WILDFIRE_BURN_ROUNDS).expect("report");
    assert_eq!(report.fires_spread, 0);
    assert!(!burning(&state, WOOD));
    assert!(!burning(&state, FIELD));
}

#[test]
fn fire_stays_put_without_a_spread_chance() {
    let (mut state, _bus, _dir) = setup_world(0, 450, FakeUsers::default());
    assert!(state.ignite_room(FIELD));
    let report = state.run_rounds(WILDFIRE_BURN_ROUNDS).expect("report");
    assert_eq!(report.fires_spread, 0);
    assert!(!burning(&state, WOOD));
}

#[test]
fn burning_room_is_not_unloaded() {
    let (mut state, _bus, _dir) = setup_world(0, 2, FakeUsers::default());
    assert!(state.ignite_room(WOOD));

    state.run_rounds(5);
    assert!(state.store().is_resident(WOOD));
    assert!(!state.store().is_resident(FIELD));
    assert!(!state.store().is_resident(BARROW));

    state.run_rounds(WILDFIRE_BURN_ROUNDS);
    assert!(!state.store().is_resident(WOOD), "unloads once the fire is out");
}
