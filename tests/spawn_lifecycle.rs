/// Integration tests for spawn resolution and respawn timing, temporary
/// containers and repeat item spawns, driven through a live WorldState.
mod common;

use mudworld::world::collaborators::{Mob, MobFactory};
use mudworld::world::mutators::MutatorCatalog;
use mudworld::world::room::Room;
use mudworld::world::types::{Container, Item, RoomExit, SpawnInfo};
use mudworld::world::zones::{MobAutoScale, ZoneConfig};
use mudworld::world::WorldState;
use tempfile::TempDir;

use common::{fake_services, open_world, test_config, FakeUser, FakeUsers, RecordingBus};

const BARRACKS: u32 = 1;
const YARD: u32 = 2;

fn setup_world(users: FakeUsers) -> (WorldState, RecordingBus, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let (services, bus) = fake_services(users);
    let mut state = open_world(test_config(&dir), MutatorCatalog::new(), services);

    let mut barracks = Room::new(BARRACKS, "Fort", "Barracks", "Rows of narrow cots.")
        .with_biome("fort")
        .with_exit("east", RoomExit::to(YARD));
    barracks.zone_config = Some(ZoneConfig {
        room_id: BARRACKS,
        mob_auto_scale: MobAutoScale {
            minimum: 2,
            maximum: 4,
        },
        ..ZoneConfig::default()
    });
    let mut sergeant = SpawnInfo::mob(7);
    sergeant.message = Some("The sergeant marches in.".to_string());
    barracks.spawn_info.push(sergeant);

    let mut yard = Room::new(YARD, "Fort", "Yard", "Packed dirt and a water trough.")
        .with_exit("west", RoomExit::to(BARRACKS));
    yard.containers
        .insert("supply crate".to_string(), Container::default());
    yard.spawn_info.push(SpawnInfo::item(50));
    yard.spawn_info
        .push(SpawnInfo::item(51).in_container("crate"));
    yard.spawn_info
        .push(SpawnInfo::gold(6).with_respawn_rate("10 rounds"));

    state.store_mut().add_room(barracks).expect("add barracks");
    state.store_mut().add_room(yard).expect("add yard");
    (state, bus, dir)
}

fn spawned_instance(state: &WorldState, room_id: u32) -> Option<u32> {
    state.store().room(room_id).and_then(|r| r.spawn_info[0].instance_id)
}

#[test]
fn prepare_fills_mob_item_and_gold_spawns() {
    let (mut state, _bus, _dir) = setup_world(FakeUsers::default());
    state.prepare_room(BARRACKS, true);

    let instance = spawned_instance(&state, BARRACKS).expect("sergeant spawned");
    let barracks = state.store().room(BARRACKS).expect("resident");
    assert_eq!(barracks.mobs(), &[instance]);
    let mob = state.services().mobs.get_instance(instance).expect("live mob");
    assert_eq!(mob.home_room_id(), BARRACKS);
    assert_eq!(mob.room_id(), BARRACKS);

    // neighbours are prepared too
    let yard = state.store().room(YARD).expect("yard resident");
    assert!(yard.is_item_present(50));
    assert!(yard
        .container("supply crate")
        .expect("crate")
        .contains_item_id(51));
    assert_eq!(yard.gold, 6);
}

#[test]
fn item_spawn_does_not_duplicate_what_is_still_there() {
    let (mut state, _bus, _dir) = setup_world(FakeUsers::default());
    state.prepare_room(YARD, false);
    state.clock_mut().advance_rounds(1_000);
    state.prepare_room(YARD, false);

    let yard = state.store().room(YARD).expect("resident");
    assert_eq!(yard.items.iter().filter(|i| i.item_id == 50).count(), 1);
    assert_eq!(yard.container("supply crate").expect("crate").count(51), 1);
}

#[test]
fn item_spawn_is_skipped_while_an_occupant_carries_it() {
    let mut carrier = FakeUser::new(5, YARD);
    carrier.carried.push(50);
    let (mut state, _bus, _dir) = setup_world(FakeUsers::default().with(carrier));
    state
        .store_mut()
        .load_room(YARD)
        .expect("yard")
        .add_player(5);
    state.prepare_room(YARD, false);
    assert!(!state.store().room(YARD).expect("yard").is_item_present(50));
}

#[test]
fn mob_respawns_only_after_the_default_rate() {
    let (mut state, _bus, _dir) = setup_world(FakeUsers::default());
    state.prepare_room(BARRACKS, false);
    let first = spawned_instance(&state, BARRACKS).expect("spawned");

    state.services_mut().mobs.destroy_instance(first);
    state.run_rounds(1);
    let barracks = state.store().room(BARRACKS).expect("resident");
    assert!(barracks.mobs().is_empty(), "vanished mob is dropped from the room");
    assert_eq!(barracks.spawn_info[0].despawned_round, Some(1));

    // 15 real minutes at 4 second rounds
    state.clock_mut().advance_rounds(224);
    state.prepare_room(BARRACKS, false);
    assert_eq!(spawned_instance(&state, BARRACKS), None);

    state.clock_mut().advance_rounds(1);
    state.prepare_room(BARRACKS, false);
    let second = spawned_instance(&state, BARRACKS).expect("respawned");
    assert_ne!(first, second);
    assert_eq!(
        state.store().room(BARRACKS).expect("resident").spawn_info[0].despawned_round,
        None
    );
}

#[test]
fn failed_mob_creation_leaves_the_rule_pending() {
    let (mut state, _bus, _dir) = setup_world(FakeUsers::default());
    state
        .store_mut()
        .room_mut(BARRACKS)
        .expect("resident")
        .spawn_info[0]
        .mob_id = Some(901);
    state.prepare_room(BARRACKS, false);
    assert_eq!(spawned_instance(&state, BARRACKS), None);
    assert!(state.store().room(BARRACKS).expect("resident").mobs().is_empty());
}

#[test]
fn spawn_message_reaches_occupied_room() {
    let (mut state, bus, _dir) = setup_world(FakeUsers::default().with(FakeUser::new(5, YARD)));
    state.store_mut().load_room(YARD).expect("yard").add_player(5);
    assert!(state.move_player(5, BARRACKS).expect("known user"));
    // the room was empty when prepared, so nobody heard the arrival
    assert!(bus.texts().is_empty());

    let instance = spawned_instance(&state, BARRACKS).expect("spawned");
    state.services_mut().mobs.destroy_instance(instance);
    state.run_rounds(1);
    state.clock_mut().advance_rounds(300);
    state.prepare_room(BARRACKS, false);
    assert_eq!(bus.texts(), vec!["The sergeant marches in.".to_string()]);
}

#[test]
fn temporary_container_crumbles_on_schedule() {
    let (mut state, bus, _dir) = setup_world(FakeUsers::default().with(FakeUser::new(5, YARD)));
    state.store_mut().load_room(YARD).expect("yard").add_player(5);

    let name = state
        .spawn_temp_container(YARD, "corpse", "3 rounds", 0, vec![Item::new(70, "tin cup")])
        .expect("spawned");
    assert_eq!(name, "corpse");
    let again = state
        .spawn_temp_container(YARD, "corpse", "3 rounds", 0, Vec::new())
        .expect("spawned");
    assert_ne!(again, "corpse", "second container gets a distinct name");

    let mut despawned = 0;
    for _ in 0..2 {
        despawned += state.run_rounds(1).expect("report").despawned_containers;
    }
    assert_eq!(despawned, 0);
    assert!(state.store().room(YARD).expect("yard").container("corpse").is_some());

    despawned += state.run_rounds(1).expect("report").despawned_containers;
    assert_eq!(despawned, 2);
    assert!(state.store().room(YARD).expect("yard").container("corpse").is_none());
    assert!(bus
        .texts()
        .contains(&"The corpse crumbles to dust.".to_string()));

    assert!(state
        .spawn_temp_container(YARD, "urn", "3 fortnights", 0, Vec::new())
        .is_err());
}

#[test]
fn repeat_spawn_item_honours_presence_and_frequency() {
    let (mut state, _bus, _dir) = setup_world(FakeUsers::default());
    assert!(state.repeat_spawn_item(YARD, 80, 10, None));
    assert!(!state.repeat_spawn_item(YARD, 80, 10, None), "already on the floor");

    let item = state
        .store()
        .room(YARD)
        .and_then(|r| r.items.iter().find(|i| i.item_id == 80).cloned())
        .expect("spawned item");
    state
        .store_mut()
        .room_mut(YARD)
        .expect("yard")
        .remove_item(&item, false);
    assert!(!state.repeat_spawn_item(YARD, 80, 10, None), "too soon");

    state.clock_mut().advance_rounds(10);
    assert!(state.repeat_spawn_item(YARD, 80, 10, None));

    assert!(state.repeat_spawn_item(YARD, 81, 10, Some("supply crate")));
    assert!(!state.repeat_spawn_item(YARD, 81, 10, Some("supply crate")));
    assert!(!state.repeat_spawn_item(YARD, 81, 10, Some("wardrobe")), "no such container");
    assert!(!state.repeat_spawn_item(YARD, 950, 10, None), "unknown item");
}
