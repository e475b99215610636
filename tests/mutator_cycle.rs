/// Integration tests for room and zone mutators: decay and respawn over
/// rounds, decay chains, buff grants and mutator-only exits.
mod common;

use std::collections::BTreeMap;

use mudworld::world::collaborators::{Actor, MobFactory, UserDirectory};
use mudworld::world::mutators::{MutatorCatalog, MutatorSpec, TextBehavior, TextModifier};
use mudworld::world::room::Room;
use mudworld::world::types::{RoomExit, SpawnInfo};
use mudworld::world::zones::ZoneConfig;
use mudworld::world::WorldState;
use tempfile::TempDir;

use common::{fake_services, open_world, test_config, FakeUser, FakeUsers};

const GLADE: u32 = 1;
const GROVE: u32 = 2;
const FAR_BANK: u32 = 3;

fn catalog() -> MutatorCatalog {
    let mut catalog = MutatorCatalog::new();

    let mut fog = MutatorSpec::new("fog");
    fog.decay_rate = Some("3 rounds".to_string());
    fog.respawn_rate = Some("5 rounds".to_string());
    fog.player_buff_ids = vec![7];
    fog.mob_buff_ids = vec![8];
    fog.native_buff_ids = vec![9];
    fog.name_modifier = Some(TextModifier {
        behavior: TextBehavior::Prepend,
        text: "Foggy".to_string(),
        color_pattern: None,
    });
    catalog.insert(fog).expect("fog");

    let mut embers = MutatorSpec::new("embers");
    embers.decay_rate = Some("2 rounds".to_string());
    embers.decay_into_id = Some("ash".to_string());
    catalog.insert(embers).expect("embers");
    catalog.insert(MutatorSpec::new("ash")).expect("ash");

    let mut storm = MutatorSpec::new("storm");
    storm.player_buff_ids = vec![21];
    storm.alert_modifier = Some(TextModifier {
        behavior: TextBehavior::Replace,
        text: "Rain lashes down.".to_string(),
        color_pattern: None,
    });
    catalog.insert(storm).expect("storm");

    let mut bridge = MutatorSpec::new("rope bridge");
    bridge.exits = BTreeMap::from([("across".to_string(), RoomExit::to(FAR_BANK))]);
    bridge.decay_rate = Some("1 round".to_string());
    catalog.insert(bridge).expect("bridge");

    catalog
}

fn setup_world(users: FakeUsers) -> (WorldState, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let (services, _bus) = fake_services(users);
    let mut state = open_world(test_config(&dir), catalog(), services);

    let mut glade = Room::new(GLADE, "Wildwood", "Glade", "Sunlight pools between the oaks.")
        .with_biome("forest")
        .with_exit("east", RoomExit::to(GROVE));
    glade.zone_config = Some(ZoneConfig::for_root(GLADE));
    let mut grove = Room::new(GROVE, "Wildwood", "Grove", "Ancient trees crowd together.")
        .with_exit("west", RoomExit::to(GLADE));
    grove.spawn_info.push(SpawnInfo::mob(4));
    let far_bank = Room::new(FAR_BANK, "Wildwood", "Far Bank", "Reeds and mud.");

    for room in [glade, grove, far_bank] {
        state.store_mut().add_room(room).expect("add room");
    }
    (state, dir)
}

fn attach(state: &mut WorldState, room_id: u32, mutator_id: &str) {
    assert!(state.add_room_mutator(room_id, mutator_id));
}

fn is_live(state: &WorldState, room_id: u32, mutator_id: &str) -> bool {
    state
        .store()
        .room(room_id)
        .is_some_and(|r| r.mutators.is_live(mutator_id))
}

#[test]
fn room_mutator_decays_and_respawns() {
    let (mut state, _dir) = setup_world(FakeUsers::default());
    attach(&mut state, GROVE, "fog");
    assert!(is_live(&state, GROVE, "fog"));

    let mut timeline = Vec::new();
    for _ in 0..9 {
        state.run_rounds(1);
        timeline.push(is_live(&state, GROVE, "fog"));
    }
    // live through round 2, gone rounds 3-7, back at round 8
    assert_eq!(
        timeline,
        vec![true, true, false, false, false, false, false, true, true]
    );
}

#[test]
fn decay_chain_replaces_the_mutator() {
    let (mut state, _dir) = setup_world(FakeUsers::default());
    attach(&mut state, GLADE, "embers");
    state.run_rounds(2);
    assert!(!is_live(&state, GLADE, "embers"));
    assert!(is_live(&state, GLADE, "ash"));
}

#[test]
fn live_mutator_buffs_players_and_native_mobs() {
    let (mut state, _dir) = setup_world(FakeUsers::default().with(FakeUser::new(3, GLADE)));
    attach(&mut state, GROVE, "fog");
    state.store_mut().load_room(GLADE).expect("glade").add_player(3);
    assert!(state.move_player(3, GROVE).expect("known user"));

    let user = state.services().users.get_by_user_id(3).expect("user");
    assert!(user.has_buff(7), "buff granted on entry");

    let instance = state
        .store()
        .room(GROVE)
        .and_then(|r| r.spawn_info[0].instance_id)
        .expect("grove mob spawned");
    state.run_rounds(1);
    let mob = state.services().mobs.get_instance(instance).expect("mob");
    assert!(mob.has_buff(8));
    assert!(mob.has_buff(9), "mob lives here so it gets the native buff");
    assert!(!mob.has_buff(7));

    state.run_rounds(1);
    let mob = state.services().mobs.get_instance(instance).expect("mob");
    assert_eq!(mob.buff_count(), 2, "buffs are not stacked");
}

#[test]
fn zone_mutator_reaches_every_room_in_the_zone() {
    let (mut state, _dir) = setup_world(FakeUsers::default().with(FakeUser::new(3, GROVE)));
    assert!(state.add_zone_mutator("Wildwood", "storm").expect("zone exists"));
    assert!(!state.add_zone_mutator("Wildwood", "storm").expect("zone exists"), "already live");
    assert!(state.add_zone_mutator("Nowhere", "storm").is_err());

    state.store_mut().load_room(GROVE).expect("grove").add_player(3);
    state.run_rounds(1);
    let user = state.services().users.get_by_user_id(3).expect("user");
    assert!(user.has_buff(21));

    let zone_active: Vec<String> = state
        .store_mut()
        .zone_config("Wildwood")
        .map(|cfg| cfg.mutators.active_ids().into_iter().map(str::to_string).collect())
        .unwrap_or_default();
    assert_eq!(zone_active, vec!["storm".to_string()]);

    attach(&mut state, GROVE, "fog");
    let grove = state.store().room(GROVE).expect("grove");
    assert_eq!(grove.display_title(state.mutators(), &zone_active), "Foggy Grove");
    assert_eq!(
        grove.mutator_alerts(state.mutators(), &zone_active),
        vec!["Rain lashes down.".to_string()]
    );
    assert_eq!(grove.display_title(state.mutators(), &[]), "Foggy Grove");
    assert!(state
        .store()
        .room(FAR_BANK)
        .expect("far bank")
        .mutator_alerts(state.mutators(), &[])
        .is_empty());
}

#[test]
fn mutator_exit_exists_only_while_live() {
    let (mut state, _dir) = setup_world(FakeUsers::default());
    attach(&mut state, GLADE, "rope bridge");
    let exits = state
        .store()
        .room(GLADE)
        .expect("glade")
        .exits_with_mutators(state.mutators());
    assert_eq!(exits.get("across").map(|e| e.room_id), Some(FAR_BANK));
    assert!(exits.contains_key("east"));

    state.run_rounds(1);
    let glade = state.store().room(GLADE).expect("glade");
    assert!(!glade.exits_with_mutators(state.mutators()).contains_key("across"));
    assert!(glade.mutators.is_empty(), "no respawn rate, so it is dropped");
}
