/// Integration tests for state that must survive an unload or a restart:
/// mutator spawn rounds and the world clock itself.
mod common;

use std::fs;

use mudworld::world::mutators::{MutatorCatalog, MutatorSpec};
use mudworld::world::room::Room;
use mudworld::world::types::SpawnInfo;
use mudworld::world::zones::ZoneConfig;
use mudworld::world::WorldState;
use tempfile::TempDir;

use common::{fake_services, open_world, test_config, FakeUsers};

const MOOR: u32 = 1;
const TOR: u32 = 2;

fn catalog() -> MutatorCatalog {
    let mut catalog = MutatorCatalog::new();
    let mut fog = MutatorSpec::new("fog");
    fog.decay_rate = Some("3 rounds".to_string());
    fog.respawn_rate = Some("1000 rounds".to_string());
    catalog.insert(fog).expect("fog");
    catalog
}

fn open_moor(dir: &TempDir) -> WorldState {
    let mut config = test_config(dir);
    config.world.unload_idle_rounds = 5;
    let (services, _bus) = fake_services(FakeUsers::default());
    open_world(config, catalog(), services)
}

fn setup_moor() -> (WorldState, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let mut state = open_moor(&dir);
    let mut moor = Room::new(MOOR, "Highmoor", "Moor", "Heather and wind.").with_biome("farmland");
    moor.zone_config = Some(ZoneConfig::for_root(MOOR));
    let mut tor = Room::new(TOR, "Highmoor", "Tor", "A stack of grey granite.");
    tor.spawn_info
        .push(SpawnInfo::item(5).with_respawn_rate("10 rounds"));
    for room in [moor, tor] {
        state.store_mut().add_room(room).expect("add room");
    }
    state.save_all().expect("initial save");
    (state, dir)
}

#[test]
fn decayed_mutator_stays_gone_after_an_unload() {
    let (mut state, dir) = setup_moor();
    assert!(state.add_room_mutator(MOOR, "fog"));
    state.run_rounds(4);
    assert!(!state.store().room(MOOR).expect("moor").mutators.is_live("fog"));

    for _ in 0..20 {
        if !state.store().is_resident(MOOR) {
            break;
        }
        state.run_rounds(1);
    }
    assert!(!state.store().is_resident(MOOR), "idle moor unloads");
    let saved = fs::read_to_string(dir.path().join("rooms/highmoor/1.json")).expect("room file");
    assert!(saved.contains("despawned_round"), "{saved}");

    let moor = state.store_mut().load_room(MOOR).expect("reload");
    assert!(!moor.mutators.is_live("fog"));
    state.run_rounds(1);
    assert!(
        !state.store().room(MOOR).expect("moor").mutators.is_live("fog"),
        "respawn is still a thousand rounds away"
    );
}

#[test]
fn reopened_world_resumes_its_clock() {
    let dir = {
        let (mut state, dir) = setup_moor();
        state.clock_mut().advance_rounds(5000);
        state.prepare_room(TOR, false);
        let tor = state.store_mut().room_mut(TOR).expect("tor");
        assert_eq!(tor.items.len(), 1);
        tor.items.clear();
        state.save_all().expect("save");
        dir
    };

    let mut state = open_moor(&dir);
    assert_eq!(state.clock().round_count(), 5000);
    assert_eq!(state.store().current_round(), 5000);

    state.prepare_room(TOR, false);
    assert!(
        state.store().room(TOR).expect("tor").items.is_empty(),
        "item was taken at round 5000 and respawns ten rounds later"
    );

    state.clock_mut().advance_rounds(10);
    state.prepare_room(TOR, false);
    let tor = state.store().room(TOR).expect("tor");
    assert_eq!(tor.items.len(), 1);
    assert_eq!(tor.items[0].item_id, 5);
}
