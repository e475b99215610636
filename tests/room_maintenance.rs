/// Integration tests for the per-round maintenance pass: unloading idle
/// rooms, visitor recency, and expiry of temporary exits and signs.
mod common;

use chrono::{Duration, Utc};
use mudworld::config::TimingConfig;
use mudworld::world::collaborators::{Mob, MobFactory, User, UserDirectory};
use mudworld::world::mutators::MutatorCatalog;
use mudworld::world::room::Room;
use mudworld::world::types::{RoomExit, SpawnInfo, TemporaryExit, VisitorType};
use mudworld::world::zones::ZoneConfig;
use mudworld::world::{GameClock, WorldState};
use tempfile::TempDir;

use common::{fake_services, open_store, open_world, test_config, FakeUser, FakeUsers, RecordingBus};

const INN: u32 = 1;
const STABLE: u32 = 2;
const CELLAR: u32 = 3;

fn setup_world(idle_rounds: u64, users: FakeUsers) -> (WorldState, RecordingBus, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let mut config = test_config(&dir);
    config.world.unload_idle_rounds = idle_rounds;
    let (services, bus) = fake_services(users);
    let mut state = open_world(config, MutatorCatalog::new(), services);

    let mut inn = Room::new(INN, "Crossroads", "Inn", "A fire crackles in the hearth.")
        .with_biome("house")
        .with_exit("east", RoomExit::to(STABLE))
        .with_exit("down", RoomExit::to(CELLAR));
    inn.zone_config = Some(ZoneConfig::for_root(INN));
    let mut stable = Room::new(STABLE, "Crossroads", "Stable", "Straw and the smell of horses.")
        .with_exit("west", RoomExit::to(INN));
    stable.spawn_info.push(SpawnInfo::mob(12));
    let cellar = Room::new(CELLAR, "Crossroads", "Cellar", "Casks stacked to the ceiling.")
        .with_biome("cave")
        .with_exit("up", RoomExit::to(INN));

    for room in [inn, stable, cellar] {
        state.store_mut().add_room(room).expect("add room");
    }
    state.save_all().expect("initial save");
    (state, bus, dir)
}

#[test]
fn occupied_room_is_never_unloaded() {
    let (mut state, _bus, dir) = setup_world(2, FakeUsers::default().with(FakeUser::new(8, INN)));
    assert!(state.move_player(8, INN).expect("known user"));
    let stable_mob = state
        .store()
        .room(STABLE)
        .and_then(|r| r.spawn_info[0].instance_id)
        .expect("neighbour prepared");

    let mut evicted = 0;
    for _ in 0..6 {
        let report = state.run_rounds(1).expect("report");
        evicted += report.evicted;
        assert_eq!(report.evictions_failed, 0);
    }

    assert!(state.store().is_resident(INN), "room with a player stays loaded");
    assert!(!state.store().is_resident(STABLE));
    assert!(!state.store().is_resident(CELLAR));
    assert_eq!(evicted, 2);
    assert!(
        state.services().mobs.get_instance(stable_mob).is_none(),
        "mobs in an unloaded room are destroyed"
    );
    assert!(dir.path().join("rooms/crossroads/2.json").exists());

    // unloaded rooms come back from disk on demand
    let stable = state.store_mut().load_room(STABLE).expect("reload");
    assert_eq!(stable.title, "Stable");
    assert_eq!(stable.spawn_info[0].instance_id, None);
}

#[test]
fn unloading_spares_mobs_visiting_from_another_room() {
    let (mut state, _bus, _dir) = setup_world(2, FakeUsers::default());
    state.prepare_room(STABLE, false);
    let horse = state
        .store()
        .room(STABLE)
        .and_then(|r| r.spawn_info[0].instance_id)
        .expect("stable mob spawned");

    // the horse wanders down into the cellar
    state.store_mut().room_mut(STABLE).expect("stable").remove_mob(horse);
    state.store_mut().room_mut(CELLAR).expect("cellar").add_mob(horse);
    state
        .services_mut()
        .mobs
        .get_instance_mut(horse)
        .expect("horse")
        .place(CELLAR, "Crossroads");

    state.run_rounds(4);
    assert!(!state.store().is_resident(CELLAR));
    assert!(!state.store().is_resident(STABLE));
    let mob = state.services().mobs.get_instance(horse).expect("wanderer survives");
    assert_eq!((mob.home_room_id(), mob.room_id()), (STABLE, CELLAR));
}

#[test]
fn eviction_candidates_respect_the_resident_floor() {
    let dir = TempDir::new().expect("tempdir");
    let mut store = open_store(&dir);
    for id in 1..=4 {
        store
            .add_room(Room::new(id, "Fields", format!("Field {id}"), "Wheat.").with_biome("farmland"))
            .expect("add");
    }
    store.room_mut(3).expect("room").touch(5);
    store.room_mut(1).expect("room").touch(8);
    store.room_mut(4).expect("room").add_player(1);

    // rooms 2 (round 0), 3 (round 5) and 1 (round 8) are idle; 4 is occupied
    assert_eq!(store.eviction_candidates(100, 10, 0), vec![2, 3, 1]);
    assert_eq!(store.eviction_candidates(100, 10, 2), vec![2, 3]);
    assert!(store.eviction_candidates(100, 10, 4).is_empty());
    assert_eq!(store.eviction_candidates(12, 10, 0), vec![2]);
}

#[test]
fn visitor_recency_fades_over_the_tracking_window() {
    let mut clock = GameClock::new(&TimingConfig::default());
    let window = clock.visitor_window_turns();
    assert_eq!(window, 1800);

    let mut room = Room::new(1, "Fields", "Stile", "A wooden stile.");
    room.mark_visited(4, VisitorType::User, &clock, 0);
    assert_eq!(room.visitors(VisitorType::User, &clock), vec![(4, 1.0)]);

    for _ in 0..window / 2 {
        clock.advance_turn();
    }
    let (_, freshness) = room.visitors(VisitorType::User, &clock)[0];
    assert!((freshness - 0.5).abs() < 1e-9, "got {freshness}");
    assert_eq!(room.prune_visitors(&clock), 0);

    for _ in 0..=window / 2 {
        clock.advance_turn();
    }
    assert_eq!(room.prune_visitors(&clock), 1);
    assert!(room.visitors(VisitorType::User, &clock).is_empty());
    assert!(!room.has_visited(4, VisitorType::User));
}

#[test]
fn occupants_keep_their_visit_fresh() {
    let mut clock = GameClock::new(&TimingConfig::default());
    let mut room = Room::new(1, "Fields", "Stile", "A wooden stile.");
    room.add_player(4);
    room.add_mob(30);
    room.prune_visitors(&clock);

    clock.advance_rounds(100);
    assert_eq!(room.prune_visitors(&clock), 0);
    assert!(room.has_visited(4, VisitorType::User));
    assert!(room.has_visited(30, VisitorType::Mob));
}

#[test]
fn leaving_a_room_leaves_a_trail() {
    let (mut state, _bus, _dir) = setup_world(450, FakeUsers::default().with(FakeUser::new(8, INN)));
    assert!(state.move_player(8, INN).expect("known user"));
    assert!(state.move_player(8, CELLAR).expect("known user"));

    let inn = state.store().room(INN).expect("inn");
    assert!(inn.players().is_empty());
    assert!(inn.has_visited(8, VisitorType::User));
    let (_, freshness) = inn.visitors(VisitorType::User, state.clock())[0];
    assert!(freshness < 1.0);

    let cellar = state.store().room(CELLAR).expect("cellar");
    assert_eq!(cellar.players(), &[8]);
    assert_eq!(
        state.services().users.get_by_user_id(8).map(|u| u.room_id()),
        Some(CELLAR)
    );

    assert!(!state.move_player(8, 999).expect("known user"), "missing room");
    assert!(state.move_player(77, INN).is_err(), "unknown user");
}

#[test]
fn expired_exits_and_signs_are_announced() {
    let (mut state, bus, _dir) = setup_world(450, FakeUsers::default().with(FakeUser::new(8, INN)));
    state.move_player(8, INN).expect("known user");
    {
        let inn = state.store_mut().room_mut(INN).expect("inn");
        assert!(inn.add_temporary_exit(
            "shimmering portal",
            TemporaryExit {
                room_id: CELLAR,
                title: "shimmering portal".to_string(),
                expires: Utc::now() - Duration::seconds(1),
                user_id: Some(8),
            },
        ));
        assert!(!inn.add_sign("Beware the cellar", None, 1));
        assert!(!inn.add_sign("Only you can read this", Some(8), 1));
        for sign in inn.signs.iter_mut() {
            sign.expires = Utc::now() - Duration::seconds(1);
        }
    }

    let report = state.run_rounds(1).expect("report");
    assert_eq!(report.expired_exits, 1);
    assert_eq!(report.expired_signs, 2);
    let texts = bus.texts();
    assert!(texts.contains(&"The shimmering portal vanishes.".to_string()));
    assert!(texts.contains(&"A sign crumbles to dust.".to_string()));
    assert!(texts.contains(&"The rune you had enscribed here has faded away.".to_string()));
    assert!(state.store().room(INN).expect("inn").exits_temp.is_empty());
}

#[test]
fn relay_reaches_neighbours_with_a_way_back() {
    let users = FakeUsers::default()
        .with(FakeUser::new(8, INN))
        .with(FakeUser::new(9, STABLE));
    let (mut state, bus, _dir) = setup_world(450, users);
    state.move_player(8, INN).expect("known user");
    state.move_player(9, STABLE).expect("known user");

    state.send_text_to_exits(INN, "A bell rings.", &[]);
    assert_eq!(bus.texts(), vec!["(From west) A bell rings.".to_string()]);
}
