//! Binary entrypoint for the mudworld CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and the starter zone under `data/rooms`
//! - `check` - load and validate every room file, print per-zone stats
//! - `map <room> [--width W] [--height H] [--mode all|no-secrets]` - draw the area around a room
//! - `run [--rounds N]` - drive the world clock until Ctrl-C (or N rounds)
//!
//! See the library crate docs for module-level details: `mudworld::`.
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn};

use mudworld::config::Config;
use mudworld::metrics;
use mudworld::world::biomes::BiomeCatalog;
use mudworld::world::map::render;
use mudworld::world::seed::seed_starter_world;
use mudworld::world::{MapMode, RoomGraph, RoomStore, Services, World, WorldState};

#[derive(Parser)]
#[command(name = "mudworld")]
#[command(about = "World simulation core for a text MUD")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum MapArg {
    All,
    NoSecrets,
}

impl From<MapArg> for MapMode {
    fn from(arg: MapArg) -> Self {
        match arg {
            MapArg::All => MapMode::All,
            MapArg::NoSecrets => MapMode::AllButSecrets,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and the starter zone
    Init,
    /// Load every room and report zone statistics
    Check,
    /// Print a map centred on a room
    Map {
        /// Room to centre on (0 means the start room)
        room: u32,
        #[arg(long, default_value_t = 9)]
        width: usize,
        #[arg(long, default_value_t = 9)]
        height: usize,
        #[arg(long, value_enum, default_value_t = MapArg::NoSecrets)]
        mode: MapArg,
    },
    /// Run the world clock
    Run {
        /// Stop after this many rounds instead of waiting for Ctrl-C
        #[arg(long)]
        rounds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config, so there is nothing to load yet
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            if Path::new(&cli.config).exists() {
                info!("Keeping existing configuration at {}", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                println!("Created default configuration at {}", cli.config);
            }
            let config = Config::load(&cli.config).await?;
            let biomes = load_biomes(&config)?;
            let mut store = RoomStore::open(&config.world, biomes)?;
            let seeded = seed_starter_world(&mut store)?;
            if seeded == 0 {
                println!("World data already present in {}", config.world.rooms_dir().display());
            } else {
                println!("Seeded {} starter rooms in {}", seeded, config.world.rooms_dir().display());
            }
        }
        Commands::Check => {
            let config = require_config(pre_config, &cli.config)?;
            let state = match WorldState::open(config, Services::detached()) {
                Ok(state) => state,
                Err(e) => {
                    error!("World check failed: {}", e);
                    return Err(e.into());
                }
            };
            let zones = state.store().zones();
            println!("{} rooms in {} zones", state.store().room_count_on_disk(), zones.len());
            for zone in zones.zone_names() {
                match zones.stats(&zone) {
                    Ok((root, count)) => println!("  {:<24} root {:>6}  rooms {:>5}", zone, root, count),
                    Err(e) => println!("  {:<24} {}", zone, e),
                }
            }
            println!("{} mutators, next room id {}", state.mutators().len(), state.store().next_room_id());
        }
        Commands::Map { room, width, height, mode } => {
            let config = require_config(pre_config, &cli.config)?;
            let mut state = WorldState::open(config, Services::detached())?;
            let store = state.store_mut();
            let room = if room == 0 { store.start_room() } else { room };
            let centre = store
                .load_room(room)
                .map(|r| r.room_id)
                .ok_or_else(|| anyhow!("room {} not found", room))?;
            let mut graph = RoomGraph::new(width, height, mode.into(), None);
            graph.build(store, centre, &HashMap::new())?;
            let (map, cx, cy) = graph.generate_2d_map(width, height, centre);
            print!("{}", render(&map, Some((cx, cy))));
        }
        Commands::Run { rounds } => {
            let config = require_config(pre_config, &cli.config)?;
            let turn_ms = config.timing.turn_ms;
            let world = World::new(WorldState::open(config, Services::detached())?);
            info!("mudworld v{} running, {} ms per turn", env!("CARGO_PKG_VERSION"), turn_ms);

            let mut interval = tokio::time::interval(Duration::from_millis(turn_ms));
            let mut rounds_done = 0u64;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = world.write().tick();
                        if let Some(report) = report {
                            rounds_done += 1;
                            if report.evicted > 0 || report.evictions_failed > 0 || report.fires_spread > 0 {
                                info!("Round maintenance: {:?}", report);
                            }
                            if rounds.is_some_and(|limit| rounds_done >= limit) {
                                break;
                            }
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted, shutting down");
                        break;
                    }
                }
            }

            match world.write().save_all() {
                Ok(n) => info!("Saved {} rooms on shutdown", n),
                Err(e) => warn!("Final save failed: {}", e),
            }
            let counters = metrics::snapshot();
            println!(
                "rounds {}  loaded {}  saved {}  evicted {}  load failures {}",
                counters.rounds_ticked,
                counters.rooms_loaded,
                counters.rooms_saved,
                counters.rooms_evicted,
                counters.load_failures
            );
            let mut zone_spawns: Vec<_> = metrics::zone_spawns_snapshot().into_iter().collect();
            zone_spawns.sort_by(|a, b| a.0.cmp(&b.0));
            for (zone, spawns) in zone_spawns {
                println!(
                    "  {:<24} mobs {:>5}  items {:>5}  failed {:>5}",
                    zone, spawns.mobs, spawns.items, spawns.failures
                );
            }
        }
    }

    Ok(())
}

fn require_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    pre_config.ok_or_else(|| anyhow!("Could not load {} (run `mudworld init` first)", path))
}

fn load_biomes(config: &Config) -> Result<BiomeCatalog> {
    Ok(match &config.world.biomes_file {
        Some(path) => BiomeCatalog::load(Path::new(path))?,
        None => BiomeCatalog::builtin(),
    })
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let config_level = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    // CLI verbosity overrides config
    let level = match verbosity {
        0 => config_level,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Console output only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
