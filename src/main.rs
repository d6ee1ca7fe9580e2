use cuecast::cli::Args;
use cuecast::config::{self, EngineConfig, PathConfig};
use cuecast::core::engine_events::{CueIndexOutOfRangeEvent, ManifestResolutionFailureEvent, TimelineEndedEvent};
use cuecast::core::{AssetData, AssetKey, Clock, Engine, EngineHandle, RenderedCue, SnapshotRender};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How often the host drains the engine's deferred event queue
const EVENT_DRAIN_INTERVAL: Duration = Duration::from_millis(250);

/// One render cache entry as printed on exit
#[derive(Serialize)]
struct CacheDump {
    key: String,
    name: String,
    output: RenderedCue,
}

/// Read one asset file: a single asset object or an array of them
fn read_asset_file(path: &Path) -> Result<Vec<AssetData>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read asset file: {}", path.display()))?;

    if json.trim_start().starts_with('[') {
        serde_json::from_str(&json).with_context(|| format!("Failed to parse asset array: {}", path.display()))
    } else {
        Ok(vec![AssetData::from_json(&json).with_context(|| format!("Invalid asset: {}", path.display()))?])
    }
}

fn load_config(args: &Args, paths: &PathConfig) -> Result<EngineConfig> {
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::load_or_default(paths)?,
    };

    if let Some(ms) = args.interval_ms {
        cfg.tick_interval_ms = ms;
    }
    if let Some(policy) = args.end_policy {
        cfg.end_policy = policy;
    }
    Ok(cfg)
}

fn init_logging(args: &Args) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt.clone().unwrap_or_else(|| PathBuf::from("cuecast.log"));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Respects RUST_LOG if set
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("cuecast {} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    info!("Config path: {}", config::config_file(config::CONFIG_FILE, &path_config).display());
    let cfg = load_config(&args, &path_config)?;

    let engine = Engine::new(&cfg, SnapshotRender);
    engine.events().subscribe::<ManifestResolutionFailureEvent, _>(|e| {
        error!("Tick {}: manifest key {} did not resolve", e.tick, e.key);
    });
    engine.events().subscribe::<CueIndexOutOfRangeEvent, _>(|e| {
        error!("Tick {}: {} index {} outside timeline of {}", e.tick, e.key, e.index, e.len);
    });
    engine.events().subscribe::<TimelineEndedEvent, _>(|e| {
        debug!("{} reached its last cue ({:?})", e.key, e.policy);
    });
    let events = engine.events().clone();
    let handle = EngineHandle::new(engine);

    let mut keys: Vec<AssetKey> = Vec::new();
    for path in &args.assets {
        for data in read_asset_file(path)? {
            let key = handle.load_asset(data)?;
            keys.push(key);
        }
    }

    if keys.is_empty() {
        warn!("No assets loaded; nothing will render");
    }

    if args.autoplay {
        for key in &keys {
            handle.play(key)?;
        }
    }

    let clock = Clock::start(handle.clone(), cfg.tick_interval(), Some(args.ticks))
        .context("Failed to start clock thread")?;

    // Callbacks above already logged each event; keep the queue short
    let drain = crossbeam_channel::tick(EVENT_DRAIN_INTERVAL);
    let mut drained = 0usize;
    while !clock.is_finished() {
        let _ = drain.recv();
        if events.queue_len() > 0 {
            drained += events.poll().len();
        }
    }
    let ticks = clock.join();
    drained += events.poll().len();
    info!("Ran {} ticks, {} engine events", ticks, drained);

    // Load order, skipping assets that never rendered
    let dump: Vec<CacheDump> = {
        let engine = handle.lock();
        keys.iter()
            .filter_map(|key| {
                handle.read(key).map(|output| CacheDump {
                    key: key.short().to_string(),
                    name: engine.registry().asset_name(key).unwrap_or_default().to_string(),
                    output,
                })
            })
            .collect()
    };

    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
