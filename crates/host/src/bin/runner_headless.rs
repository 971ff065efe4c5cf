use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use runner_host::autopilot;
use runner_host::config::HostConfig;
use runner_host::events::HostEvent;
use runner_host::sound::LogSound;
use runner_host::store::{JsonFileStore, KeyValueStore, MemoryStore};
use runner_host::{Host, logging};
use runner_replay::{
    VerifyOptions, acquire_build_fingerprint, artifact_checksum, read_replay, verify_replay,
    write_replay,
};
use runner_sim::display_score;

/// Play the runner minigame without a page: seeded, frame by frame.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON host config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Container width reported at mount
    #[arg(long)]
    container_width: Option<f64>,

    /// Frames to run before closing
    #[arg(short, long, default_value_t = 3600)]
    frames: u64,

    /// Jump over ground obstacles and restart after a game over
    #[arg(short, long)]
    autopilot: bool,

    /// JSON file holding the best score; in-memory when omitted
    #[arg(long)]
    store: Option<PathBuf>,

    /// Write the replay here and verify it
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(width) = args.container_width {
        config.container_width = width;
    }

    let store: Box<dyn KeyValueStore> = match &args.store {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    };
    let sound = Box::new(LogSound::new(config.sound_volume));
    let mut host = Host::new(config, store, sound).context("invalid host config")?;

    let fingerprint = match acquire_build_fingerprint() {
        Ok(fingerprint) => {
            host.set_build_fingerprint(fingerprint.clone());
            Some(fingerprint)
        }
        Err(e) => {
            warn!("build fingerprint unavailable: {e}");
            None
        }
    };

    let mut games = 1u32;
    let mut best_score = 0;
    for _ in 0..args.frames {
        if args.autopilot {
            let state = host.runner().state();
            if state.is_over() {
                games += 1;
                host.handle_event(HostEvent::KeyDown("Space".to_string()));
            } else if autopilot::should_jump(state) {
                host.handle_event(HostEvent::KeyDown("Space".to_string()));
            }
        }
        let Some(out) = host.frame() else {
            break;
        };
        best_score = best_score.max(out.frame.score);
    }

    host.handle_event(HostEvent::Close);
    let _ = host.frame();

    info!(
        "{} frames, {games} game(s), top score {best_score}, best ever {}",
        host.frames_stepped(),
        display_score(host.best_ticks())
    );

    let artifact = host.finalize();
    println!("replay checksum {}", artifact_checksum(&artifact));

    if let Some(path) = &args.replay {
        write_replay(&artifact, path)
            .with_context(|| format!("writing replay to {}", path.display()))?;
        let loaded = read_replay(path)
            .with_context(|| format!("reading replay from {}", path.display()))?;

        let options = VerifyOptions {
            strict_build_check: fingerprint.is_some(),
            current_build: fingerprint,
        };
        if let Err(e) = verify_replay(&loaded, &options) {
            bail!("replay {} failed verification: {e}", path.display());
        }
        info!("replay {} verified", path.display());
    }

    Ok(())
}
