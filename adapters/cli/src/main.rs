#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives Pushbox episodes.

mod config;
mod layout_transfer;
mod rollout;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pushbox_core::{Direction, Layout};
use pushbox_rendering::{GridPresentation, RenderingBackend, Scene, TextBackend};
use pushbox_system_deadlock::DeadlockDetector;
use pushbox_system_episode::{Episode, EpisodeConfig};
use pushbox_world::{query, PuzzleState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::rollout::RolloutSummary;

#[derive(Debug, Parser)]
#[command(name = "pushbox", about = "Block-pushing puzzle environment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play episodes with a uniformly random policy.
    Rollout(RolloutArgs),
    /// Replay a scripted sequence of moves.
    Play(PlayArgs),
    /// Print the starting board of a seeded or shared layout.
    Inspect(InspectArgs),
    /// Print the share code of a seeded layout.
    Encode(EncodeArgs),
}

#[derive(Debug, Args)]
struct RolloutArgs {
    /// Number of episodes to play.
    #[arg(long, default_value_t = 1)]
    episodes: u32,
    /// Seed for layouts and the policy; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file with episode settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Replay a shared layout instead of drawing random ones.
    #[arg(long)]
    layout: Option<String>,
    /// Print the board after every step.
    #[arg(long, default_value_t = false)]
    render: bool,
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Moves separated by commas or spaces, e.g. `r,r,up`.
    #[arg(long)]
    moves: String,
    /// Seed of the layout to draw.
    #[arg(long, conflicts_with = "layout")]
    seed: Option<u64>,
    /// Shared layout to decode.
    #[arg(long)]
    layout: Option<String>,
    /// TOML file with episode settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Seed of the layout to draw.
    #[arg(long, conflicts_with = "layout")]
    seed: Option<u64>,
    /// Shared layout to decode.
    #[arg(long)]
    layout: Option<String>,
    /// TOML file with episode settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct EncodeArgs {
    /// Seed of the layout to encode.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// TOML file with episode settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Entry point for the Pushbox command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Rollout(args) => run_rollout(args),
        Commands::Play(args) => play(args),
        Commands::Inspect(args) => inspect(args),
        Commands::Encode(args) => encode(args),
    }
}

fn load_config(path: Option<&PathBuf>, seed: Option<u64>) -> Result<EpisodeConfig> {
    let mut config = config::load(path.map(PathBuf::as_path))?;
    if let Some(seed) = seed {
        config.seed = seed;
    }
    Ok(config)
}

fn build_episode(config: EpisodeConfig, layout: Option<&str>) -> Result<Episode> {
    let episode = match layout {
        Some(code) => {
            let layout = layout_transfer::decode(code).context("failed to decode --layout")?;
            Episode::from_layout(config, layout)?
        }
        None => Episode::new(config)?,
    };
    Ok(episode)
}

fn run_rollout(args: &RolloutArgs) -> Result<()> {
    let config = load_config(args.config.as_ref(), args.seed)?;
    let mut policy = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));
    let mut episode = build_episode(config, args.layout.as_deref())?;
    let mut backend = TextBackend::new(io::stdout());
    let mut summary = RolloutSummary::default();

    for index in 0..args.episodes {
        // The first puzzle is the one the constructor drew, matching `encode`.
        if index > 0 {
            let _ = episode.reset()?;
        }
        let renderer: Option<&mut dyn RenderingBackend> = if args.render {
            Some(&mut backend)
        } else {
            None
        };
        let result = rollout::play(&mut episode, &mut policy, renderer)?;
        println!(
            "episode {}: {} after {} moves, return {:.2}",
            index + 1,
            result.outcome,
            result.moves,
            result.total_reward
        );
        summary.record(&result);
    }

    println!(
        "{} episodes: {} won, {} deadlocked, {} timed out, mean return {:.2}",
        summary.episodes,
        summary.wins,
        summary.deadlocks,
        summary.timeouts,
        summary.mean_reward()
    );
    Ok(())
}

fn play(args: &PlayArgs) -> Result<()> {
    let directions = args
        .moves
        .split([',', ' '])
        .filter(|token| !token.is_empty())
        .map(str::parse::<Direction>)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse --moves")?;

    let config = load_config(args.config.as_ref(), args.seed)?;
    let mut episode = build_episode(config, args.layout.as_deref())?;
    print_board(episode.state())?;

    for (index, direction) in directions.into_iter().enumerate() {
        let result = episode.step(direction)?;
        println!(
            "step {}: {direction} reward {:.2} ({})",
            index + 1,
            result.reward,
            result.outcome
        );
        if result.done {
            break;
        }
    }
    print_board(episode.state())?;
    println!("return {:.2}", episode.total_reward());
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_ref(), args.seed)?;
    let episode = build_episode(config, args.layout.as_deref())?;
    let state = episode.state();

    print_board(state)?;
    let deadlock = DeadlockDetector::new().diagnose(state);
    println!("blocks: {}", query::blocks(state).len());
    println!(
        "on target: {}/{}",
        query::occupied_targets(state).len(),
        query::targets(state).len()
    );
    println!("total distance: {}", query::total_distance(state));
    match deadlock {
        Some(rule) => println!("deadlock: {rule:?}"),
        None => println!("deadlock: none detected"),
    }
    Ok(())
}

fn encode(args: &EncodeArgs) -> Result<()> {
    let config = load_config(args.config.as_ref(), Some(args.seed))?;
    let episode = Episode::new(config)?;
    let layout: Layout = query::layout(episode.state());
    println!("{}", layout_transfer::encode(&layout)?);
    Ok(())
}

fn print_board(state: &PuzzleState) -> Result<()> {
    let grid = GridPresentation::new(query::grid(state), 1.0)?;
    let mut backend = TextBackend::new(io::stdout());
    backend.present(&Scene::capture(state, grid))
}
