//! # Gloam Main Entry Point
//!
//! Loads or generates a level and runs a headless simulation, printing the
//! map and a summary when it stops.

use clap::Parser;
use gloam::{
    generate_level, ActorId, AsciiDisplay, GameConfig, GameContext, GameEvent, GameState,
    GenerationConfig, GloamError, GloamResult, InputHandler, LevelDescription, PlayerInput,
    TurnScheduler,
};
use log::{info, warn, LevelFilter};
use std::path::PathBuf;

/// Command line arguments for Gloam.
#[derive(Parser, Debug)]
#[command(name = "gloam")]
#[command(about = "A turn-based tile roguelike simulation")]
#[command(version)]
struct Args {
    /// Level description file to load instead of generating one
    #[arg(short, long)]
    level: Option<PathBuf>,

    /// Random seed for generation and scripts
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many rounds
    #[arg(short, long, default_value_t = 20)]
    rounds: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Force a dark level
    #[arg(long)]
    dark: bool,

    /// Let a script drive the player instead of waiting every turn
    #[arg(long)]
    autoplay: bool,
}

/// Why the simulation stopped.
#[derive(Debug, PartialEq, Eq)]
enum Ending {
    RoundLimit,
    LevelCleared,
    PlayerFell,
    Stalled,
}

fn main() -> GloamResult<()> {
    let args = Args::parse();
    initialize_logging(&args.log_level)?;

    info!("Starting Gloam v{}", gloam::VERSION);

    let mut config = match &args.config {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.dark {
        config.dark = Some(true);
    }

    let description = match &args.level {
        Some(path) => {
            info!("Loading level from {}", path.display());
            LevelDescription::from_file(path)?
        }
        None => {
            info!("Generating level with seed {}", config.seed);
            generate_level(&GenerationConfig::from_game_config(&config))?
        }
    };

    let level = description.build()?;
    let (width, height) = (level.grid.width(), level.grid.height());
    let mut state = GameState::from_level(level, &config)?;
    let mut ctx = GameContext::new(config);
    ctx.player = state.player();

    if args.autoplay {
        if let Some(actor) = ctx.player.and_then(|id| state.actor_mut(id)) {
            actor.script = Some("ai/chaser".to_string());
        }
    }

    let mut display = AsciiDisplay::new(width, height);
    display.follow_player = false;

    let ending = run(&mut state, &mut ctx, &mut display, args.rounds)?;

    display.flush(&state);
    println!("{}", display.render_to_string());
    if let Some(player) = ctx.player {
        println!("{}", display.status_line(&state, player));
    }
    for message in display.recent_messages(5) {
        println!("  {}", message);
    }
    let stats = &state.statistics;
    println!(
        "{:?} after {} rounds: {} steps, {} monsters defeated, {} damage dealt",
        ending, stats.rounds, stats.steps_taken, stats.monsters_defeated, stats.damage_dealt
    );
    Ok(())
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) -> GloamResult<()> {
    let level: LevelFilter = log_level
        .parse()
        .map_err(|_| GloamError::InvalidState(format!("unknown log level '{}'", log_level)))?;
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .init();
    Ok(())
}

/// Drives the scheduler frame by frame until something ends the run.
fn run(
    state: &mut GameState,
    ctx: &mut GameContext,
    display: &mut AsciiDisplay,
    rounds: u64,
) -> GloamResult<Ending> {
    let input = InputHandler::new();
    let mut scheduler = TurnScheduler::new();
    let dt = ctx.timing().frame_duration;
    let frame_budget = rounds.saturating_mul(state.actors().len() as u64 + 1) * 600;

    scheduler.start(state, ctx);
    for _ in 0..frame_budget {
        if let (Some(active), Some(player)) = (scheduler.active(), ctx.player) {
            if active == player && awaiting_input(state, player) {
                input.apply(PlayerInput::Wait, state, ctx)?;
            }
        }

        scheduler.update(state, ctx, dt)?;

        let mut cleared = false;
        for event in state.drain_events() {
            cleared |= event == GameEvent::LevelCleared;
            display.handle_event(&event);
        }
        display.flush(state);

        if cleared {
            return Ok(Ending::LevelCleared);
        }
        let fallen = ctx
            .player
            .map_or(true, |id| state.actor(id).map_or(true, |a| a.is_pending_deletion()));
        if fallen {
            return Ok(Ending::PlayerFell);
        }
        if scheduler.round() > rounds {
            return Ok(Ending::RoundLimit);
        }
    }

    warn!("Frame budget spent in round {}", scheduler.round());
    Ok(Ending::Stalled)
}

/// True when the player has nothing queued, in flight or to walk.
fn awaiting_input(state: &GameState, player: ActorId) -> bool {
    state.actor(player).is_some_and(|actor| {
        actor.is_player_controlled()
            && actor.current_action().is_none()
            && actor.queued_actions().next().is_none()
            && !actor.is_auto_walking()
    })
}
