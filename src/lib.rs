//! # Gloam
//!
//! A turn-based tile roguelike core: grid occupancy, A* and downhill-map
//! movement, recursive shadowcast sight, and a frame-driven turn scheduler.
//!
//! ## Architecture Overview
//!
//! - **Grid**: per-cell terrain, occupancy handles and discovery state
//! - **Pathfinding**: A* paths and Dijkstra downhill maps over the grid
//! - **Field of View**: recursive shadowcasting with memoized radii
//! - **Turn Scheduler**: ID-ordered turns over queued, animated actions
//! - **Scripts**: pluggable decision makers for non-player actors
//!
//! Rendering, input devices and audio live outside the core. The core
//! exposes read-only queries and a stream of [`GameEvent`]s that a
//! presentation layer such as [`AsciiDisplay`] subscribes to.

pub mod game;
pub mod generation;
pub mod input;
pub mod rendering;
pub mod script;
pub mod utils;

pub use game::*;
pub use generation::*;
pub use input::*;
pub use rendering::*;
pub use script::*;
pub use utils::*;

/// Core error type for the Gloam engine.
#[derive(thiserror::Error, Debug)]
pub enum GloamError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Level description could not be parsed
    #[error("Level parse error on line {line}: {message}")]
    LevelParse { line: usize, message: String },

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// No walkable, unoccupied cell near the requested position
    #[error("No free cell near {0:?}")]
    NoFreeCell(Position),

    /// Actor handle does not resolve to a live actor
    #[error("Unknown actor: {0}")]
    UnknownActor(ActorId),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Result type used throughout the Gloam codebase.
pub type GloamResult<T> = Result<T, GloamError>;

/// Version information for the game.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Largest grid side length in cells
    pub const MAX_GRID_SIDE: u32 = 255;

    /// Default dungeon width in tiles
    pub const DEFAULT_DUNGEON_WIDTH: u32 = 60;

    /// Default dungeon height in tiles
    pub const DEFAULT_DUNGEON_HEIGHT: u32 = 30;

    /// Default sight radius for player-side actors
    pub const DEFAULT_SIGHT_RADIUS: u8 = 8;

    /// Default player health
    pub const DEFAULT_PLAYER_HEALTH: i32 = 30;

    /// Default monster health
    pub const DEFAULT_MONSTER_HEALTH: i32 = 8;

    /// Moves per turn for the player
    pub const DEFAULT_PLAYER_MOVES: i32 = 1;

    /// Moves per turn for monsters
    pub const DEFAULT_MONSTER_MOVES: i32 = 1;

    /// Trees closer than this (in rows) never block sight
    pub const TREE_CLEAR_DISTANCE: u32 = 1;

    /// Ring radius searched when a spawn cell is blocked
    pub const SPAWN_SEARCH_RADIUS: i32 = 3;

    /// Frames per second target for the game loop
    pub const TARGET_FPS: u64 = 60;
}
