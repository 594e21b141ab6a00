//! # Game Context
//!
//! Session-wide collaborators threaded through update calls: camera, random
//! number generator, the active player handle, the script registry and the
//! loaded configuration.

use crate::config;
use crate::game::{ActorId, AnimationTiming, Position};
use crate::script::ScriptRegistry;
use crate::GloamResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Viewport over the grid, measured in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub center: Position,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            center: Position::new(0, 0),
            width,
            height,
        }
    }

    pub fn center_on(&mut self, pos: Position) {
        self.center = pos;
    }

    /// Top-left cell of the viewport.
    pub fn origin(&self) -> Position {
        Position::new(
            self.center.x - (self.width / 2) as i32,
            self.center.y - (self.height / 2) as i32,
        )
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        let origin = self.origin();
        pos.x >= origin.x
            && pos.y >= origin.y
            && pos.x < origin.x + self.width as i32
            && pos.y < origin.y + self.height as i32
    }
}

/// Tunable settings, loadable from a JSON file.
///
/// Missing keys fall back to their defaults.
///
/// # Examples
///
/// ```
/// use gloam::GameConfig;
///
/// let config = GameConfig::from_json_str(r#"{ "seed": 7, "dark": true }"#).unwrap();
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.dark, Some(true));
/// assert_eq!(config.sight_radius, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub seed: u64,
    pub player_moves: i32,
    pub monster_moves: i32,
    pub sight_radius: u8,
    /// Overrides the level's own dark flag when set
    pub dark: Option<bool>,
    pub timing: AnimationTiming,
    pub camera_width: u32,
    pub camera_height: u32,
    pub dungeon_width: u32,
    pub dungeon_height: u32,
    pub monster_count: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            player_moves: config::DEFAULT_PLAYER_MOVES,
            monster_moves: config::DEFAULT_MONSTER_MOVES,
            sight_radius: config::DEFAULT_SIGHT_RADIUS,
            dark: None,
            timing: AnimationTiming::default(),
            camera_width: 40,
            camera_height: 20,
            dungeon_width: config::DEFAULT_DUNGEON_WIDTH,
            dungeon_height: config::DEFAULT_DUNGEON_HEIGHT,
            monster_count: 6,
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> GloamResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> GloamResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> GloamResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Explicit replacement for process-wide globals.
#[derive(Debug)]
pub struct GameContext {
    pub camera: Camera,
    pub rng: StdRng,
    /// The actor driven by player input, if any
    pub player: Option<ActorId>,
    pub scripts: ScriptRegistry,
    pub config: GameConfig,
}

impl GameContext {
    /// Builds a context with the built-in scripts and a seeded RNG.
    pub fn new(config: GameConfig) -> Self {
        Self {
            camera: Camera::new(config.camera_width, config.camera_height),
            rng: StdRng::seed_from_u64(config.seed),
            player: None,
            scripts: ScriptRegistry::with_builtins(),
            config,
        }
    }

    pub fn timing(&self) -> &AnimationTiming {
        &self.config.timing
    }
}

impl Default for GameContext {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
