//! # Scripts
//!
//! Decision makers for actors that aren't driven by player input. The
//! scheduler asks an actor's script for a [`Decision`] whenever the actor
//! has moves left and nothing queued. Scripts read the world through a
//! [`ScriptContext`] and never mutate it directly; persistent per-actor
//! state goes through [`Decision::SetState`].

pub mod builtin;

pub use builtin::*;

use crate::game::{AbilityId, Actor, ActorId, ActorKind, GameState, Grid, Position};
use crate::utils::{find_path, has_line_of_sight, Connectivity};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// What a script wants its actor to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Step toward the cell; non-adjacent targets are routed with A*
    Move(Position),
    Attack(Position),
    Shoot(Position),
    Interact(Position),
    UseAbility { ability: AbilityId, target: Position },
    /// Stores a script variable and asks again
    SetState { key: String, value: i32 },
    Wait,
}

/// Read-only view of the world for one deciding actor.
pub struct ScriptContext<'a> {
    state: &'a GameState,
    actor: &'a Actor,
}

impl<'a> ScriptContext<'a> {
    /// Returns `None` if the actor doesn't exist.
    pub fn new(state: &'a GameState, id: ActorId) -> Option<Self> {
        let actor = state.actor(id)?;
        Some(Self { state, actor })
    }

    pub fn state(&self) -> &GameState {
        self.state
    }

    pub fn grid(&self) -> &Grid {
        self.state.grid()
    }

    pub fn actor(&self) -> &Actor {
        self.actor
    }

    pub fn position(&self) -> Position {
        self.actor.position()
    }

    /// Next cell toward the level's base, skipping cells held by `avoid`.
    pub fn get_node_downhill(&self, avoid: Option<ActorKind>) -> Option<Position> {
        self.state
            .downhill_map()
            .map(|map| map.downhill(self.grid(), self.position(), avoid))
    }

    pub fn player_position(&self) -> Option<Position> {
        self.state
            .player()
            .and_then(|id| self.state.actor(id))
            .map(Actor::position)
    }

    /// Whether the player is within sight radius and in line of sight.
    pub fn get_player_visible(&self) -> bool {
        self.player_position()
            .is_some_and(|target| self.can_see(target))
    }

    /// Sight test from this actor using its radius, or the default one.
    pub fn can_see(&self, target: Position) -> bool {
        let radius = self
            .actor
            .sight_radius
            .unwrap_or(crate::config::DEFAULT_SIGHT_RADIUS);
        self.position().euclidean_distance(target) <= f64::from(radius)
            && has_line_of_sight(self.grid(), self.position(), target)
    }

    pub fn get_state(&self, key: &str) -> i32 {
        self.actor.get_state(key)
    }

    /// Closest visible actor hostile to this one.
    pub fn nearest_hostile(&self) -> Option<(ActorId, Position)> {
        let own = self.actor.kind();
        self.state
            .actors()
            .iter()
            .filter(|other| {
                own.is_hostile_to(other.kind())
                    && !other.is_pending_deletion()
                    && !other.is_carried()
            })
            .map(|other| (other.id(), other.position()))
            .filter(|&(_, pos)| self.can_see(pos))
            .min_by_key(|&(id, pos)| (self.position().chebyshev_distance(pos), id))
    }

    /// An adjacent hostile, if any.
    pub fn adjacent_hostile(&self) -> Option<Position> {
        let own = self.actor.kind();
        self.position()
            .adjacent_positions()
            .into_iter()
            .find(|&pos| {
                self.grid()
                    .actor_kind_at(pos)
                    .is_some_and(|kind| own.is_hostile_to(kind))
            })
    }

    /// First step of an A* path toward `target`, routing around actors of
    /// this actor's own kind.
    pub fn path_step_toward(&self, target: Position) -> Option<Position> {
        find_path(
            self.grid(),
            self.position(),
            target,
            Some(self.actor.kind()),
            Connectivity::Eight,
        )
        .and_then(|path| path.goto())
    }
}

/// A pluggable decision maker.
pub trait Script: fmt::Debug {
    fn decide(&self, ctx: &ScriptContext<'_>, rng: &mut StdRng) -> Decision;
}

/// Scripts addressed by path-like identifiers such as `"ai/chaser"`.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, Box<dyn Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in script.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("ai/chaser", ChaserScript);
        registry.register("ai/raider", RaiderScript);
        registry.register("ai/wanderer", WandererScript::default());
        registry.register("ai/guard", GuardScript::default());
        registry.register("ai/idle", IdleScript);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, script: impl Script + 'static) {
        self.scripts.insert(name.into(), Box::new(script));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Script> {
        self.scripts.get(name).map(|script| script.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scripts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
