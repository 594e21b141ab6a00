//! # Actors
//!
//! Turn-taking entities and the arena that owns them.
//!
//! The arena is the only owner of actor data. Grid cells and mount/rider
//! links hold plain [`ActorId`] handles, so there are no ownership cycles;
//! consistency between the two sides is checked by
//! [`crate::GameState::check_occupancy`].

use crate::config;
use crate::game::{AbilityId, Action, ActiveAction, ActorId, Position};
use crate::utils::Path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Broad category of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    Hero,
    Monster,
    Mount,
    Prop,
}

impl ActorKind {
    /// Player and heroes fight on the same side.
    pub fn is_player_side(self) -> bool {
        matches!(self, ActorKind::Player | ActorKind::Hero)
    }

    /// Whether two kinds attack each other.
    pub fn is_hostile_to(self, other: ActorKind) -> bool {
        match (self, other) {
            (ActorKind::Monster, other) => other.is_player_side(),
            (this, ActorKind::Monster) => this.is_player_side(),
            _ => false,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            ActorKind::Player => '@',
            ActorKind::Hero => 'h',
            ActorKind::Monster => 'm',
            ActorKind::Mount => 'M',
            ActorKind::Prop => 'p',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '@' => Some(ActorKind::Player),
            'h' => Some(ActorKind::Hero),
            'm' => Some(ActorKind::Monster),
            'M' => Some(ActorKind::Mount),
            'p' => Some(ActorKind::Prop),
            _ => None,
        }
    }
}

/// A bounded `(current, max)` resource such as health or moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub current: i32,
    pub max: i32,
}

impl Pool {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_empty(&self) -> bool {
        self.current < 1
    }

    pub fn restore(&mut self) {
        self.current = self.max;
    }

    /// Spends `amount` if available.
    pub fn spend(&mut self, amount: i32) -> bool {
        if self.current >= amount {
            self.current -= amount;
            true
        } else {
            false
        }
    }

    pub fn drain(&mut self) {
        self.current = 0;
    }

    pub fn reduce(&mut self, amount: i32) {
        self.current -= amount;
    }

    /// Adds up to `max`; returns the amount actually added.
    pub fn fill(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        self.current - before
    }
}

/// Where an actor is in its action cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorPhase {
    Idle,
    ActionQueued,
    Animating,
}

/// Timed effects ticked at end of turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Poison,
    Regeneration,
    /// Removes one move per turn while active
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub turns: u32,
    pub magnitude: i32,
}

/// Net outcome of ticking statuses at end of turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTick {
    pub damage: i32,
    pub healing: i32,
}

/// A turn-taking entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    id: ActorId,
    kind: ActorKind,
    pub(crate) position: Position,
    /// Continuous position for smooth rendering
    pub render_pos: (f32, f32),
    pub(crate) current: Option<ActiveAction>,
    pub(crate) queue: VecDeque<Action>,
    pub moves: Pool,
    pub health: Pool,
    /// Damage dealt by plain attacks
    pub attack_power: i32,
    pub sight_radius: Option<u8>,
    abilities: BTreeSet<AbilityId>,
    cooldowns: BTreeMap<AbilityId, u32>,
    pub statuses: Vec<StatusEffect>,
    /// Identifier of the decision script, if any
    pub script: Option<String>,
    vars: BTreeMap<String, i32>,
    pub(crate) path: Option<Path>,
    pub(crate) auto_walk: bool,
    activated: Option<AbilityId>,
    pub(crate) mount: Option<ActorId>,
    pub(crate) rider: Option<ActorId>,
    pub(crate) pending_deletion: bool,
    pub(crate) turn_over: bool,
}

impl Actor {
    fn from_request(id: ActorId, request: &SpawnRequest, position: Position) -> Self {
        Self {
            id,
            kind: request.kind,
            position,
            render_pos: (position.x as f32, position.y as f32),
            current: None,
            queue: VecDeque::new(),
            moves: Pool::new(request.moves),
            health: Pool::new(request.health),
            attack_power: request.attack_power,
            sight_radius: request.sight_radius,
            abilities: request.abilities.iter().copied().collect(),
            cooldowns: BTreeMap::new(),
            statuses: Vec::new(),
            script: request.script.clone(),
            vars: BTreeMap::new(),
            path: None,
            auto_walk: false,
            activated: None,
            mount: None,
            rider: None,
            pending_deletion: false,
            turn_over: false,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    /// Grid position. Written only through [`crate::GameState`].
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_empty()
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.pending_deletion
    }

    /// Driven by player input rather than a script.
    pub fn is_player_controlled(&self) -> bool {
        self.kind == ActorKind::Player && self.script.is_none()
    }

    pub fn phase(&self) -> ActorPhase {
        if self.current.is_some() {
            ActorPhase::Animating
        } else if !self.queue.is_empty() {
            ActorPhase::ActionQueued
        } else {
            ActorPhase::Idle
        }
    }

    pub fn current_action(&self) -> Option<&ActiveAction> {
        self.current.as_ref()
    }

    pub fn queued_actions(&self) -> impl Iterator<Item = &Action> {
        self.queue.iter()
    }

    pub fn queue_action(&mut self, action: Action) {
        self.queue.push_back(action);
    }

    pub fn clear_actions(&mut self) {
        self.queue.clear();
    }

    pub fn is_turn_over(&self) -> bool {
        self.turn_over
    }

    /// Gives up the rest of the turn once the queue drains.
    pub fn end_turn_early(&mut self) {
        self.turn_over = true;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn set_path(&mut self, path: Path) {
        self.path = Some(path);
        self.auto_walk = false;
    }

    pub fn clear_path(&mut self) {
        self.path = None;
        self.auto_walk = false;
    }

    /// Starts following the stored path. Returns false without one.
    pub fn start_auto_walk(&mut self) -> bool {
        self.auto_walk = self.path.as_ref().is_some_and(|path| !path.is_empty());
        self.auto_walk
    }

    pub fn is_auto_walking(&self) -> bool {
        self.auto_walk
    }

    pub fn mount(&self) -> Option<ActorId> {
        self.mount
    }

    pub fn rider(&self) -> Option<ActorId> {
        self.rider
    }

    /// A mount carrying a rider is off the grid.
    pub fn is_carried(&self) -> bool {
        self.rider.is_some()
    }

    pub fn abilities(&self) -> impl Iterator<Item = AbilityId> + '_ {
        self.abilities.iter().copied()
    }

    pub fn knows(&self, ability: AbilityId) -> bool {
        self.abilities.contains(&ability)
    }

    pub fn learn(&mut self, ability: AbilityId) {
        self.abilities.insert(ability);
    }

    pub fn cooldown(&self, ability: AbilityId) -> u32 {
        self.cooldowns.get(&ability).copied().unwrap_or(0)
    }

    pub(crate) fn start_cooldown(&mut self, ability: AbilityId) {
        let turns = ability.info().cooldown;
        if turns > 0 {
            self.cooldowns.insert(ability, turns);
        }
    }

    /// The ability awaiting a target, if any.
    pub fn activated(&self) -> Option<AbilityId> {
        self.activated
    }

    /// Arms an ability for targeting. Fails if unknown or cooling down.
    pub fn activate_ability(&mut self, ability: AbilityId) -> bool {
        if !self.knows(ability) || self.cooldown(ability) > 0 {
            return false;
        }
        self.activated = Some(ability);
        true
    }

    pub fn cancel_ability(&mut self) {
        self.activated = None;
    }

    pub fn get_state(&self, key: &str) -> i32 {
        self.vars.get(key).copied().unwrap_or(0)
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: i32) {
        self.vars.insert(key.into(), value);
    }

    pub fn add_status(&mut self, status: StatusEffect) {
        self.statuses.push(status);
    }

    /// Resets per-turn resources.
    pub(crate) fn start_turn(&mut self) {
        self.moves.restore();
        let slowed = self
            .statuses
            .iter()
            .any(|status| status.kind == StatusKind::Slow);
        if slowed && self.moves.max > 1 {
            self.moves.reduce(1);
        }
        self.turn_over = false;
    }

    /// Ticks statuses and cooldowns. Health changes are reported, not
    /// applied, so the caller can route damage through the usual death
    /// handling.
    pub(crate) fn end_turn(&mut self) -> StatusTick {
        let mut tick = StatusTick::default();
        for status in &mut self.statuses {
            match status.kind {
                StatusKind::Poison => tick.damage += status.magnitude,
                StatusKind::Regeneration => tick.healing += status.magnitude,
                StatusKind::Slow => {}
            }
            status.turns = status.turns.saturating_sub(1);
        }
        self.statuses.retain(|status| status.turns > 0);

        for turns in self.cooldowns.values_mut() {
            *turns = turns.saturating_sub(1);
        }
        self.cooldowns.retain(|_, turns| *turns > 0);
        self.turn_over = false;
        tick
    }

    /// Eases the render position toward the grid position.
    pub fn update_render_position(&mut self, progress: f32) {
        let target = (self.position.x as f32, self.position.y as f32);
        let origin = self
            .current
            .as_ref()
            .map(|active| (active.origin.x as f32, active.origin.y as f32))
            .unwrap_or(target);
        let t = progress.clamp(0.0, 1.0);
        self.render_pos = (
            origin.0 + (target.0 - origin.0) * t,
            origin.1 + (target.1 - origin.1) * t,
        );
    }
}

/// Parameters for spawning an actor.
///
/// # Examples
///
/// ```
/// use gloam::{ActorKind, Position, SpawnRequest};
///
/// let request = SpawnRequest::new(ActorKind::Monster, Position::new(3, 4))
///     .with_script("ai/chaser")
///     .with_health(12);
/// assert_eq!(request.health, 12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub kind: ActorKind,
    pub position: Position,
    pub health: i32,
    pub moves: i32,
    pub attack_power: i32,
    pub sight_radius: Option<u8>,
    pub script: Option<String>,
    pub abilities: Vec<AbilityId>,
}

impl SpawnRequest {
    /// Creates a request with per-kind defaults.
    pub fn new(kind: ActorKind, position: Position) -> Self {
        let (health, moves, attack_power, sight_radius) = match kind {
            ActorKind::Player => (
                config::DEFAULT_PLAYER_HEALTH,
                config::DEFAULT_PLAYER_MOVES,
                3,
                Some(config::DEFAULT_SIGHT_RADIUS),
            ),
            ActorKind::Hero => (20, 1, 3, Some(config::DEFAULT_SIGHT_RADIUS)),
            ActorKind::Monster => (
                config::DEFAULT_MONSTER_HEALTH,
                config::DEFAULT_MONSTER_MOVES,
                2,
                Some(6),
            ),
            ActorKind::Mount => (15, 2, 1, None),
            ActorKind::Prop => (1, 0, 0, None),
        };
        Self {
            kind,
            position,
            health,
            moves,
            attack_power,
            sight_radius,
            script: None,
            abilities: Vec::new(),
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_health(mut self, health: i32) -> Self {
        self.health = health;
        self
    }

    pub fn with_moves(mut self, moves: i32) -> Self {
        self.moves = moves;
        self
    }

    pub fn with_attack_power(mut self, attack_power: i32) -> Self {
        self.attack_power = attack_power;
        self
    }

    pub fn with_sight_radius(mut self, radius: Option<u8>) -> Self {
        self.sight_radius = radius;
        self
    }

    pub fn with_abilities(mut self, abilities: &[AbilityId]) -> Self {
        self.abilities.extend_from_slice(abilities);
        self
    }
}

/// Owner of all actors, keyed by monotonic ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorArena {
    actors: BTreeMap<ActorId, Actor>,
    next_id: u32,
}

impl ActorArena {
    pub fn new() -> Self {
        Self {
            actors: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn insert(&mut self, request: &SpawnRequest, position: Position) -> ActorId {
        // Default-constructed arenas start at zero; IDs start at one.
        self.next_id = self.next_id.max(1);
        let id = ActorId(self.next_id);
        self.next_id += 1;
        self.actors.insert(id, Actor::from_request(id, request, position));
        id
    }

    pub(crate) fn remove(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Actors in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    /// IDs strictly greater than `id`, ascending.
    pub fn ids_after(&self, id: ActorId) -> Vec<ActorId> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.actors
            .range((Excluded(id), Unbounded))
            .map(|(id, _)| *id)
            .collect()
    }
}
