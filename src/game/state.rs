//! # Game State Module
//!
//! Central game state: the grid, the actor arena, the downhill map and the
//! pending event queue.
//!
//! All occupancy changes go through this type. It keeps every actor's
//! position in step with the cell that references it, and
//! [`GameState::check_occupancy`] verifies that invariant.

use crate::config::SPAWN_SEARCH_RADIUS;
use crate::game::ability::resolve_ability;
use crate::game::{
    Action, ActionKind, Actor, ActorArena, ActorHandle, ActorId, ActorKind, EventQueue,
    GameConfig, GameEvent, GameStatistics, Grid, Interaction, Level, MessageImportance, Position,
    SpawnRequest,
};
use crate::utils::{compute_fov, has_line_of_sight, DownhillMap, FovReport};
use crate::{GloamError, GloamResult};
use log::{debug, info, warn};

/// Central game state containing the level and everything on it.
#[derive(Debug, Clone)]
pub struct GameState {
    pub name: String,
    grid: Grid,
    actors: ActorArena,
    events: EventQueue,
    base: Option<Position>,
    downhill: Option<DownhillMap>,
    /// Running totals fed by drained events
    pub statistics: GameStatistics,
}

impl GameState {
    /// Wraps a grid with no actors.
    pub fn new(grid: Grid) -> Self {
        Self {
            name: String::from("unnamed"),
            grid,
            actors: ActorArena::new(),
            events: EventQueue::new(),
            base: None,
            downhill: None,
            statistics: GameStatistics::new(),
        }
    }

    /// Instantiates a built level: applies configuration, spawns its actors
    /// with their default scripts and runs the first sight pass.
    pub fn from_level(level: Level, config: &GameConfig) -> GloamResult<Self> {
        let mut grid = level.grid;
        if let Some(dark) = config.dark {
            grid.set_dark(dark);
        }

        let mut state = Self::new(grid);
        state.name = level.name;
        if let Some(base) = level.base {
            state.set_base(base);
        }

        for spawn in level.spawns {
            let mut request = SpawnRequest::new(spawn.kind, spawn.position);
            match spawn.kind {
                ActorKind::Player => {
                    request = request
                        .with_moves(config.player_moves)
                        .with_sight_radius(Some(config.sight_radius));
                }
                ActorKind::Monster => {
                    request = request.with_moves(config.monster_moves);
                }
                _ => {}
            }
            if let Some(script) = state.default_script(spawn.kind) {
                request = request.with_script(script);
            }
            state.spawn_actor(request)?;
        }

        for id in state.actors.ids() {
            state.refresh_fov(id, true);
        }

        info!(
            "Level '{}' ready with {} actors",
            state.name,
            state.actors.len()
        );
        Ok(state)
    }

    /// Script assigned to spawned actors of `kind`.
    pub fn default_script(&self, kind: ActorKind) -> Option<&'static str> {
        match kind {
            ActorKind::Player | ActorKind::Prop => None,
            ActorKind::Hero => Some("ai/guard"),
            ActorKind::Monster if self.base.is_some() => Some("ai/raider"),
            ActorKind::Monster => Some("ai/chaser"),
            ActorKind::Mount => Some("ai/wanderer"),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Terrain and object access. Occupancy stays private to this type.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn actors(&self) -> &ActorArena {
        &self.actors
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    fn require_actor(&self, id: ActorId) -> GloamResult<&Actor> {
        self.actors.get(id).ok_or(GloamError::UnknownActor(id))
    }

    fn require_actor_mut(&mut self, id: ActorId) -> GloamResult<&mut Actor> {
        self.actors.get_mut(id).ok_or(GloamError::UnknownActor(id))
    }

    /// The lowest-ID player actor.
    pub fn player(&self) -> Option<ActorId> {
        self.actors
            .iter()
            .find(|actor| actor.kind() == ActorKind::Player)
            .map(Actor::id)
    }

    pub fn base(&self) -> Option<Position> {
        self.base
    }

    /// Moves the raid target and rebuilds the downhill map.
    pub fn set_base(&mut self, base: Position) {
        self.base = Some(base);
        self.downhill = Some(DownhillMap::build(&self.grid, base));
    }

    pub fn downhill_map(&self) -> Option<&DownhillMap> {
        self.downhill.as_ref()
    }

    /// Rebuilds the downhill map if walls changed since it was built.
    pub fn rebuild_downhill_if_stale(&mut self) -> bool {
        let Some(map) = &self.downhill else {
            return false;
        };
        if !map.is_stale(&self.grid) {
            return false;
        }
        let source = map.source();
        self.downhill = Some(DownhillMap::build(&self.grid, source));
        true
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Hands every pending event to the caller, updating statistics.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        let events = self.events.drain();
        for event in &events {
            self.statistics.update_from_event(event);
        }
        events
    }

    /// Finds the spawn cell for `requested`: the cell itself when free,
    /// otherwise the first free cell on the nearest ring around it.
    pub fn find_free_cell(&self, requested: Position) -> Option<Position> {
        if !self.grid.is_wall(requested, true) {
            return Some(requested);
        }
        for radius in 1..=SPAWN_SEARCH_RADIUS {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = requested.offset(dx, dy);
                    if !self.grid.is_wall(candidate, true) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Creates an actor at the requested cell or the nearest free one.
    pub fn spawn_actor(&mut self, request: SpawnRequest) -> GloamResult<ActorId> {
        let position = self
            .find_free_cell(request.position)
            .ok_or(GloamError::NoFreeCell(request.position))?;
        let id = self.actors.insert(&request, position);
        self.grid.set_actor(
            position,
            Some(ActorHandle {
                id,
                kind: request.kind,
            }),
        );
        if position != request.position {
            debug!("{} spawned at {:?} instead of {:?}", id, position, request.position);
        }
        self.push_event(GameEvent::ActorPlaced { actor: id, position });
        Ok(id)
    }

    /// Writes `id` into the cell at `pos` and updates the actor's position.
    ///
    /// The previous cell is left untouched: callers clear it first with
    /// [`GameState::clear_actor`]. Prefer [`GameState::move_actor`], which
    /// does both.
    pub fn set_actor(&mut self, id: ActorId, pos: Position) -> GloamResult<()> {
        let kind = self.require_actor(id)?.kind();
        match self.grid.actor_at(pos) {
            Some(other) if other != id => {
                return Err(GloamError::InvalidAction(format!(
                    "{:?} is occupied by {}",
                    pos, other
                )))
            }
            _ => {}
        }
        if !self.grid.set_actor(pos, Some(ActorHandle { id, kind })) {
            return Err(GloamError::InvalidAction(format!("{:?} is outside the grid", pos)));
        }
        let actor = self.require_actor_mut(id)?;
        actor.position = pos;
        let mount = actor.mount;
        if let Some(mount) = mount.and_then(|m| self.actors.get_mut(m)) {
            mount.position = pos;
        }
        Ok(())
    }

    /// Empties a cell's occupancy. Returns the actor that was there.
    pub fn clear_actor(&mut self, pos: Position) -> Option<ActorId> {
        let previous = self.grid.actor_at(pos);
        self.grid.set_actor(pos, None);
        previous
    }

    /// Moves an actor: clears its old cell, then occupies `to`.
    pub fn move_actor(&mut self, id: ActorId, to: Position) -> GloamResult<()> {
        let from = self.require_actor(id)?.position();
        if from == to {
            return Ok(());
        }
        if !self.grid.contains(to) {
            return Err(GloamError::InvalidAction(format!("{:?} is outside the grid", to)));
        }
        if let Some(other) = self.grid.actor_at(to) {
            return Err(GloamError::InvalidAction(format!(
                "{:?} is occupied by {}",
                to, other
            )));
        }

        if self.grid.actor_at(from) == Some(id) {
            self.clear_actor(from);
        }
        self.set_actor(id, to)?;
        self.push_event(GameEvent::ActorMoved { actor: id, from, to });
        Ok(())
    }

    /// Removes an actor immediately: frees its cell and unlinks any
    /// mount or rider. A rider's mount is put back on the grid.
    pub fn erase_actor(&mut self, id: ActorId) -> Option<Actor> {
        let actor = self.actors.remove(id)?;
        if self.grid.actor_at(actor.position()) == Some(id) {
            self.clear_actor(actor.position());
            self.push_event(GameEvent::ActorRemoved {
                actor: id,
                position: actor.position(),
            });
        }

        if let Some(rider) = actor.rider.and_then(|r| self.actors.get_mut(r)) {
            rider.mount = None;
        }
        if let Some(mount_id) = actor.mount {
            if let Some(mount) = self.actors.get_mut(mount_id) {
                mount.rider = None;
            }
            if self.actors.contains(mount_id) {
                if let Some(cell) = self.find_free_cell(actor.position()) {
                    match self.set_actor(mount_id, cell) {
                        Ok(()) => self.push_event(GameEvent::ActorPlaced {
                            actor: mount_id,
                            position: cell,
                        }),
                        Err(err) => warn!("Could not return {} to the grid: {}", mount_id, err),
                    }
                } else {
                    warn!("No room for {} after its rider left; removing it", mount_id);
                    self.actors.remove(mount_id);
                }
            }
        }

        debug!("Erased {} ({:?})", id, actor.kind());
        Some(actor)
    }

    /// Flags an actor for removal at the scheduler's next sweep.
    pub fn mark_for_deletion(&mut self, id: ActorId) {
        if let Some(actor) = self.actors.get_mut(id) {
            actor.pending_deletion = true;
        }
    }

    /// Sweeps one pending actor. Returns false if it wasn't pending.
    pub fn sweep(&mut self, id: ActorId) -> bool {
        let pending = self.actors.get(id).is_some_and(Actor::is_pending_deletion);
        if !pending {
            return false;
        }
        let kind = self.erase_actor(id).map(|actor| actor.kind());
        if kind == Some(ActorKind::Monster) && self.monsters_remaining() == 0 {
            info!("Level '{}' cleared", self.name);
            self.push_event(GameEvent::LevelCleared);
        }
        true
    }

    /// Sweeps every pending actor. Returns the removed IDs.
    pub fn sweep_pending(&mut self) -> Vec<ActorId> {
        let pending: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|actor| actor.is_pending_deletion())
            .map(Actor::id)
            .collect();
        pending.into_iter().filter(|&id| self.sweep(id)).collect()
    }

    /// Live monsters not awaiting deletion.
    pub fn monsters_remaining(&self) -> usize {
        self.actors
            .iter()
            .filter(|actor| actor.kind() == ActorKind::Monster && !actor.is_pending_deletion())
            .count()
    }

    /// Applies damage. Returns true if this killed the actor.
    pub fn damage_actor(
        &mut self,
        id: ActorId,
        amount: i32,
        source: Option<ActorId>,
    ) -> GloamResult<bool> {
        let actor = self.require_actor_mut(id)?;
        if actor.is_pending_deletion() {
            return Ok(false);
        }
        actor.health.reduce(amount);
        let died = !actor.is_alive();
        let kind = actor.kind();
        let position = actor.position();

        self.push_event(GameEvent::ActorDamaged {
            actor: id,
            damage: amount,
            source,
        });
        if died {
            self.push_event(GameEvent::ActorDied {
                actor: id,
                kind,
                position,
                killer: source,
            });
            self.push_event(GameEvent::message(
                format!("{:?} {} dies", kind, id),
                if kind == ActorKind::Player {
                    MessageImportance::Critical
                } else {
                    MessageImportance::Normal
                },
            ));
            self.mark_for_deletion(id);
        }
        Ok(died)
    }

    /// Restores health up to the maximum. Returns the amount healed.
    pub fn heal_actor(&mut self, id: ActorId, amount: i32) -> GloamResult<i32> {
        let actor = self.require_actor_mut(id)?;
        Ok(actor.health.fill(amount))
    }

    /// Damages whatever stands at `pos`: an actor, or failing that a
    /// breakable object. Returns false when nothing was hit.
    pub fn damage_at(
        &mut self,
        pos: Position,
        amount: i32,
        source: Option<ActorId>,
    ) -> GloamResult<bool> {
        if let Some(victim) = self.grid.actor_at(pos) {
            self.damage_actor(victim, amount, source)?;
            return Ok(true);
        }
        let Some(object_id) = self.grid.object_at(pos).map(|o| o.id()) else {
            return Ok(false);
        };
        let destroyed = self
            .grid
            .object_mut(object_id)
            .is_some_and(|object| object.take_damage(amount));
        if destroyed {
            self.grid.erase_object(object_id);
            self.push_event(GameEvent::ObjectDestroyed {
                object: object_id,
                position: pos,
            });
            self.push_event(GameEvent::message(
                format!("{} is smashed", object_id),
                MessageImportance::Normal,
            ));
        }
        Ok(true)
    }

    /// Interacts with the object at `pos`, or mounts a mount standing there.
    pub fn interact(&mut self, id: ActorId, pos: Position) -> GloamResult<Interaction> {
        let origin = self.require_actor(id)?.position();
        if origin != pos && !origin.is_adjacent(pos) {
            return Err(GloamError::InvalidAction(format!(
                "{} cannot reach {:?}",
                id, pos
            )));
        }

        if let Some(other) = self.grid.actor_at(pos) {
            if other != id && self.actor(other).is_some_and(|a| a.kind() == ActorKind::Mount) {
                self.mount(id, other)?;
                return Ok(Interaction::Mounted);
            }
        }

        let Some(object_id) = self.grid.object_at(pos).map(|o| o.id()) else {
            return Ok(Interaction::Nothing);
        };
        let Some(object) = self.grid.object_mut(object_id) else {
            return Ok(Interaction::Nothing);
        };
        let outcome = object.interact();
        if outcome == Interaction::Looted {
            self.grid.erase_object(object_id);
        }
        self.push_event(GameEvent::ObjectInteracted {
            actor: id,
            object: object_id,
            position: pos,
            outcome,
        });

        if matches!(outcome, Interaction::Opened | Interaction::Closed) {
            // A door changed what can be seen.
            let viewers: Vec<ActorId> = self
                .actors
                .iter()
                .filter(|a| a.kind().is_player_side())
                .map(Actor::id)
                .collect();
            for viewer in viewers {
                self.refresh_fov(viewer, true);
            }
        }
        Ok(outcome)
    }

    /// Puts `rider` on an adjacent mount. The mount leaves the grid and the
    /// rider takes its cell.
    pub fn mount(&mut self, rider: ActorId, mount: ActorId) -> GloamResult<()> {
        let rider_actor = self.require_actor(rider)?;
        let mount_actor = self.require_actor(mount)?;
        if mount_actor.kind() != ActorKind::Mount {
            return Err(GloamError::InvalidAction(format!("{} is not a mount", mount)));
        }
        if rider_actor.mount.is_some() || rider_actor.rider.is_some() || mount_actor.rider.is_some() {
            return Err(GloamError::InvalidAction(format!(
                "{} cannot mount {}",
                rider, mount
            )));
        }
        let from = rider_actor.position();
        let to = mount_actor.position();
        if !from.is_adjacent(to) {
            return Err(GloamError::InvalidAction(format!("{} is not next to {}", mount, rider)));
        }

        self.clear_actor(to);
        self.clear_actor(from);
        self.require_actor_mut(rider)?.mount = Some(mount);
        {
            let mount_actor = self.require_actor_mut(mount)?;
            mount_actor.rider = Some(rider);
            mount_actor.clear_actions();
            mount_actor.clear_path();
        }
        self.set_actor(rider, to)?;
        self.push_event(GameEvent::ActorMoved {
            actor: rider,
            from,
            to,
        });
        Ok(())
    }

    /// Drops the rider's mount onto a free neighbouring cell.
    pub fn dismount(&mut self, rider: ActorId) -> GloamResult<Position> {
        let rider_actor = self.require_actor(rider)?;
        let mount = rider_actor
            .mount
            .ok_or_else(|| GloamError::InvalidAction(format!("{} is not riding", rider)))?;
        let origin = rider_actor.position();
        let cell = origin
            .adjacent_positions()
            .into_iter()
            .find(|&pos| !self.grid.is_wall(pos, true))
            .ok_or(GloamError::NoFreeCell(origin))?;

        self.require_actor_mut(rider)?.mount = None;
        self.require_actor_mut(mount)?.rider = None;
        self.set_actor(mount, cell)?;
        self.push_event(GameEvent::ActorPlaced {
            actor: mount,
            position: cell,
        });
        Ok(cell)
    }

    /// Recomputes sight for a player-side actor and reports revealed cells.
    pub fn refresh_fov(&mut self, id: ActorId, force: bool) -> FovReport {
        let Some(actor) = self.actors.get(id) else {
            return FovReport::default();
        };
        let (Some(radius), true) = (actor.sight_radius, actor.kind().is_player_side()) else {
            return FovReport::default();
        };
        let report = compute_fov(&mut self.grid, actor.position(), radius, force);
        if !report.changed.is_empty() {
            self.push_event(GameEvent::CellsRevealed {
                cells: report.changed.clone(),
            });
        }
        report
    }

    /// Fires an action's effect. Returns false when the action failed, for
    /// example a move into an occupied cell.
    pub fn resolve_action(&mut self, id: ActorId, action: Action) -> GloamResult<bool> {
        let origin = self.require_actor(id)?.position();
        let target = action.target;

        match action.kind {
            ActionKind::Move => {
                if !origin.is_adjacent(target) || self.grid.is_wall(target, true) {
                    debug!("{} could not move to {:?}", id, target);
                    return Ok(false);
                }
                self.move_actor(id, target)?;
                Ok(true)
            }
            ActionKind::Attack => {
                if !origin.is_adjacent(target) {
                    return Ok(false);
                }
                self.damage_at(target, action.value, Some(id))
            }
            ActionKind::Shoot => {
                if origin == target || !has_line_of_sight(&self.grid, origin, target) {
                    return Ok(false);
                }
                self.damage_at(target, action.value, Some(id))
            }
            ActionKind::Interact => match self.interact(id, target) {
                Ok(outcome) => Ok(outcome != Interaction::Nothing),
                Err(GloamError::InvalidAction(reason)) => {
                    debug!("{} interaction failed: {}", id, reason);
                    Ok(false)
                }
                Err(err) => Err(err),
            },
            ActionKind::UseAbility(ability) => resolve_ability(self, id, ability, target),
            ActionKind::Wait => Ok(true),
        }
    }

    /// Verifies the occupancy invariant: every on-grid actor sits in the
    /// cell that references it, and every cell handle resolves to an actor
    /// standing there.
    pub fn check_occupancy(&self) -> GloamResult<()> {
        let mut on_grid = 0;
        for actor in self.actors.iter() {
            if let Some(rider) = actor.rider() {
                let rider_pos = self.actor(rider).map(Actor::position);
                if rider_pos != Some(actor.position()) {
                    return Err(GloamError::InvalidState(format!(
                        "{} is carried by {} but sits at {:?}",
                        actor.id(),
                        rider,
                        actor.position()
                    )));
                }
                if self.grid.actor_at(actor.position()) == Some(actor.id()) {
                    return Err(GloamError::InvalidState(format!(
                        "carried {} still occupies a cell",
                        actor.id()
                    )));
                }
                continue;
            }
            on_grid += 1;
            let cell = self.grid.cell(actor.position()).and_then(|c| c.actor());
            match cell {
                Some(handle) if handle.id == actor.id() && handle.kind == actor.kind() => {}
                other => {
                    return Err(GloamError::InvalidState(format!(
                        "{} at {:?} but the cell holds {:?}",
                        actor.id(),
                        actor.position(),
                        other
                    )))
                }
            }
        }

        let handles = self
            .grid
            .positions()
            .filter(|&pos| self.grid.actor_at(pos).is_some())
            .count();
        if handles != on_grid {
            return Err(GloamError::InvalidState(format!(
                "{} cell handles for {} placed actors",
                handles, on_grid
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{LevelDescription, ObjectKind, WallKind};

    fn open_state() -> GameState {
        GameState::new(Grid::new(10, 10).unwrap())
    }

    #[test]
    fn test_spawn_finds_free_neighbour() {
        let mut state = open_state();
        let first = state
            .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(5, 5)))
            .unwrap();
        let second = state
            .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(5, 5)))
            .unwrap();
        assert_eq!(state.actor(first).unwrap().position(), Position::new(5, 5));
        let second_pos = state.actor(second).unwrap().position();
        assert!(second_pos.is_adjacent(Position::new(5, 5)));
        state.check_occupancy().unwrap();
    }

    #[test]
    fn test_spawn_fails_without_room() {
        let mut state = GameState::new(Grid::filled(9, 9, WallKind::Stone).unwrap());
        let result = state.spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(4, 4)));
        assert!(matches!(result, Err(GloamError::NoFreeCell(_))));
    }

    #[test]
    fn test_move_keeps_cells_in_step() {
        let mut state = open_state();
        let id = state
            .spawn_actor(SpawnRequest::new(ActorKind::Player, Position::new(1, 1)))
            .unwrap();
        state.move_actor(id, Position::new(2, 2)).unwrap();
        assert!(state.grid().actor_at(Position::new(1, 1)).is_none());
        assert_eq!(state.grid().actor_at(Position::new(2, 2)), Some(id));
        assert!(matches!(
            state.events().iter().last(),
            Some(GameEvent::ActorMoved { .. })
        ));
        state.check_occupancy().unwrap();
    }

    #[test]
    fn test_move_into_occupied_cell_is_an_error() {
        let mut state = open_state();
        let mover = state
            .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(1, 1)))
            .unwrap();
        let other = state
            .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(2, 1)))
            .unwrap();

        let result = state.move_actor(mover, Position::new(2, 1));
        assert!(matches!(result, Err(GloamError::InvalidAction(_))));
        assert_eq!(state.actor(mover).unwrap().position(), Position::new(1, 1));
        assert_eq!(state.grid().actor_at(Position::new(2, 1)), Some(other));
        state.check_occupancy().unwrap();
    }

    #[test]
    fn test_set_without_clear_breaks_invariant() {
        let mut state = open_state();
        let id = state
            .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(1, 1)))
            .unwrap();
        state.set_actor(id, Position::new(3, 1)).unwrap();
        assert!(state.check_occupancy().is_err());

        state.clear_actor(Position::new(1, 1));
        state.check_occupancy().unwrap();
    }

    #[test]
    fn test_set_actor_refuses_occupied_cell() {
        let mut state = open_state();
        let a = state
            .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(1, 1)))
            .unwrap();
        state
            .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(2, 1)))
            .unwrap();
        assert!(state.set_actor(a, Position::new(2, 1)).is_err());
        assert!(state.set_actor(a, Position::new(-1, 1)).is_err());
    }

    #[test]
    fn test_death_is_deferred_until_sweep() {
        let mut state = open_state();
        let id = state
            .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(4, 4)))
            .unwrap();
        assert!(state.damage_actor(id, 100, None).unwrap());
        assert!(state.actor(id).unwrap().is_pending_deletion());
        assert_eq!(state.grid().actor_at(Position::new(4, 4)), Some(id));
        assert_eq!(state.monsters_remaining(), 0);

        assert_eq!(state.sweep_pending(), vec![id]);
        assert!(state.actor(id).is_none());
        assert!(state.grid().actor_at(Position::new(4, 4)).is_none());
        assert!(state.events().iter().any(|e| *e == GameEvent::LevelCleared));
    }

    #[test]
    fn test_unknown_actor_errors() {
        let mut state = open_state();
        assert!(matches!(
            state.damage_actor(ActorId(42), 1, None),
            Err(GloamError::UnknownActor(ActorId(42)))
        ));
        assert!(state.move_actor(ActorId(42), Position::new(1, 1)).is_err());
    }

    #[test]
    fn test_mount_and_dismount() {
        let mut state = open_state();
        let rider = state
            .spawn_actor(SpawnRequest::new(ActorKind::Player, Position::new(4, 4)))
            .unwrap();
        let horse = state
            .spawn_actor(SpawnRequest::new(ActorKind::Mount, Position::new(5, 4)))
            .unwrap();

        state.mount(rider, horse).unwrap();
        assert_eq!(state.actor(rider).unwrap().position(), Position::new(5, 4));
        assert_eq!(state.actor(horse).unwrap().position(), Position::new(5, 4));
        assert_eq!(state.actor(horse).unwrap().rider(), Some(rider));
        assert!(state.grid().actor_at(Position::new(4, 4)).is_none());
        state.check_occupancy().unwrap();

        state.move_actor(rider, Position::new(6, 5)).unwrap();
        assert_eq!(state.actor(horse).unwrap().position(), Position::new(6, 5));
        state.check_occupancy().unwrap();

        let dropped = state.dismount(rider).unwrap();
        assert!(dropped.is_adjacent(Position::new(6, 5)));
        assert_eq!(state.grid().actor_at(dropped), Some(horse));
        assert!(state.actor(horse).unwrap().rider().is_none());
        state.check_occupancy().unwrap();
    }

    #[test]
    fn test_erasing_rider_frees_mount() {
        let mut state = open_state();
        let rider = state
            .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(4, 4)))
            .unwrap();
        let horse = state
            .spawn_actor(SpawnRequest::new(ActorKind::Mount, Position::new(4, 5)))
            .unwrap();
        state.mount(rider, horse).unwrap();
        state.erase_actor(rider).unwrap();

        assert_eq!(state.grid().actor_at(Position::new(4, 5)), Some(horse));
        assert!(state.actor(horse).unwrap().rider().is_none());
        state.check_occupancy().unwrap();
    }

    #[test]
    fn test_door_interaction_and_chest_looting() {
        let mut state = open_state();
        let id = state
            .spawn_actor(SpawnRequest::new(ActorKind::Player, Position::new(1, 1)))
            .unwrap();
        state
            .grid_mut()
            .set_object(Position::new(2, 1), ObjectKind::Door { open: false })
            .unwrap();
        state
            .grid_mut()
            .set_object(Position::new(1, 2), ObjectKind::Chest)
            .unwrap();

        assert!(!state.resolve_action(id, Action::move_to(Position::new(2, 1))).unwrap());
        assert_eq!(state.interact(id, Position::new(2, 1)).unwrap(), Interaction::Opened);
        assert!(state.resolve_action(id, Action::move_to(Position::new(2, 1))).unwrap());

        assert_eq!(state.interact(id, Position::new(1, 2)).unwrap(), Interaction::Looted);
        assert!(state.grid().object_at(Position::new(1, 2)).is_none());
        assert!(state.interact(id, Position::new(8, 8)).is_err());
    }

    #[test]
    fn test_attacks_break_barrels() {
        let mut state = open_state();
        let id = state
            .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(1, 1)))
            .unwrap();
        state
            .grid_mut()
            .set_object(Position::new(2, 2), ObjectKind::Barrel)
            .unwrap();
        assert!(state.resolve_action(id, Action::attack(Position::new(2, 2), 2)).unwrap());
        assert!(state.grid().object_at(Position::new(2, 2)).is_some());
        assert!(state.resolve_action(id, Action::attack(Position::new(2, 2), 2)).unwrap());
        assert!(state.grid().object_at(Position::new(2, 2)).is_none());
        assert!(!state.resolve_action(id, Action::attack(Position::new(2, 2), 2)).unwrap());
    }

    #[test]
    fn test_from_level_assigns_scripts_and_sight() {
        let text = "base = 8,1\n[terrain]\n..........\n..........\n[entities]\n.@...m....\n..h.M.....\n";
        let level: LevelDescription = text.parse().unwrap();
        let state = GameState::from_level(level.build().unwrap(), &GameConfig::default()).unwrap();

        let player = state.player().unwrap();
        assert!(state.actor(player).unwrap().script.is_none());
        let scripts: Vec<_> = state
            .actors()
            .iter()
            .map(|a| (a.kind(), a.script.clone()))
            .collect();
        assert!(scripts.contains(&(ActorKind::Monster, Some("ai/raider".to_string()))));
        assert!(scripts.contains(&(ActorKind::Hero, Some("ai/guard".to_string()))));
        assert!(scripts.contains(&(ActorKind::Mount, Some("ai/wanderer".to_string()))));
        assert!(state.grid().is_discovered(Position::new(4, 1)));
        assert_eq!(state.downhill_map().unwrap().distance(Position::new(8, 1)), Some(0));
    }

    #[test]
    fn test_downhill_rebuild_on_topology_change() {
        let mut state = open_state();
        state.set_base(Position::new(0, 0));
        assert!(!state.rebuild_downhill_if_stale());
        state.grid_mut().set_wall(Position::new(1, 1), WallKind::Stone);
        assert!(state.rebuild_downhill_if_stale());
        assert_eq!(state.downhill_map().unwrap().distance(Position::new(1, 1)), None);
    }
}
