//! # Turn Scheduler
//!
//! Decides whose turn it is and advances that actor's queued actions once
//! per frame.
//!
//! Each actor moves through `Idle -> ActionQueued -> Animating -> Idle`.
//! The active actor is polled every frame. When it has drained its queue,
//! has nothing in flight and its turn is over, the scheduler ends its turn
//! and activates the lowest ID greater than the current one. When there is
//! none the scheduler wraps to the lowest ID and starts a new round.
//!
//! Removal is two-phase: actors are flagged with
//! [`GameState::mark_for_deletion`] and swept when selection reaches them,
//! or at the latest when the round wraps.
//!
//! There is no watchdog. An actor that never ends its turn (a player who
//! never presses a key, for instance) holds the cycle indefinitely.

use crate::game::{
    Action, ActiveAction, ActorId, ActorKind, AnimationStatus, GameContext,
    GameEvent, GameState,
};
use crate::script::{Decision, ScriptContext};
use crate::utils::{find_path, Connectivity};
use crate::GloamResult;
use log::{debug, trace, warn};

/// Upper bound on instant steps (zero-frame actions, state changes)
/// processed for one actor within a single frame.
pub const MAX_STEPS_PER_FRAME: usize = 32;

/// What happened during one [`TurnScheduler::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Actor active after the frame
    pub active: Option<ActorId>,
    pub turn_ended: bool,
    pub new_round: bool,
}

/// Frame-driven, ID-ordered turn scheduler.
#[derive(Debug, Clone, Default)]
pub struct TurnScheduler {
    active: Option<ActorId>,
    round: u64,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<ActorId> {
        self.active
    }

    /// Rounds started so far; the first round is 1.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Activates the lowest-ID actor and opens round 1.
    pub fn start(&mut self, state: &mut GameState, ctx: &mut GameContext) {
        state.sweep_pending();
        self.round = self.round.max(1);
        self.active = state.actors().ids().into_iter().next();
        if let Some(id) = self.active {
            self.start_turn(state, ctx, id);
        }
    }

    /// Runs one frame.
    pub fn update(
        &mut self,
        state: &mut GameState,
        ctx: &mut GameContext,
        dt: f32,
    ) -> GloamResult<FrameReport> {
        if self.active.is_none() {
            self.start(state, ctx);
        }
        let Some(active) = self.active else {
            return Ok(FrameReport::default());
        };

        let mut report = FrameReport {
            active: Some(active),
            ..FrameReport::default()
        };
        if self.take_turn(state, ctx, active, dt)? {
            self.end_turn(state, active)?;
            report.new_round = self.select_next(state, ctx, active);
            report.turn_ended = true;
            report.active = self.active;
        }
        Ok(report)
    }

    /// Polls the active actor. Returns true once its turn is done.
    fn take_turn(
        &mut self,
        state: &mut GameState,
        ctx: &mut GameContext,
        id: ActorId,
        dt: f32,
    ) -> GloamResult<bool> {
        let mut dt = dt;
        let mut animated = false;

        for _ in 0..MAX_STEPS_PER_FRAME {
            let Some(actor) = state.actor(id) else {
                return Ok(true);
            };
            if actor.is_pending_deletion() || actor.is_carried() || actor.kind() == ActorKind::Prop
            {
                return Ok(true);
            }

            if actor.current_action().is_some() {
                let (status, instant) = self.progress(state, ctx, id, dt)?;
                dt = 0.0;
                match status {
                    AnimationStatus::InProgress => return Ok(false),
                    AnimationStatus::Done => {
                        animated |= !instant;
                        continue;
                    }
                }
            }

            if !actor.queue.is_empty() {
                if animated {
                    // The next action starts on the next frame.
                    return Ok(false);
                }
                let origin = actor.position();
                if let Some(actor) = state.actor_mut(id) {
                    if let Some(action) = actor.queue.pop_front() {
                        trace!("{} starts {:?}", id, action.kind);
                        actor.current = Some(ActiveAction::new(action, origin));
                    }
                }
                continue;
            }

            if actor.is_turn_over() || actor.moves.current < 1 {
                return Ok(true);
            }

            if actor.is_player_controlled() {
                if !self.follow_path(state, id) {
                    return Ok(false);
                }
                continue;
            }

            self.ask_script(state, ctx, id)?;
        }

        Ok(false)
    }

    /// Fires and advances the in-flight action. The flag reports whether the
    /// action had no animation frames.
    fn progress(
        &mut self,
        state: &mut GameState,
        ctx: &mut GameContext,
        id: ActorId,
        dt: f32,
    ) -> GloamResult<(AnimationStatus, bool)> {
        let timing = *ctx.timing();
        let Some(active) = state.actor(id).and_then(|a| a.current_action().cloned()) else {
            return Ok((AnimationStatus::Done, true));
        };
        let action = active.action;
        let instant = action.kind.total_frames(&timing) == 0;

        if active.should_fire(&timing) {
            if let Some(current) = state.actor_mut(id).and_then(|a| a.current.as_mut()) {
                current.mark_fired();
            }
            let succeeded = state.resolve_action(id, action)?;
            self.settle(state, id, action, succeeded);
        }

        let Some(actor) = state.actor_mut(id) else {
            return Ok((AnimationStatus::Done, instant));
        };
        let Some(current) = actor.current.as_mut() else {
            return Ok((AnimationStatus::Done, instant));
        };
        let status = current.advance(dt, &timing);
        let progress = current.progress(&timing);
        actor.update_render_position(progress);

        if status == AnimationStatus::Done {
            actor.current = None;
            if actor.position() != active.origin {
                state.refresh_fov(id, false);
            }
        }
        Ok((status, instant))
    }

    /// Charges the actor for a fired action.
    ///
    /// A move costs one move whether or not it succeeded; a failed move
    /// also drops the rest of the queue and any path. Every other action
    /// ends the turn.
    fn settle(&self, state: &mut GameState, id: ActorId, action: Action, succeeded: bool) {
        let Some(actor) = state.actor_mut(id) else {
            return;
        };
        if action.kind.ends_turn() {
            actor.end_turn_early();
        } else {
            actor.moves.reduce(1);
            if !succeeded {
                actor.clear_actions();
                actor.clear_path();
            }
        }
        if !succeeded {
            debug!("{} {:?} toward {:?} failed", id, action.kind, action.target);
        }
    }

    /// Queues the next step of an auto-walk. Returns false when there is
    /// nothing to follow, so the player keeps waiting for input.
    fn follow_path(&self, state: &mut GameState, id: ActorId) -> bool {
        let Some(actor) = state.actor(id) else {
            return false;
        };
        if !actor.is_auto_walking() {
            return false;
        }
        let Some(next) = actor.path().and_then(|path| path.goto()) else {
            if let Some(actor) = state.actor_mut(id) {
                actor.clear_path();
            }
            return false;
        };

        let blocked = state.grid().is_wall(next, true);
        let Some(actor) = state.actor_mut(id) else {
            return false;
        };
        if blocked {
            debug!("{} auto-walk blocked at {:?}", id, next);
            actor.clear_path();
            return false;
        }
        if let Some(path) = actor.path.as_mut() {
            path.step();
        }
        if actor.path().is_some_and(|path| path.is_empty()) {
            actor.clear_path();
        }
        actor.queue_action(Action::move_to(next));
        true
    }

    /// Asks the actor's script for a decision and queues the result.
    fn ask_script(
        &mut self,
        state: &mut GameState,
        ctx: &mut GameContext,
        id: ActorId,
    ) -> GloamResult<()> {
        let decision = {
            let script = state
                .actor(id)
                .and_then(|actor| actor.script.as_deref())
                .and_then(|name| ctx.scripts.get(name).map(|script| (name, script)));
            match (script, ScriptContext::new(state, id)) {
                (Some((name, script)), Some(view)) => {
                    let decision = script.decide(&view, &mut ctx.rng);
                    trace!("{} ({}) decided {:?}", id, name, decision);
                    decision
                }
                _ => {
                    warn!("{} has no usable script; waiting", id);
                    Decision::Wait
                }
            }
        };
        self.apply_decision(state, id, decision);
        Ok(())
    }

    fn apply_decision(&self, state: &mut GameState, id: ActorId, decision: Decision) {
        let Some(actor) = state.actor(id) else {
            return;
        };
        let origin = actor.position();
        let kind = actor.kind();
        let power = actor.attack_power;

        let action = match decision {
            Decision::Move(target) if origin.is_adjacent(target) => Action::move_to(target),
            Decision::Move(target) => {
                match find_path(state.grid(), origin, target, Some(kind), Connectivity::Eight)
                    .and_then(|path| path.goto())
                {
                    Some(step) => Action::move_to(step),
                    None => Action::wait(),
                }
            }
            Decision::Attack(target) => Action::attack(target, power),
            Decision::Shoot(target) => Action::shoot(target, power),
            Decision::Interact(target) => Action::interact(target),
            Decision::UseAbility { ability, target } => Action::use_ability(ability, target),
            Decision::SetState { key, value } => {
                if let Some(actor) = state.actor_mut(id) {
                    actor.set_state(key, value);
                }
                return;
            }
            Decision::Wait => Action::wait(),
        };
        if let Some(actor) = state.actor_mut(id) {
            actor.queue_action(action);
        }
    }

    /// Ticks end-of-turn effects, routing status damage through the usual
    /// death handling.
    fn end_turn(&mut self, state: &mut GameState, id: ActorId) -> GloamResult<()> {
        let Some(actor) = state.actor_mut(id) else {
            return Ok(());
        };
        if actor.is_pending_deletion() {
            return Ok(());
        }
        let tick = actor.end_turn();
        if tick.healing > 0 {
            state.heal_actor(id, tick.healing)?;
        }
        if tick.damage > 0 {
            state.damage_actor(id, tick.damage, None)?;
        }
        Ok(())
    }

    /// Picks the next actor after `current`. Returns true on wrap-around.
    fn select_next(&mut self, state: &mut GameState, ctx: &mut GameContext, current: ActorId) -> bool {
        let mut next = None;
        for id in state.actors().ids_after(current) {
            if state.sweep(id) {
                debug!("Swept {} during selection", id);
                continue;
            }
            next = Some(id);
            break;
        }

        let wrapped = next.is_none();
        if wrapped {
            let swept = state.sweep_pending();
            if !swept.is_empty() {
                debug!("Swept {:?} at round end", swept);
            }
            self.round += 1;
            state.push_event(GameEvent::NewRound { round: self.round });
            if state.rebuild_downhill_if_stale() {
                debug!("Rebuilt downhill map for round {}", self.round);
            }
            next = state.actors().ids().into_iter().next();
        }

        self.active = next;
        if let Some(id) = next {
            self.start_turn(state, ctx, id);
        }
        wrapped
    }

    /// Resets per-turn resources. For the player, recentres the camera and
    /// announces the turn.
    fn start_turn(&mut self, state: &mut GameState, ctx: &mut GameContext, id: ActorId) {
        let mount_moves = state
            .actor(id)
            .and_then(|actor| actor.mount())
            .and_then(|mount| state.actor(mount))
            .map(|mount| mount.moves.max);
        let Some(actor) = state.actor_mut(id) else {
            return;
        };
        actor.start_turn();
        if let Some(moves) = mount_moves {
            actor.moves.current = actor.moves.current.max(moves);
        }
        if actor.kind() == ActorKind::Player {
            let center = actor.position();
            ctx.camera.center_on(center);
            ctx.player = Some(id);
            state.push_event(GameEvent::TurnStarted { actor: id, center });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{AnimationTiming, GameConfig, Grid, Position, SpawnRequest};

    fn instant_context() -> GameContext {
        GameContext::new(GameConfig {
            timing: AnimationTiming::instant(),
            ..GameConfig::default()
        })
    }

    fn idle_state(count: i32) -> (GameState, Vec<ActorId>) {
        let mut state = GameState::new(Grid::new(10, 10).unwrap());
        let ids = (0..count)
            .map(|i| {
                state
                    .spawn_actor(
                        SpawnRequest::new(ActorKind::Monster, Position::new(i, 0)).with_script("ai/idle"),
                    )
                    .unwrap()
            })
            .collect();
        (state, ids)
    }

    #[test]
    fn test_turns_follow_ids_and_wrap() {
        let (mut state, ids) = idle_state(3);
        let mut ctx = instant_context();
        let mut scheduler = TurnScheduler::new();
        scheduler.start(&mut state, &mut ctx);
        assert_eq!(scheduler.active(), Some(ids[0]));

        let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
        assert_eq!(report.active, Some(ids[1]));
        assert!(report.turn_ended && !report.new_round);

        let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
        assert_eq!(report.active, Some(ids[2]));

        let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
        assert_eq!(report.active, Some(ids[0]));
        assert!(report.new_round);
        assert_eq!(scheduler.round(), 2);
        assert!(state.events().iter().any(|e| *e == GameEvent::NewRound { round: 2 }));
    }

    #[test]
    fn test_missing_script_waits() {
        let mut state = GameState::new(Grid::new(5, 5).unwrap());
        let lost = state
            .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(1, 1)).with_script("ai/nope"))
            .unwrap();
        let bare = state
            .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(3, 3)))
            .unwrap();
        let mut ctx = instant_context();
        let mut scheduler = TurnScheduler::new();
        scheduler.start(&mut state, &mut ctx);

        assert_eq!(scheduler.update(&mut state, &mut ctx, 0.016).unwrap().active, Some(bare));
        assert_eq!(scheduler.update(&mut state, &mut ctx, 0.016).unwrap().active, Some(lost));
    }

    #[test]
    fn test_player_waits_for_input() {
        let mut state = GameState::new(Grid::new(5, 5).unwrap());
        let player = state
            .spawn_actor(SpawnRequest::new(ActorKind::Player, Position::new(1, 1)))
            .unwrap();
        let mut ctx = instant_context();
        let mut scheduler = TurnScheduler::new();
        scheduler.start(&mut state, &mut ctx);
        assert_eq!(ctx.camera.center, Position::new(1, 1));
        assert_eq!(ctx.player, Some(player));

        for _ in 0..10 {
            let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
            assert!(!report.turn_ended);
        }

        state
            .actor_mut(player)
            .unwrap()
            .queue_action(Action::move_to(Position::new(2, 1)));
        let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
        assert!(report.turn_ended);
        assert_eq!(state.actor(player).unwrap().position(), Position::new(2, 1));
        assert_eq!(ctx.camera.center, Position::new(2, 1));
    }

    #[test]
    fn test_attack_fires_at_impact_frame() {
        let mut state = GameState::new(Grid::new(5, 5).unwrap());
        let hero = state
            .spawn_actor(SpawnRequest::new(ActorKind::Hero, Position::new(1, 1)).with_script("ai/chaser"))
            .unwrap();
        let monster = state
            .spawn_actor(SpawnRequest::new(ActorKind::Monster, Position::new(2, 1)).with_script("ai/idle"))
            .unwrap();
        let mut ctx = GameContext::default();
        let timing = *ctx.timing();
        let mut scheduler = TurnScheduler::new();
        scheduler.start(&mut state, &mut ctx);

        let full = state.actor(monster).unwrap().health.current;
        let mut hit_frame = None;
        for frame in 1..=timing.attack_frames {
            scheduler
                .update(&mut state, &mut ctx, timing.frame_duration)
                .unwrap();
            if hit_frame.is_none() && state.actor(monster).unwrap().health.current < full {
                hit_frame = Some(frame);
            }
        }
        // Frame 1 starts the action; the impact lands once four frames have passed.
        assert_eq!(hit_frame, Some(timing.attack_impact_frame + 1));
        assert_ne!(scheduler.active(), Some(hero));
    }

    #[test]
    fn test_status_damage_applies_at_end_of_turn() {
        let (mut state, ids) = idle_state(2);
        state.actor_mut(ids[0]).unwrap().add_status(crate::game::StatusEffect {
            kind: crate::game::StatusKind::Poison,
            turns: 1,
            magnitude: 100,
        });
        let mut ctx = instant_context();
        let mut scheduler = TurnScheduler::new();
        scheduler.start(&mut state, &mut ctx);
        scheduler.update(&mut state, &mut ctx, 0.016).unwrap();

        assert!(state.actor(ids[0]).unwrap().is_pending_deletion());
        let report = scheduler.update(&mut state, &mut ctx, 0.016).unwrap();
        assert!(report.new_round);
        assert!(state.actor(ids[0]).is_none());
        assert_eq!(report.active, Some(ids[1]));
    }
}
