//! # Actions
//!
//! Queued, multi-frame game effects. An action sits in an actor's FIFO
//! queue until the scheduler starts it; it then stays in flight across
//! frames while its animation counter advances, fires its effect at the
//! impact frame, and completes when the counter reaches its length.

use crate::game::{AbilityId, Position};
use serde::{Deserialize, Serialize};

/// What an action does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Move,
    Attack,
    Shoot,
    Interact,
    UseAbility(AbilityId),
    Wait,
}

impl ActionKind {
    /// Total animation frames before the action completes.
    pub fn total_frames(self, timing: &AnimationTiming) -> u32 {
        match self {
            ActionKind::Move => timing.move_frames,
            ActionKind::Attack => timing.attack_frames,
            ActionKind::Shoot => timing.shoot_frames,
            ActionKind::Interact => timing.interact_frames,
            ActionKind::UseAbility(ability) => {
                if ability.info().ranged {
                    timing.shoot_frames
                } else {
                    timing.attack_frames
                }
            }
            ActionKind::Wait => 0,
        }
    }

    /// Frame at which the effect applies.
    pub fn impact_frame(self, timing: &AnimationTiming) -> u32 {
        match self {
            ActionKind::Move | ActionKind::Interact | ActionKind::Wait => 0,
            ActionKind::Attack => timing.attack_impact_frame,
            ActionKind::Shoot => timing.shoot_impact_frame,
            ActionKind::UseAbility(ability) => {
                if ability.info().ranged {
                    timing.shoot_impact_frame
                } else {
                    timing.attack_impact_frame
                }
            }
        }
    }

    /// Attack-class actions end the actor's turn once resolved.
    pub fn ends_turn(self) -> bool {
        !matches!(self, ActionKind::Move)
    }
}

/// A small value object describing one queued effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub target: Position,
    /// Damage for attacks, unused otherwise
    pub value: i32,
}

impl Action {
    pub fn new(kind: ActionKind, target: Position, value: i32) -> Self {
        Self {
            kind,
            target,
            value,
        }
    }

    pub fn move_to(target: Position) -> Self {
        Self::new(ActionKind::Move, target, 0)
    }

    pub fn attack(target: Position, damage: i32) -> Self {
        Self::new(ActionKind::Attack, target, damage)
    }

    pub fn shoot(target: Position, damage: i32) -> Self {
        Self::new(ActionKind::Shoot, target, damage)
    }

    pub fn interact(target: Position) -> Self {
        Self::new(ActionKind::Interact, target, 0)
    }

    pub fn use_ability(ability: AbilityId, target: Position) -> Self {
        Self::new(ActionKind::UseAbility(ability), target, 0)
    }

    pub fn wait() -> Self {
        Self::new(ActionKind::Wait, Position::new(0, 0), 0)
    }
}

/// Frame thresholds for each animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTiming {
    /// Seconds of `dt` that make one animation frame
    pub frame_duration: f32,
    pub move_frames: u32,
    pub attack_frames: u32,
    pub attack_impact_frame: u32,
    pub shoot_frames: u32,
    pub shoot_impact_frame: u32,
    pub interact_frames: u32,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            frame_duration: 1.0 / 60.0,
            move_frames: 6,
            attack_frames: 8,
            attack_impact_frame: 4,
            shoot_frames: 12,
            shoot_impact_frame: 10,
            interact_frames: 4,
        }
    }
}

impl AnimationTiming {
    /// Timing with every animation completing on its first frame.
    pub fn instant() -> Self {
        Self {
            frame_duration: 1.0 / 60.0,
            move_frames: 0,
            attack_frames: 0,
            attack_impact_frame: 0,
            shoot_frames: 0,
            shoot_impact_frame: 0,
            interact_frames: 0,
        }
    }
}

/// Result of advancing an in-flight action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    InProgress,
    Done,
}

/// An action that has left the queue and is animating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAction {
    pub action: Action,
    /// Grid cell the actor occupied when the action started
    pub origin: Position,
    frames: u32,
    timer: f32,
    fired: bool,
}

impl ActiveAction {
    pub fn new(action: Action, origin: Position) -> Self {
        Self {
            action,
            origin,
            frames: 0,
            timer: 0.0,
            fired: false,
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// True once the impact frame is reached and the effect hasn't applied.
    pub fn should_fire(&self, timing: &AnimationTiming) -> bool {
        !self.fired && self.frames >= self.action.kind.impact_frame(timing)
    }

    pub fn mark_fired(&mut self) {
        self.fired = true;
    }

    /// Accumulates `dt` into whole frames.
    ///
    /// Completion requires the effect to have fired, so an action is never
    /// finished without its effect even if a large `dt` skips the impact
    /// frame.
    pub fn advance(&mut self, dt: f32, timing: &AnimationTiming) -> AnimationStatus {
        if timing.frame_duration > 0.0 {
            self.timer += dt.max(0.0);
            while self.timer >= timing.frame_duration {
                self.timer -= timing.frame_duration;
                self.frames += 1;
            }
        } else {
            self.frames += 1;
        }

        if self.fired && self.frames >= self.action.kind.total_frames(timing) {
            AnimationStatus::Done
        } else {
            AnimationStatus::InProgress
        }
    }

    /// Fraction of the animation completed, in `0.0..=1.0`.
    pub fn progress(&self, timing: &AnimationTiming) -> f32 {
        let total = self.action.kind.total_frames(timing);
        if total == 0 {
            1.0
        } else {
            (self.frames as f32 / total as f32).min(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_fires_immediately_then_animates() {
        let timing = AnimationTiming::default();
        let mut active = ActiveAction::new(Action::move_to(Position::new(1, 0)), Position::new(0, 0));

        assert!(active.should_fire(&timing));
        active.mark_fired();

        let dt = timing.frame_duration;
        for _ in 0..timing.move_frames - 1 {
            assert_eq!(active.advance(dt, &timing), AnimationStatus::InProgress);
        }
        assert_eq!(active.advance(dt, &timing), AnimationStatus::Done);
        assert_eq!(active.progress(&timing), 1.0);
    }

    #[test]
    fn test_attack_fires_at_impact_frame() {
        let timing = AnimationTiming::default();
        let mut active = ActiveAction::new(Action::attack(Position::new(1, 0), 3), Position::new(0, 0));
        let dt = timing.frame_duration;

        let mut fired_at = None;
        for frame in 0..=timing.attack_frames {
            if active.should_fire(&timing) {
                active.mark_fired();
                fired_at = Some(frame);
            }
            if active.advance(dt, &timing) == AnimationStatus::Done {
                break;
            }
        }
        assert_eq!(fired_at, Some(timing.attack_impact_frame));
    }

    #[test]
    fn test_unfired_action_never_completes() {
        let timing = AnimationTiming::default();
        let mut active = ActiveAction::new(Action::shoot(Position::new(3, 0), 2), Position::new(0, 0));
        assert_eq!(active.advance(10.0, &timing), AnimationStatus::InProgress);
        assert!(active.should_fire(&timing));
        active.mark_fired();
        assert_eq!(active.advance(0.0, &timing), AnimationStatus::Done);
    }

    #[test]
    fn test_wait_is_instant() {
        let timing = AnimationTiming::default();
        let mut active = ActiveAction::new(Action::wait(), Position::new(0, 0));
        assert!(active.should_fire(&timing));
        active.mark_fired();
        assert_eq!(active.advance(0.0, &timing), AnimationStatus::Done);
    }

    #[test]
    fn test_only_moves_keep_the_turn_open() {
        assert!(!ActionKind::Move.ends_turn());
        assert!(ActionKind::Attack.ends_turn());
        assert!(ActionKind::Wait.ends_turn());
    }
}
