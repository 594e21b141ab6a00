//! # Abilities
//!
//! A closed set of abilities. Each ability maps to an [`AbilityKind`] that
//! carries its payload and knows how to validate a target, apply itself and
//! describe its animation.

use crate::game::{ActorId, GameEvent, GameState, Position};
use crate::utils::has_line_of_sight;
use crate::GloamResult;
use serde::{Deserialize, Serialize};

/// Identifier of a known ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbilityId {
    Strike,
    Firebolt,
    Mend,
    Blink,
}

/// Effect payload of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    Melee { damage: i32 },
    Projectile { damage: i32, range: u32 },
    Heal { amount: i32 },
    Teleport { range: u32 },
}

/// How the presentation layer should animate an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderHint {
    Lunge,
    Projectile { glyph: char },
    Sparkle,
    Flash,
}

/// Static description of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityInfo {
    pub name: &'static str,
    pub kind: AbilityKind,
    /// Turns before the ability can be used again
    pub cooldown: u32,
    /// Uses the projectile animation timing
    pub ranged: bool,
}

impl AbilityId {
    pub fn info(self) -> AbilityInfo {
        match self {
            AbilityId::Strike => AbilityInfo {
                name: "Strike",
                kind: AbilityKind::Melee { damage: 4 },
                cooldown: 2,
                ranged: false,
            },
            AbilityId::Firebolt => AbilityInfo {
                name: "Firebolt",
                kind: AbilityKind::Projectile { damage: 5, range: 6 },
                cooldown: 3,
                ranged: true,
            },
            AbilityId::Mend => AbilityInfo {
                name: "Mend",
                kind: AbilityKind::Heal { amount: 6 },
                cooldown: 4,
                ranged: false,
            },
            AbilityId::Blink => AbilityInfo {
                name: "Blink",
                kind: AbilityKind::Teleport { range: 4 },
                cooldown: 5,
                ranged: true,
            },
        }
    }

    pub fn kind(self) -> AbilityKind {
        self.info().kind
    }
}

/// Why a target was rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    #[error("ability is not known")]
    Unknown,
    #[error("ability is on cooldown")]
    OnCooldown,
    #[error("target is out of range")]
    OutOfRange,
    #[error("no line of sight to target")]
    NoLineOfSight,
    #[error("no valid target there")]
    NoTarget,
    #[error("target cell is blocked")]
    Blocked,
}

impl AbilityKind {
    /// Checks whether `user` could use this ability on `target` right now.
    pub fn validate_target(
        &self,
        state: &GameState,
        user: ActorId,
        target: Position,
    ) -> Result<(), TargetError> {
        let actor = state.actor(user).ok_or(TargetError::NoTarget)?;
        let origin = actor.position();
        let grid = state.grid();

        match *self {
            AbilityKind::Melee { .. } => {
                if !origin.is_adjacent(target) {
                    return Err(TargetError::OutOfRange);
                }
                if grid.actor_at(target).is_none() {
                    return Err(TargetError::NoTarget);
                }
            }
            AbilityKind::Projectile { range, .. } => {
                if origin == target || origin.euclidean_distance(target) > f64::from(range) {
                    return Err(TargetError::OutOfRange);
                }
                if grid.actor_at(target).is_none() {
                    return Err(TargetError::NoTarget);
                }
                if !has_line_of_sight(grid, origin, target) {
                    return Err(TargetError::NoLineOfSight);
                }
            }
            AbilityKind::Heal { .. } => {
                if target != origin && !origin.is_adjacent(target) {
                    return Err(TargetError::OutOfRange);
                }
                let Some(patient) = grid.actor_kind_at(target) else {
                    return Err(TargetError::NoTarget);
                };
                if patient.is_player_side() != actor.kind().is_player_side() {
                    return Err(TargetError::NoTarget);
                }
            }
            AbilityKind::Teleport { range } => {
                if origin == target || origin.euclidean_distance(target) > f64::from(range) {
                    return Err(TargetError::OutOfRange);
                }
                if grid.is_wall(target, true) {
                    return Err(TargetError::Blocked);
                }
                if !has_line_of_sight(grid, origin, target) {
                    return Err(TargetError::NoLineOfSight);
                }
            }
        }
        Ok(())
    }

    /// Applies the effect. Targets are re-checked by the caller first; a
    /// target that vanished in between makes this a no-op.
    pub fn apply(&self, state: &mut GameState, user: ActorId, target: Position) -> GloamResult<()> {
        match *self {
            AbilityKind::Melee { damage } | AbilityKind::Projectile { damage, .. } => {
                if let Some(victim) = state.grid().actor_at(target) {
                    state.damage_actor(victim, damage, Some(user))?;
                }
            }
            AbilityKind::Heal { amount } => {
                if let Some(patient) = state.grid().actor_at(target) {
                    state.heal_actor(patient, amount)?;
                }
            }
            AbilityKind::Teleport { .. } => {
                if !state.grid().is_wall(target, true) {
                    state.move_actor(user, target)?;
                }
            }
        }
        Ok(())
    }

    pub fn render_hint(&self) -> RenderHint {
        match self {
            AbilityKind::Melee { .. } => RenderHint::Lunge,
            AbilityKind::Projectile { .. } => RenderHint::Projectile { glyph: '*' },
            AbilityKind::Heal { .. } => RenderHint::Sparkle,
            AbilityKind::Teleport { .. } => RenderHint::Flash,
        }
    }
}

/// Validates cooldown and knowledge, then the target.
pub fn check_ability(
    state: &GameState,
    user: ActorId,
    ability: AbilityId,
    target: Position,
) -> Result<(), TargetError> {
    let actor = state.actor(user).ok_or(TargetError::NoTarget)?;
    if !actor.knows(ability) {
        return Err(TargetError::Unknown);
    }
    if actor.cooldown(ability) > 0 {
        return Err(TargetError::OnCooldown);
    }
    ability.kind().validate_target(state, user, target)
}

/// Resolves a fired ability: applies it, starts its cooldown and reports it.
pub(crate) fn resolve_ability(
    state: &mut GameState,
    user: ActorId,
    ability: AbilityId,
    target: Position,
) -> GloamResult<bool> {
    if let Err(reason) = check_ability(state, user, ability, target) {
        log::debug!("{} could not use {:?}: {}", user, ability, reason);
        return Ok(false);
    }

    ability.kind().apply(state, user, target)?;
    if let Some(actor) = state.actor_mut(user) {
        actor.start_cooldown(ability);
    }
    state.push_event(GameEvent::AbilityUsed {
        actor: user,
        ability,
        target,
    });
    Ok(true)
}
