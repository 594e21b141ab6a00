//! Built-in scripts.

use crate::game::{ActorKind, Position};
use crate::script::{Decision, Script, ScriptContext};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Attacks adjacent enemies and hunts visible ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaserScript;

impl Script for ChaserScript {
    fn decide(&self, ctx: &ScriptContext<'_>, _rng: &mut StdRng) -> Decision {
        if let Some(target) = ctx.adjacent_hostile() {
            return Decision::Attack(target);
        }
        ctx.nearest_hostile()
            .and_then(|(_, pos)| ctx.path_step_toward(pos))
            .map(Decision::Move)
            .unwrap_or(Decision::Wait)
    }
}

/// Marches down the base's distance map, fighting whatever blocks it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiderScript;

impl Script for RaiderScript {
    fn decide(&self, ctx: &ScriptContext<'_>, _rng: &mut StdRng) -> Decision {
        if let Some(target) = ctx.adjacent_hostile() {
            return Decision::Attack(target);
        }
        match ctx.get_node_downhill(Some(ActorKind::Monster)) {
            Some(next) if next != ctx.position() && !ctx.grid().is_wall(next, true) => {
                Decision::Move(next)
            }
            _ => Decision::Wait,
        }
    }
}

/// Drifts to random open neighbours.
#[derive(Debug, Clone, Copy)]
pub struct WandererScript {
    /// Chance of standing still on a given turn
    pub idle_chance: f64,
}

impl Default for WandererScript {
    fn default() -> Self {
        Self { idle_chance: 0.25 }
    }
}

impl Script for WandererScript {
    fn decide(&self, ctx: &ScriptContext<'_>, rng: &mut StdRng) -> Decision {
        if rng.gen_bool(self.idle_chance.clamp(0.0, 1.0)) {
            return Decision::Wait;
        }
        let open: Vec<Position> = ctx
            .position()
            .adjacent_positions()
            .into_iter()
            .filter(|&pos| !ctx.grid().is_wall(pos, true))
            .collect();
        open.choose(rng)
            .copied()
            .map(Decision::Move)
            .unwrap_or(Decision::Wait)
    }
}

/// Holds a post: remembers where it started, shoots enemies within `range`,
/// closes on enemies that come within `leash` cells of home and returns
/// home afterwards.
#[derive(Debug, Clone, Copy)]
pub struct GuardScript {
    pub leash: u32,
    pub range: u32,
}

impl Default for GuardScript {
    fn default() -> Self {
        Self { leash: 5, range: 3 }
    }
}

impl GuardScript {
    const HOME: &'static str = "home";

    /// Packs a position into one script variable; zero means unset.
    fn encode(pos: Position) -> i32 {
        pos.y * 256 + pos.x + 1
    }

    fn decode(value: i32) -> Option<Position> {
        (value > 0).then(|| Position::new((value - 1) % 256, (value - 1) / 256))
    }
}

impl Script for GuardScript {
    fn decide(&self, ctx: &ScriptContext<'_>, _rng: &mut StdRng) -> Decision {
        let Some(home) = Self::decode(ctx.get_state(Self::HOME)) else {
            return Decision::SetState {
                key: Self::HOME.to_string(),
                value: Self::encode(ctx.position()),
            };
        };

        if let Some(target) = ctx.adjacent_hostile() {
            return Decision::Attack(target);
        }
        if let Some((_, enemy)) = ctx.nearest_hostile() {
            // Visible means a clear line, so the shot can land.
            if ctx.position().chebyshev_distance(enemy) <= self.range {
                return Decision::Shoot(enemy);
            }
            if home.chebyshev_distance(enemy) <= self.leash {
                if let Some(step) = ctx.path_step_toward(enemy) {
                    return Decision::Move(step);
                }
            }
        }
        if ctx.position() != home {
            if let Some(step) = ctx.path_step_toward(home) {
                return Decision::Move(step);
            }
        }
        Decision::Wait
    }
}

/// Always waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleScript;

impl Script for IdleScript {
    fn decide(&self, _ctx: &ScriptContext<'_>, _rng: &mut StdRng) -> Decision {
        Decision::Wait
    }
}
