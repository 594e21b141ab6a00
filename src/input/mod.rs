//! # Input Module
//!
//! Translates player input into queued actions on the player's actor.

use crate::game::{
    Action, AbilityId, ActorId, ActorKind, Direction, GameContext, GameState, Position,
};
use crate::utils::{find_path, Connectivity};
use crate::{GloamError, GloamResult};
use log::debug;

/// Input handler for processing player commands.
///
/// Keys are mapped by [`InputHandler::parse_key`]; the resulting
/// [`PlayerInput`] is applied to the world with [`InputHandler::apply`].
#[derive(Debug, Clone)]
pub struct InputHandler {
    /// Whether to enable Vi-style movement keys (hjklyubn)
    pub vi_keys_enabled: bool,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHandler {
    /// Creates a new input handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use gloam::{Direction, InputHandler, PlayerInput};
    ///
    /// let input = InputHandler::new();
    /// assert_eq!(input.parse_key('k'), Some(PlayerInput::Move(Direction::North)));
    /// assert_eq!(input.parse_key('.'), Some(PlayerInput::Wait));
    /// ```
    pub fn new() -> Self {
        Self {
            vi_keys_enabled: true,
        }
    }

    /// Maps a key press to an input.
    pub fn parse_key(&self, key: char) -> Option<PlayerInput> {
        let direction = match key {
            'w' => Some(Direction::North),
            'a' => Some(Direction::West),
            's' => Some(Direction::South),
            'd' => Some(Direction::East),
            _ => None,
        };
        if let Some(direction) = direction {
            return Some(PlayerInput::Move(direction));
        }

        if self.vi_keys_enabled {
            let direction = match key {
                'h' => Some(Direction::West),
                'j' => Some(Direction::South),
                'k' => Some(Direction::North),
                'l' => Some(Direction::East),
                'y' => Some(Direction::Northwest),
                'u' => Some(Direction::Northeast),
                'b' => Some(Direction::Southwest),
                'n' => Some(Direction::Southeast),
                _ => None,
            };
            if let Some(direction) = direction {
                return Some(PlayerInput::Move(direction));
            }
        }

        match key {
            '.' | ' ' => Some(PlayerInput::Wait),
            'x' => Some(PlayerInput::EndTurn),
            '1' => Some(PlayerInput::SelectAbility(AbilityId::Strike)),
            '2' => Some(PlayerInput::SelectAbility(AbilityId::Firebolt)),
            '3' => Some(PlayerInput::SelectAbility(AbilityId::Mend)),
            '4' => Some(PlayerInput::SelectAbility(AbilityId::Blink)),
            '\u{1b}' => Some(PlayerInput::CancelAbility),
            'q' => Some(PlayerInput::Quit),
            _ => None,
        }
    }

    /// Applies an input to the player's actor.
    ///
    /// Inputs only queue work; the scheduler runs it when the player's turn
    /// comes around.
    pub fn apply(
        &self,
        input: PlayerInput,
        state: &mut GameState,
        ctx: &GameContext,
    ) -> GloamResult<InputOutcome> {
        if input == PlayerInput::Quit {
            return Ok(InputOutcome::Quit);
        }
        let player = ctx
            .player
            .or_else(|| state.player())
            .ok_or_else(|| GloamError::InvalidState("No player found".to_string()))?;
        let actor = state
            .actor(player)
            .ok_or(GloamError::UnknownActor(player))?;
        let origin = actor.position();
        let power = actor.attack_power;

        let outcome = match input {
            PlayerInput::Move(direction) => {
                let target = origin + direction.to_delta();
                let action = bump_action(state, player, target, power);
                queue(state, player, action)
            }
            PlayerInput::Interact(direction) => {
                let target = origin + direction.to_delta();
                queue(state, player, Action::interact(target))
            }
            PlayerInput::Wait => queue(state, player, Action::wait()),
            PlayerInput::EndTurn => {
                if let Some(actor) = state.actor_mut(player) {
                    actor.end_turn_early();
                }
                InputOutcome::TurnEnded
            }
            PlayerInput::SelectAbility(ability) => {
                match state.actor_mut(player).map(|actor| actor.activate_ability(ability)) {
                    Some(true) => InputOutcome::AbilityArmed(ability),
                    _ => InputOutcome::Ignored,
                }
            }
            PlayerInput::CancelAbility => {
                if let Some(actor) = state.actor_mut(player) {
                    actor.cancel_ability();
                }
                InputOutcome::AbilityCancelled
            }
            PlayerInput::ClickCell(target) => click(state, player, origin, target),
            PlayerInput::Quit => InputOutcome::Quit,
        };
        debug!("Player input {:?} -> {:?}", input, outcome);
        Ok(outcome)
    }
}

/// Picks the action for stepping into `target`: attack a hostile,
/// interact with a closed object or a mount, otherwise move.
fn bump_action(state: &GameState, player: ActorId, target: Position, power: i32) -> Action {
    let grid = state.grid();
    if let Some(kind) = grid.actor_kind_at(target) {
        if ActorKind::Player.is_hostile_to(kind) {
            return Action::attack(target, power);
        }
        if kind == ActorKind::Mount {
            return Action::interact(target);
        }
    }
    if grid.object_at(target).is_some_and(|object| !object.is_passable()) {
        debug!("{} bumps into an object at {:?}", player, target);
        return Action::interact(target);
    }
    Action::move_to(target)
}

fn queue(state: &mut GameState, player: ActorId, action: Action) -> InputOutcome {
    match state.actor_mut(player) {
        Some(actor) => {
            actor.clear_path();
            actor.queue_action(action);
            InputOutcome::Queued(action)
        }
        None => InputOutcome::Ignored,
    }
}

/// A click either fires the armed ability, starts walking a previewed path
/// when it is clicked again, or previews a new path.
fn click(state: &mut GameState, player: ActorId, origin: Position, target: Position) -> InputOutcome {
    let armed = state.actor(player).and_then(|actor| actor.activated());
    if let Some(ability) = armed {
        return match crate::game::check_ability(state, player, ability, target) {
            Ok(()) => {
                if let Some(actor) = state.actor_mut(player) {
                    actor.cancel_ability();
                }
                queue(state, player, Action::use_ability(ability, target))
            }
            Err(reason) => {
                debug!("{:?} rejected at {:?}: {}", ability, target, reason);
                InputOutcome::Ignored
            }
        };
    }

    let same_destination = state
        .actor(player)
        .and_then(|actor| actor.path())
        .and_then(|path| path.destination())
        == Some(target);
    if same_destination {
        return match state.actor_mut(player).map(|actor| actor.start_auto_walk()) {
            Some(true) => InputOutcome::AutoWalkStarted,
            _ => InputOutcome::Ignored,
        };
    }

    let path = find_path(
        state.grid(),
        origin,
        target,
        Some(ActorKind::Monster),
        Connectivity::Eight,
    );
    let Some(actor) = state.actor_mut(player) else {
        return InputOutcome::Ignored;
    };
    match path {
        Some(path) => {
            let steps = path.len();
            actor.set_path(path);
            InputOutcome::PathPlanned { steps }
        }
        None => {
            actor.clear_path();
            InputOutcome::Ignored
        }
    }
}

/// Player input types that can be processed by the input handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// Step, attack or interact in a direction
    Move(Direction),
    /// Wait/rest for one turn
    Wait,
    /// Left click on a grid cell
    ClickCell(Position),
    SelectAbility(AbilityId),
    CancelAbility,
    Interact(Direction),
    /// Give up the remaining moves this turn
    EndTurn,
    Quit,
}

/// What applying an input did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Queued(Action),
    /// A path was previewed; clicking the same cell again walks it
    PathPlanned { steps: usize },
    AutoWalkStarted,
    AbilityArmed(AbilityId),
    AbilityCancelled,
    TurnEnded,
    Quit,
    Ignored,
}
