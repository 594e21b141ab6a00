//! # Game Events
//!
//! Discrete notifications the simulation emits for a presentation layer.
//! The core never calls into a renderer; it pushes events here and the
//! presenter drains them once per frame.

use crate::game::{AbilityId, ActorId, ActorKind, Interaction, ObjectId, Position};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How prominently a message should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageImportance {
    Debug,
    Normal,
    Important,
    Critical,
}

/// Something that happened in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ActorMoved {
        actor: ActorId,
        from: Position,
        to: Position,
    },
    /// An actor appeared on the grid without walking there
    ActorPlaced { actor: ActorId, position: Position },
    /// A swept or erased actor left the grid
    ActorRemoved { actor: ActorId, position: Position },
    ActorDamaged {
        actor: ActorId,
        damage: i32,
        source: Option<ActorId>,
    },
    ActorDied {
        actor: ActorId,
        kind: ActorKind,
        position: Position,
        killer: Option<ActorId>,
    },
    AbilityUsed {
        actor: ActorId,
        ability: AbilityId,
        target: Position,
    },
    ObjectInteracted {
        actor: ActorId,
        object: ObjectId,
        position: Position,
        outcome: Interaction,
    },
    ObjectDestroyed { object: ObjectId, position: Position },
    /// Cells whose discovery state flipped during a field-of-view pass
    CellsRevealed { cells: Vec<Position> },
    /// The player's turn began; the camera has been recentred on `center`
    TurnStarted { actor: ActorId, center: Position },
    NewRound { round: u64 },
    LevelCleared,
    Message {
        text: String,
        importance: MessageImportance,
    },
}

impl GameEvent {
    pub fn message(text: impl Into<String>, importance: MessageImportance) -> Self {
        GameEvent::Message {
            text: text.into(),
            importance,
        }
    }

    /// Grid cells the event touches, for partial redraws.
    pub fn affected_cells(&self) -> Vec<Position> {
        match self {
            GameEvent::ActorMoved { from, to, .. } => vec![*from, *to],
            GameEvent::ActorPlaced { position, .. }
            | GameEvent::ActorRemoved { position, .. }
            | GameEvent::ActorDied { position, .. } => vec![*position],
            GameEvent::AbilityUsed { target, .. } => vec![*target],
            GameEvent::ObjectInteracted { position, .. }
            | GameEvent::ObjectDestroyed { position, .. } => vec![*position],
            GameEvent::CellsRevealed { cells } => cells.clone(),
            _ => Vec::new(),
        }
    }
}

/// FIFO of pending events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventQueue {
    events: VecDeque<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    /// Removes and returns every pending event in emission order.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }
}

/// Running totals kept from the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Monsters killed by another actor
    pub monsters_defeated: u32,
    pub damage_dealt: u64,
    pub steps_taken: u64,
    pub abilities_used: u32,
    pub objects_used: u32,
    pub cells_revealed: u64,
    pub rounds: u64,
}

impl GameStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates statistics based on a game event.
    pub fn update_from_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::ActorMoved { .. } => self.steps_taken += 1,
            GameEvent::ActorDamaged { damage, .. } => {
                self.damage_dealt += u64::from(damage.unsigned_abs());
            }
            GameEvent::ActorDied { kind, killer, .. } => {
                if *kind == ActorKind::Monster && killer.is_some() {
                    self.monsters_defeated += 1;
                }
            }
            GameEvent::AbilityUsed { .. } => self.abilities_used += 1,
            GameEvent::ObjectInteracted { .. } => self.objects_used += 1,
            GameEvent::CellsRevealed { cells } => self.cells_revealed += cells.len() as u64,
            GameEvent::NewRound { round } => self.rounds = *round,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let mut queue = EventQueue::new();
        queue.push(GameEvent::NewRound { round: 1 });
        queue.push(GameEvent::LevelCleared);
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained[0], GameEvent::NewRound { round: 1 });
        assert_eq!(drained[1], GameEvent::LevelCleared);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_affected_cells() {
        let event = GameEvent::ActorMoved {
            actor: ActorId(1),
            from: Position::new(0, 0),
            to: Position::new(1, 0),
        };
        assert_eq!(event.affected_cells().len(), 2);
        assert!(GameEvent::LevelCleared.affected_cells().is_empty());
    }

    #[test]
    fn test_statistics_from_events() {
        let mut stats = GameStatistics::new();
        stats.update_from_event(&GameEvent::ActorDamaged {
            actor: ActorId(2),
            damage: 4,
            source: Some(ActorId(1)),
        });
        stats.update_from_event(&GameEvent::ActorDied {
            actor: ActorId(2),
            kind: ActorKind::Monster,
            position: Position::new(3, 3),
            killer: Some(ActorId(1)),
        });
        stats.update_from_event(&GameEvent::ActorDied {
            actor: ActorId(3),
            kind: ActorKind::Monster,
            position: Position::new(4, 3),
            killer: None,
        });
        assert_eq!(stats.damage_dealt, 4);
        assert_eq!(stats.monsters_defeated, 1);
    }
}
