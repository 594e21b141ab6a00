//! # Environment Objects
//!
//! Interactable props that share a cell with at most one actor: doors,
//! chests, barrels and levers.

use crate::game::{ObjectId, Position};
use serde::{Deserialize, Serialize};

/// The kind of an environment object and its mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Blocks movement and sight while closed
    Door { open: bool },
    /// Opened once, then removed from the level
    Chest,
    /// Destructible obstacle
    Barrel,
    /// Toggles between two states; walkable
    Lever { pulled: bool },
}

impl ObjectKind {
    /// Character used in level descriptions and the ASCII presenter.
    pub fn glyph(self) -> char {
        match self {
            ObjectKind::Door { open: false } => '+',
            ObjectKind::Door { open: true } => '\'',
            ObjectKind::Chest => 'c',
            ObjectKind::Barrel => 'b',
            ObjectKind::Lever { pulled: false } => '/',
            ObjectKind::Lever { pulled: true } => '\\',
        }
    }

    /// Parses an object glyph from a level description.
    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '+' => Some(ObjectKind::Door { open: false }),
            '\'' => Some(ObjectKind::Door { open: true }),
            'c' => Some(ObjectKind::Chest),
            'b' => Some(ObjectKind::Barrel),
            '/' => Some(ObjectKind::Lever { pulled: false }),
            _ => None,
        }
    }
}

/// What happened when an actor interacted with an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interaction {
    Opened,
    Closed,
    Looted,
    Toggled,
    /// The actor climbed onto a mount
    Mounted,
    Nothing,
}

/// An interactable object placed on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    id: ObjectId,
    pub kind: ObjectKind,
    position: Position,
    /// Remaining durability; only barrels take damage
    pub durability: i32,
    /// Optional script identifier consulted by the presentation layer
    pub script: Option<String>,
}

impl Object {
    pub(crate) fn new(id: ObjectId, kind: ObjectKind, position: Position) -> Self {
        let durability = match kind {
            ObjectKind::Barrel => 3,
            _ => 0,
        };
        Self {
            id,
            kind,
            position,
            durability,
            script: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Whether actors may share the cell with this object.
    pub fn is_passable(&self) -> bool {
        match self.kind {
            ObjectKind::Door { open } => open,
            ObjectKind::Lever { .. } => true,
            ObjectKind::Chest | ObjectKind::Barrel => false,
        }
    }

    /// Whether this object stops sight lines.
    pub fn blocks_light(&self) -> bool {
        matches!(self.kind, ObjectKind::Door { open: false })
    }

    /// Applies an interaction and reports the outcome.
    ///
    /// A `Looted` outcome means the caller should erase the object.
    pub fn interact(&mut self) -> Interaction {
        match &mut self.kind {
            ObjectKind::Door { open } => {
                *open = !*open;
                if *open {
                    Interaction::Opened
                } else {
                    Interaction::Closed
                }
            }
            ObjectKind::Chest => Interaction::Looted,
            ObjectKind::Lever { pulled } => {
                *pulled = !*pulled;
                Interaction::Toggled
            }
            ObjectKind::Barrel => Interaction::Nothing,
        }
    }

    /// Applies damage; returns true when the object is destroyed.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.kind != ObjectKind::Barrel {
            return false;
        }
        self.durability -= amount;
        self.durability < 1
    }
}
