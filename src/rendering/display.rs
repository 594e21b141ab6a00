//! # Display Management
//!
//! An ASCII presenter. It keeps a character frame for the camera's
//! viewport and repaints only the cells named by drained [`GameEvent`]s.

use crate::game::{ActorId, GameEvent, GameState, MessageImportance, Position, Terrain};
use log::trace;
use std::collections::{BTreeSet, VecDeque};

/// Glyph for cells that have never been seen.
pub const UNSEEN_GLYPH: char = ' ';
/// Glyph for the raiders' target cell.
pub const BASE_GLYPH: char = 'B';

/// Character-cell display for the game.
///
/// The frame buffer covers the viewport only. A viewport move marks the
/// whole frame for repaint; events mark individual cells.
#[derive(Debug, Clone)]
pub struct AsciiDisplay {
    /// Map viewport width in cells
    pub map_width: u32,
    /// Map viewport height in cells
    pub map_height: u32,
    viewport: Position,
    frame: Vec<char>,
    dirty: BTreeSet<Position>,
    full_redraw: bool,
    /// Message history
    pub messages: VecDeque<String>,
    /// Maximum number of messages to keep
    pub max_messages: usize,
    /// Messages below this importance are dropped
    pub min_importance: MessageImportance,
    /// Recentre on the player when their turn starts
    pub follow_player: bool,
}

impl AsciiDisplay {
    /// Creates a display whose viewport starts at the origin.
    ///
    /// # Examples
    ///
    /// ```
    /// use gloam::AsciiDisplay;
    ///
    /// let display = AsciiDisplay::new(20, 10);
    /// assert_eq!(display.render_to_string().lines().count(), 10);
    /// ```
    pub fn new(map_width: u32, map_height: u32) -> Self {
        Self {
            map_width,
            map_height,
            viewport: Position::new(0, 0),
            frame: vec![UNSEEN_GLYPH; (map_width * map_height) as usize],
            dirty: BTreeSet::new(),
            full_redraw: true,
            messages: VecDeque::new(),
            max_messages: 100,
            min_importance: MessageImportance::Normal,
            follow_player: true,
        }
    }

    /// Top-left cell of the viewport.
    pub fn viewport(&self) -> Position {
        self.viewport
    }

    /// Centres the viewport on the given position.
    pub fn center_viewport_on_position(&mut self, position: Position) {
        let origin = Position::new(
            position.x - (self.map_width / 2) as i32,
            position.y - (self.map_height / 2) as i32,
        );
        if origin != self.viewport {
            self.viewport = origin;
            self.full_redraw = true;
        }
    }

    /// Marks one cell for repaint.
    pub fn mark_dirty(&mut self, pos: Position) {
        self.dirty.insert(pos);
    }

    /// Cells waiting for the next flush.
    pub fn dirty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.dirty.iter().copied()
    }

    /// Folds one event into the pending repaint set and message log.
    pub fn handle_event(&mut self, event: &GameEvent) {
        for pos in event.affected_cells() {
            self.mark_dirty(pos);
        }
        match event {
            GameEvent::TurnStarted { center, .. } if self.follow_player => {
                self.center_viewport_on_position(*center)
            }
            GameEvent::Message { text, importance } => self.add_message(text.clone(), *importance),
            GameEvent::LevelCleared => {
                self.add_message("The level is clear.".to_string(), MessageImportance::Important)
            }
            GameEvent::NewRound { round } => {
                self.add_message(format!("Round {}", round), MessageImportance::Debug)
            }
            _ => {}
        }
    }

    /// Repaints pending cells from the current state. Returns how many
    /// frame cells were painted.
    pub fn flush(&mut self, state: &GameState) -> usize {
        let mut painted = 0;
        if self.full_redraw {
            for row in 0..self.map_height as i32 {
                for col in 0..self.map_width as i32 {
                    let pos = self.viewport.offset(col, row);
                    painted += usize::from(self.paint(state, pos));
                }
            }
            self.full_redraw = false;
        } else {
            let dirty = std::mem::take(&mut self.dirty);
            for pos in dirty {
                painted += usize::from(self.paint(state, pos));
            }
        }
        self.dirty.clear();
        trace!("Repainted {} cells", painted);
        painted
    }

    fn paint(&mut self, state: &GameState, pos: Position) -> bool {
        let Some(index) = self.frame_index(pos) else {
            return false;
        };
        self.frame[index] = glyph_at(state, pos);
        true
    }

    fn frame_index(&self, pos: Position) -> Option<usize> {
        let col = pos.x - self.viewport.x;
        let row = pos.y - self.viewport.y;
        if col < 0 || row < 0 || col >= self.map_width as i32 || row >= self.map_height as i32 {
            return None;
        }
        Some(row as usize * self.map_width as usize + col as usize)
    }

    /// Character currently shown for a world cell, if it is in view.
    pub fn glyph(&self, pos: Position) -> Option<char> {
        self.frame_index(pos).map(|index| self.frame[index])
    }

    /// The frame as text, one line per viewport row.
    pub fn render_to_string(&self) -> String {
        let width = self.map_width.max(1) as usize;
        self.frame
            .chunks(width)
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One-line summary of an actor's pools.
    pub fn status_line(&self, state: &GameState, actor: ActorId) -> String {
        match state.actor(actor) {
            Some(actor) => format!(
                "{} HP {}/{}  Moves {}/{}  Monsters {}",
                actor.kind().glyph(),
                actor.health.current,
                actor.health.max,
                actor.moves.current,
                actor.moves.max,
                state.monsters_remaining()
            ),
            None => format!("Monsters {}", state.monsters_remaining()),
        }
    }

    /// Adds a message to the message history.
    pub fn add_message(&mut self, message: String, importance: MessageImportance) {
        if importance < self.min_importance {
            return;
        }
        self.messages.push_back(message);

        // Keep only the most recent messages
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// The last `count` messages, oldest first.
    pub fn recent_messages(&self, count: usize) -> impl Iterator<Item = &String> {
        self.messages.iter().skip(self.messages.len().saturating_sub(count))
    }
}

/// What a cell looks like right now: actor, then object, then base, then
/// terrain. Undiscovered cells are blank.
pub fn glyph_at(state: &GameState, pos: Position) -> char {
    let grid = state.grid();
    let Some(cell) = grid.cell(pos) else {
        return UNSEEN_GLYPH;
    };
    if !cell.discovered {
        return UNSEEN_GLYPH;
    }
    if let Some(handle) = cell.actor() {
        return handle.kind.glyph();
    }
    if let Some(object) = grid.object_at(pos) {
        return object.kind.glyph();
    }
    if state.base() == Some(pos) {
        return BASE_GLYPH;
    }
    Terrain {
        floor: cell.floor,
        wall: cell.wall,
    }
    .glyph()
}
