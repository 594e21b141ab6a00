//! # Rendering Module
//!
//! Text output for the simulation. The core pushes events; the presenter
//! drains them and repaints only what changed.

pub mod display;

pub use display::*;
