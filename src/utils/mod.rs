//! # Utilities Module
//!
//! Grid algorithms shared by players, scripts and the scheduler: A* paths,
//! downhill distance maps and shadowcast field of view.

pub mod downhill;
pub mod fov;
pub mod pathfinding;

pub use downhill::*;
pub use fov::*;
pub use pathfinding::*;
