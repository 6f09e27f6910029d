//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `helpers` - Task spawning and panic containment
//! - `render` - Layout and overlay dispatch
//! - `grid` - Character card grid widget
//! - `status` - Status bar widget
//! - `help` - Keybinding help overlay

mod events;
mod grid;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod status;

pub use loop_runner::{run, Action};
