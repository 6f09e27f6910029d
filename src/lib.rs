//! Terminal browser for the Rick and Morty character API.
//!
//! The [`feed`] module holds the paging and enrichment core; everything else
//! is the terminal front end around it.

pub mod api;
pub mod app;
pub mod config;
pub mod feed;
pub mod keybindings;
pub mod theme;
pub mod ui;
pub mod util;
