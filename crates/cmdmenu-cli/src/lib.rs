//! cmdmenu CLI Library
//!
//! Terminal menu for launching configured shell commands.
//! Provides both TUI (ratatui) and headless modes.

pub mod app;
pub mod headless;
pub mod tui;
pub mod ui;
