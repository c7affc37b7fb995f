//! TUI debugger for the accumulator machine.
//!
//! Provides an interactive terminal-based debugger with:
//! - Program listing with the current line marked
//! - Accumulator, result, carry and register views
//! - Memory view of every touched cell
//! - Step/run/breakpoint controls

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
