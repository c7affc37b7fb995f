//! Program text, machine configuration and instruction documentation.
//!
//! This module provides:
//! - Line decoding (text → mnemonic + operand tokens)
//! - Initial machine configuration (JSON files and `NAME=VALUE` assignments)
//! - A Markdown reference generator for the instruction table

pub mod source;
pub mod config;
pub mod docgen;

pub use source::{Program, SourceLine};
pub use config::{load_config, parse_assignment, parse_word, ConfigError, MachineConfig};
pub use docgen::{render_markdown, write_markdown, DocError};
