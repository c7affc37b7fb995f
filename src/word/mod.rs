//! Storage model: machine words and their binary projections.
//!
//! This module provides:
//! - [`Word`] - an integer with a selectable-width binary view
//! - [`LocatedWord`] - a word bound to a register name or memory address
//! - [`bits`] - the width-specific kernels behind the logic instructions

mod value;
pub mod bits;

pub use value::{LocatedWord, Word, WordError, DEFAULT_WIDTH};
