//! Markdown reference for the instruction table.
//!
//! Output layout, one section per mnemonic in alphabetical order:
//! ```text
//! ## Add
//! `Add a, b, dest`
//!
//! Adds a and b and stores the result in the destination.
//!
//! `a` - The first value
//! ...
//! Examples:
//! ```
//! The generator reads only static table metadata.

use std::path::Path;
use thiserror::Error;
use crate::machine::table::{InstructionTable, OpSpec};

/// Render the whole table as a Markdown document.
pub fn render_markdown(table: &InstructionTable) -> String {
    let mut out = String::from("# Operations\n\n");
    for spec in table.sorted() {
        render_entry(&mut out, spec);
    }
    out
}

/// Render one table entry.
pub fn render_entry(out: &mut String, spec: &OpSpec) {
    out.push_str(&format!("## {}\n", spec.mnemonic));
    out.push_str(&format!("`{}`\n\n", spec.usage()));

    if !spec.description.is_empty() {
        out.push_str(&format!("{}\n\n", spec.description));
    }

    for param in spec.params {
        out.push_str(&format!("`{}` - {}\n\n", param.name, param.doc));
    }

    if !spec.examples.is_empty() {
        out.push_str("Examples:\n\n");
        for example in spec.examples {
            out.push_str(&format!("```\n{}\n```\n\n", example));
        }
    }
}

/// Render the table and write it to `path`.
pub fn write_markdown<P: AsRef<Path>>(path: P, table: &InstructionTable) -> Result<(), DocError> {
    std::fs::write(path.as_ref(), render_markdown(table))
        .map_err(|e| DocError::IoError(e.to_string()))
}

/// Errors that can occur while writing documentation.
#[derive(Debug, Clone, Error)]
pub enum DocError {
    #[error("I/O error: {0}")]
    IoError(String),
}
