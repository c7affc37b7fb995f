//! Program text decoding.
//!
//! Syntax:
//! ```text
//! Load #1204, R1      ; mnemonic, then comma-separated operands
//! Add (R1),(R2),R5    ; whitespace inside the operand list is ignored
//! Clear               ; operands may be omitted where defaults exist
//! ```
//! Decoding is purely textual: mnemonics are case-folded but not looked up,
//! and operand tokens are not resolved until the line executes.

use std::fmt;
use serde::{Serialize, Deserialize};

/// One decoded program line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    /// The line as written, trimmed.
    pub text: String,
    /// Lower-cased mnemonic; `None` for blank or comment-only lines.
    pub mnemonic: Option<String>,
    /// Raw operand tokens with whitespace removed.
    pub operands: Vec<String>,
}

impl SourceLine {
    /// Decode a single line of program text.
    pub fn decode(line: &str) -> Self {
        let text = line.trim().to_string();

        let code = match text.find(';') {
            Some(idx) => text[..idx].trim(),
            None => text.as_str(),
        };

        if code.is_empty() {
            return Self { text, mnemonic: None, operands: Vec::new() };
        }

        let (mnemonic, rest) = match code.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest),
            None => (code, ""),
        };

        let packed: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
        let operands = if packed.is_empty() {
            Vec::new()
        } else {
            packed.split(',').map(str::to_string).collect()
        };

        Self {
            mnemonic: Some(mnemonic.to_lowercase()),
            operands,
            text,
        }
    }

    /// Whether the line carries an instruction.
    pub fn is_instruction(&self) -> bool {
        self.mnemonic.is_some()
    }
}

impl fmt::Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// An ordered sequence of program lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    lines: Vec<SourceLine>,
}

impl Program {
    /// Split program text into lines.
    ///
    /// Leading and trailing blank space around the whole program is dropped;
    /// interior blank lines are kept so line positions stay stable.
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.is_empty() {
            return Self::default();
        }
        Self {
            lines: source.lines().map(SourceLine::decode).collect(),
        }
    }

    /// Number of lines, blank ones included.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line at `index`, if any.
    pub fn line(&self, index: usize) -> Option<&SourceLine> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        let line = SourceLine::decode("  Load #1204, R1  ");
        assert_eq!(line.mnemonic.as_deref(), Some("load"));
        assert_eq!(line.operands, vec!["#1204", "R1"]);
        assert_eq!(line.text, "Load #1204, R1");
    }

    #[test]
    fn test_decode_strips_comment_and_spaces() {
        let line = SourceLine::decode("Add ( R1 ) , (R2),R5 ; sum two cells");
        assert_eq!(line.mnemonic.as_deref(), Some("add"));
        assert_eq!(line.operands, vec!["(R1)", "(R2)", "R5"]);
    }

    #[test]
    fn test_decode_no_operands() {
        let line = SourceLine::decode("CLEAR ;zero the accumulator");
        assert_eq!(line.mnemonic.as_deref(), Some("clear"));
        assert!(line.operands.is_empty());
    }

    #[test]
    fn test_decode_blank_and_comment_lines() {
        assert!(!SourceLine::decode("").is_instruction());
        assert!(!SourceLine::decode("   ; just a note").is_instruction());
    }

    #[test]
    fn test_trailing_comma_yields_empty_token() {
        let line = SourceLine::decode("Load #1,");
        assert_eq!(line.operands, vec!["#1", ""]);
    }

    #[test]
    fn test_program_parse() {
        let program = Program::parse(
            r#"
            Load #1204, R1

            Add (R1),(R2),R5
            "#,
        );
        assert_eq!(program.len(), 3);
        assert!(!program.line(1).unwrap().is_instruction());
        assert_eq!(program.line(2).unwrap().mnemonic.as_deref(), Some("add"));
    }

    #[test]
    fn test_program_parse_empty() {
        assert!(Program::parse("  \n \n").is_empty());
    }
}
