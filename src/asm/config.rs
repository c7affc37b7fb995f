//! Initial machine configuration.
//!
//! A configuration is a small JSON document:
//! ```json
//! {
//!   "registers": { "R1": 246, "R2": 3240 },
//!   "memory": { "1204": 3240 },
//!   "stack_pointer": 0,
//!   "carry": 1
//! }
//! ```
//! Every key is optional. The register map is the complete register file
//! for the run; memory outside the map is created on demand. Values too large
//! for a JSON number may be given as decimal strings.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::word::Word;

/// Initial register, memory, stack pointer and carry values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Register name -> initial value.
    pub registers: BTreeMap<String, Word>,
    /// Memory address -> initial value.
    pub memory: BTreeMap<String, Word>,
    /// Initial stack pointer.
    pub stack_pointer: Word,
    /// Initial carry bit (0 or 1).
    pub carry: u8,
}

impl MachineConfig {
    /// The state the bundled demo program starts from.
    pub fn reference() -> Self {
        Self {
            registers: BTreeMap::from([
                ("R1".to_string(), Word::new(0b1111_0110)),
                ("R2".to_string(), Word::new(3240)),
                ("R5".to_string(), Word::new(2032)),
            ]),
            memory: BTreeMap::from([
                ("1204".to_string(), Word::new(3240)),
                ("3240".to_string(), Word::new(508)),
            ]),
            stack_pointer: Word::zero(),
            carry: 1,
        }
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.carry > 1 {
            return Err(ConfigError::InvalidCarry(self.carry as i128));
        }
        Ok(())
    }

    /// Apply a `NAME=VALUE` register assignment.
    pub fn assign_register(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (name, value) = parse_assignment(assignment)?;
        self.registers.insert(name, value);
        Ok(())
    }

    /// Apply an `ADDRESS=VALUE` memory assignment.
    pub fn assign_memory(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (addr, value) = parse_assignment(assignment)?;
        self.memory.insert(addr, value);
        Ok(())
    }

    /// Set the carry bit from an integer, rejecting anything but 0 and 1.
    pub fn set_carry(&mut self, carry: i128) -> Result<(), ConfigError> {
        match carry {
            0 | 1 => {
                self.carry = carry as u8;
                Ok(())
            }
            other => Err(ConfigError::InvalidCarry(other)),
        }
    }
}

/// Load a configuration file from disk.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MachineConfig, ConfigError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ConfigError::IoError(e.to_string()))?;
    MachineConfig::from_json(&text)
}

/// Split `KEY=VALUE`, accepting decimal, `0x` hex and `0b` binary values.
pub fn parse_assignment(text: &str) -> Result<(String, Word), ConfigError> {
    let invalid = || ConfigError::InvalidAssignment(text.to_string());

    let (key, value) = text.split_once('=').ok_or_else(invalid)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid());
    }
    let value = parse_word(value).map_err(|_| invalid())?;
    Ok((key.to_string(), value))
}

/// Parse a decimal, `0x` hex or `0b` binary integer of any size.
pub fn parse_word(text: &str) -> Result<Word, ConfigError> {
    let value = text.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    if digits.starts_with('-') {
        return Err(ConfigError::InvalidValue(text.to_string()));
    }
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Word::from_str_radix(hex, 16)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        Word::from_str_radix(bin, 2)
    } else {
        Word::from_str_radix(digits, 10)
    }
    .ok_or_else(|| ConfigError::InvalidValue(text.to_string()))?;

    Ok(if negative { Word::new(-magnitude.value()) } else { magnitude })
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid configuration JSON: {0}")]
    Json(String),

    #[error("invalid assignment {0:?}, expected NAME=VALUE")]
    InvalidAssignment(String),

    #[error("invalid integer value {0:?}")]
    InvalidValue(String),

    #[error("carry bit must be 0 or 1, got {0}")]
    InvalidCarry(i128),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("R1=246").unwrap(), ("R1".to_string(), Word::new(246)));
        assert_eq!(parse_assignment(" 1204 = 0xCA8 ").unwrap(), ("1204".to_string(), Word::new(3240)));
        assert_eq!(parse_assignment("R3=0b1010").unwrap(), ("R3".to_string(), Word::new(10)));
        assert_eq!(parse_assignment("R4=-7").unwrap(), ("R4".to_string(), Word::new(-7)));
        assert!(parse_assignment("R1").is_err());
        assert!(parse_assignment("=4").is_err());
        assert!(parse_assignment("R1=abc").is_err());
        assert!(parse_assignment("R1=--4").is_err());
    }

    #[test]
    fn test_parse_word_any_size() {
        let (_, value) = parse_assignment("R1=340282366920938463463374607431768211456").unwrap();
        assert_eq!(value.value().to_string(), "340282366920938463463374607431768211456");
        assert_eq!(parse_word("-0x10").unwrap(), Word::new(-16));
        assert_eq!(parse_word("x"), Err(ConfigError::InvalidValue("x".to_string())));
    }

    #[test]
    fn test_from_json_partial() {
        let config = MachineConfig::from_json(r#"{ "registers": { "R1": 5 }, "carry": 1 }"#).unwrap();
        assert_eq!(config.registers["R1"], Word::new(5));
        assert!(config.memory.is_empty());
        assert!(config.stack_pointer.is_zero());
        assert_eq!(config.carry, 1);
    }

    #[test]
    fn test_invalid_carry_rejected() {
        let err = MachineConfig::from_json(r#"{ "carry": 2 }"#).unwrap_err();
        assert_eq!(err, ConfigError::InvalidCarry(2));

        let mut config = MachineConfig::default();
        assert!(config.set_carry(-1).is_err());
        config.set_carry(1).unwrap();
        assert_eq!(config.carry, 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = MachineConfig::reference();
        let text = config.to_json().unwrap();
        assert_eq!(MachineConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_json_accepts_big_values_as_strings() {
        let config = MachineConfig::from_json(
            r#"{ "memory": { "8": "18446744073709551616" }, "stack_pointer": -4 }"#,
        ).unwrap();
        assert_eq!(config.memory["8"].value().to_string(), "18446744073709551616");
        assert_eq!(config.stack_pointer, Word::new(-4));
    }

    #[test]
    fn test_reference_state() {
        let config = MachineConfig::reference();
        assert_eq!(config.registers["R1"], Word::new(246));
        assert_eq!(config.memory["3240"], Word::new(508));
        assert_eq!(config.carry, 1);
    }
}
