//! Operand resolution.
//!
//! Grammar, tried in order against the trimmed token:
//! ```text
//! #<digits>        decimal immediate
//! #%<[01]+>        binary immediate
//! #%<[0-9A-F]+>    hexadecimal immediate
//! R<digits>        declared register
//! <digits>         memory cell (created on first reference)
//! SP               stack pointer snapshot
//! (<inner>)        memory cell addressed by <inner>
//! (<inner>)+       as above, then <inner> += WORD_SIZE
//! -(<inner>)       <inner> -= WORD_SIZE, then memory cell addressed by <inner>
//! ```
//! `#%` literals made only of 0 and 1 always read as binary.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;
use crate::machine::state::{Machine, Slot, WORD_SIZE};
use crate::word::Word;

/// A resolved operand: a fresh value or a live slot in the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// A value with no storage behind it. Writes to it are discarded.
    Immediate(Word),
    /// A register, memory cell or the accumulator.
    Slot(Slot),
}

impl Operand {
    /// Current value of the operand.
    pub fn value(&self, machine: &Machine) -> Word {
        match self {
            Operand::Immediate(word) => word.clone(),
            Operand::Slot(slot) => machine.read(slot),
        }
    }

    /// The slot behind this operand, if it has one.
    pub fn slot(&self) -> Option<&Slot> {
        match self {
            Operand::Immediate(_) => None,
            Operand::Slot(slot) => Some(slot),
        }
    }

    /// Write `value` through the operand. Immediates absorb the write.
    pub fn store(&self, machine: &mut Machine, value: Word) {
        if let Operand::Slot(slot) = self {
            machine.write(slot, value);
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(word) => write!(f, "#{}", word.value()),
            Operand::Slot(slot) => write!(f, "{}", slot),
        }
    }
}

/// Resolve one operand token against the machine.
///
/// Auto-increment and auto-decrement forms mutate their inner slot as a
/// side effect of resolution, and memory cells are created on first touch.
pub fn resolve(token: &str, machine: &mut Machine) -> Result<Operand, ResolveError> {
    let token = token.trim();
    let unresolved = || ResolveError::Unresolved(token.to_string());

    if let Some(digits) = token.strip_prefix("#%") {
        if is_digits(digits, |c| c == b'0' || c == b'1') {
            debug!(token, "binary immediate");
            return parse_radix(token, digits, 2);
        }
        if is_digits(digits, |c| c.is_ascii_digit() || (b'A'..=b'F').contains(&c)) {
            debug!(token, "hexadecimal immediate");
            return parse_radix(token, digits, 16);
        }
        return Err(unresolved());
    }

    if let Some(digits) = token.strip_prefix('#') {
        if is_digits(digits, |c| c.is_ascii_digit()) {
            debug!(token, "decimal immediate");
            return parse_radix(token, digits, 10);
        }
        return Err(unresolved());
    }

    if let Some(digits) = token.strip_prefix('R') {
        if is_digits(digits, |c| c.is_ascii_digit()) {
            debug!(token, "register");
            return if machine.has_register(token) {
                Ok(Operand::Slot(Slot::Register(token.to_string())))
            } else {
                Err(unresolved())
            };
        }
    }

    if is_digits(token, |c| c.is_ascii_digit()) {
        debug!(token, "memory");
        machine.touch_memory(token);
        return Ok(Operand::Slot(Slot::Memory(token.to_string())));
    }

    if token == "SP" {
        debug!(token, "stack pointer");
        return Ok(Operand::Immediate(machine.stack_pointer.clone()));
    }

    if let Some(inner) = token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        if !inner.is_empty() {
            debug!(token, "indirect memory");
            let address = resolve(inner, machine)?.value(machine);
            return Ok(memory_at(machine, &address));
        }
    }

    if let Some(inner) = token.strip_prefix('(').and_then(|t| t.strip_suffix(")+")) {
        if !inner.is_empty() {
            debug!(token, "indirect memory with post-increment");
            let pointer = resolve(inner, machine)?;
            let address = pointer.value(machine);
            let cell = memory_at(machine, &address);
            pointer.store(machine, Word::new(address.value() + WORD_SIZE));
            return Ok(cell);
        }
    }

    if let Some(inner) = token.strip_prefix("-(").and_then(|t| t.strip_suffix(')')) {
        if !inner.is_empty() {
            debug!(token, "indirect memory with pre-decrement");
            let pointer = resolve(inner, machine)?;
            let address = Word::new(pointer.value(machine).value() - WORD_SIZE);
            pointer.store(machine, address.clone());
            return Ok(memory_at(machine, &address));
        }
    }

    Err(unresolved())
}

/// Slot for the memory cell at a numeric address, creating it if needed.
fn memory_at(machine: &mut Machine, address: &Word) -> Operand {
    let location = address.value().to_string();
    machine.touch_memory(&location);
    Operand::Slot(Slot::Memory(location))
}

fn is_digits(text: &str, class: impl Fn(u8) -> bool) -> bool {
    !text.is_empty() && text.bytes().all(class)
}

fn parse_radix(token: &str, digits: &str, radix: u32) -> Result<Operand, ResolveError> {
    Word::from_str_radix(digits, radix)
        .map(Operand::Immediate)
        .ok_or_else(|| ResolveError::Unresolved(token.to_string()))
}

/// Errors that can occur while resolving an operand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The token matches no addressing mode, or names an undeclared register.
    #[error("cannot resolve operand {0:?}")]
    Unresolved(String),
}

impl ResolveError {
    /// The token that failed to resolve.
    pub fn token(&self) -> &str {
        match self {
            ResolveError::Unresolved(t) => t,
        }
    }
}
