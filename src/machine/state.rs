//! Machine state: accumulator, counter, flags, register file and memory.
//!
//! A [`Machine`] is owned by exactly one engine for the duration of a run.
//! Registers are fixed at construction; memory grows on first touch.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::debug;
use crate::asm::config::MachineConfig;
use crate::word::{LocatedWord, Word, DEFAULT_WIDTH};

/// Addressing granularity for the counter and auto-increment modes.
pub const WORD_SIZE: i128 = 4;

/// A mutable storage slot inside the machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// The implicit accumulator.
    Accumulator,
    /// A declared register, by name.
    Register(String),
    /// A memory cell, by address string.
    Memory(String),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Accumulator => write!(f, "ACC"),
            Slot::Register(name) => write!(f, "{}", name),
            Slot::Memory(addr) => write!(f, "[{}]", addr),
        }
    }
}

/// The simulated machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Program counter, in units of [`WORD_SIZE`].
    pub counter: Word,
    /// Default source/destination for most instructions.
    pub accumulator: Word,
    /// Value last written by an arithmetic or logic instruction.
    pub result: Word,
    /// Stack pointer; only ever read as a snapshot.
    pub stack_pointer: Word,
    /// Carry bit, touched only by the rotate-through-carry instructions.
    pub carry: bool,
    registers: BTreeMap<String, LocatedWord>,
    memory: BTreeMap<String, LocatedWord>,
}

impl Machine {
    /// Build a machine from its initial configuration.
    pub fn new(config: &MachineConfig) -> Self {
        let registers = config.registers
            .iter()
            .map(|(name, value)| (name.clone(), LocatedWord::new(name.clone(), value.clone())))
            .collect();
        let memory = config.memory
            .iter()
            .map(|(addr, value)| (addr.clone(), LocatedWord::new(addr.clone(), value.clone())))
            .collect();

        Self {
            counter: Word::zero(),
            accumulator: Word::zero(),
            result: Word::zero(),
            stack_pointer: config.stack_pointer.clone(),
            carry: config.carry != 0,
            registers,
            memory,
        }
    }

    /// Look up a declared register.
    pub fn register(&self, name: &str) -> Option<&LocatedWord> {
        self.registers.get(name)
    }

    /// Check whether `name` was declared at construction.
    pub fn has_register(&self, name: &str) -> bool {
        self.registers.contains_key(name)
    }

    /// Look up a memory cell without creating it.
    pub fn peek_memory(&self, address: &str) -> Option<&LocatedWord> {
        self.memory.get(address)
    }

    /// Find the cell at `address`, creating a zeroed one on first reference.
    pub fn touch_memory(&mut self, address: &str) -> &LocatedWord {
        if !self.memory.contains_key(address) {
            debug!(address, "allocating memory cell");
        }
        self.memory
            .entry(address.to_string())
            .or_insert_with(|| LocatedWord::zeroed(address))
    }

    /// All registers, sorted by name.
    pub fn registers(&self) -> impl Iterator<Item = &LocatedWord> {
        self.registers.values()
    }

    /// All memory cells touched so far, sorted by address string.
    pub fn memory(&self) -> impl Iterator<Item = &LocatedWord> {
        self.memory.values()
    }

    /// Read the current contents of a slot.
    ///
    /// Unknown registers and untouched memory read as zero.
    pub fn read(&self, slot: &Slot) -> Word {
        match slot {
            Slot::Accumulator => self.accumulator.clone(),
            Slot::Register(name) => self.registers.get(name).map(|r| r.word.clone()).unwrap_or_default(),
            Slot::Memory(addr) => self.memory.get(addr).map(|m| m.word.clone()).unwrap_or_default(),
        }
    }

    /// Overwrite the contents of a slot.
    ///
    /// Writes to undeclared registers are dropped; memory cells are created.
    pub fn write(&mut self, slot: &Slot, value: Word) {
        match slot {
            Slot::Accumulator => self.accumulator = value,
            Slot::Register(name) => {
                if let Some(reg) = self.registers.get_mut(name) {
                    reg.word = value;
                }
            }
            Slot::Memory(addr) => {
                self.memory
                    .entry(addr.clone())
                    .or_insert_with(|| LocatedWord::zeroed(addr.clone()))
                    .word = value;
            }
        }
    }

    /// Capture a display-ready snapshot of the machine.
    pub fn status(&self) -> Status {
        Status {
            counter: WordView::from(&self.counter),
            accumulator: WordView::from(&self.accumulator),
            result: WordView::from(&self.result),
            stack_pointer: WordView::from(&self.stack_pointer),
            carry: self.carry as u8,
            registers: self.registers().map(SlotView::from).collect(),
            memory: self.memory().map(SlotView::from).collect(),
        }
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("counter", self.counter.value())
            .field("accumulator", self.accumulator.value())
            .field("result", self.result.value())
            .field("carry", &(self.carry as u8))
            .field("registers", &self.registers.len())
            .field("memory_cells", &self.memory.len())
            .finish()
    }
}

// ============================================================================
// Status snapshot
// ============================================================================

/// A word as an (integer, binary string) pair.
///
/// The binary string is padded to [`DEFAULT_WIDTH`] digits and never
/// truncated, so it always encodes `value` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordView {
    pub value: Word,
    pub binary: String,
}

impl From<&Word> for WordView {
    fn from(word: &Word) -> Self {
        Self {
            value: word.clone(),
            binary: word.binary(DEFAULT_WIDTH),
        }
    }
}

/// A located word as a (location, integer, binary string) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub location: String,
    pub value: Word,
    pub binary: String,
}

impl From<&LocatedWord> for SlotView {
    fn from(slot: &LocatedWord) -> Self {
        Self {
            location: slot.location.clone(),
            value: slot.word.clone(),
            binary: slot.word.binary(DEFAULT_WIDTH),
        }
    }
}

/// Point-in-time view of a machine, sorted by location for stable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub counter: WordView,
    pub accumulator: WordView,
    pub result: WordView,
    pub stack_pointer: WordView,
    pub carry: u8,
    pub registers: Vec<SlotView>,
    pub memory: Vec<SlotView>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Program counter = {}(0b{})", self.counter.value.value(), self.counter.binary)?;
        writeln!(f, "Accumulator = {}(0b{})", self.accumulator.value.value(), self.accumulator.binary)?;
        writeln!(f, "Result = {}(0b{})", self.result.value.value(), self.result.binary)?;
        writeln!(f, "Carry = {}", self.carry)?;
        writeln!(f, "Memory:")?;
        for m in &self.memory {
            writeln!(f, "{} = {}(0b{})", m.location, m.value.value(), m.binary)?;
        }
        writeln!(f, "Registries:")?;
        for r in &self.registers {
            writeln!(f, "{} = {}(0b{})", r.location, r.value.value(), r.binary)?;
        }
        Ok(())
    }
}
