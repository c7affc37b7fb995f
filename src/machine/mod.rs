//! The accumulator machine.
//!
//! This module implements the complete execution core:
//! - Machine state: accumulator, counter, result, carry, registers, memory
//! - Operand resolution over the addressing-mode grammar
//! - The instruction table and per-operation semantics
//! - The fetch-decode-execute engine

pub mod state;
pub mod operand;
pub mod table;
pub mod ops;
pub mod engine;

pub use state::{Machine, Slot, Status, SlotView, WordView, WORD_SIZE};
pub use operand::{resolve, Operand, ResolveError};
pub use table::{Fallback, InstructionTable, OpSpec, Operation, Param, OPERATIONS};
pub use ops::OpError;
pub use engine::{run_source, Engine, EngineState, ExecError, Step};
