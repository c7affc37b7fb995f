//! # Accumulator Machine Simulator
//!
//! A tiny, fully in-memory simulator for a line-oriented pseudo-assembly
//! language. Programs run against an accumulator, a program counter, a
//! carry bit, a fixed register file and a sparse memory.
//!
//! ```
//! use accsim::{Engine, MachineConfig};
//!
//! let mut engine = Engine::from_source(
//!     "Load #1204, R1\nAdd (R1),(R2),R5",
//!     MachineConfig::reference(),
//! );
//! engine.run().unwrap();
//! assert_eq!(engine.machine.register("R5").unwrap().value().to_string(), "3748");
//! ```

pub mod word;
pub mod machine;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;


// Re-export commonly used types
pub use word::{LocatedWord, Word};
pub use machine::{Engine, EngineState, ExecError, Machine, Operand, Slot, Status, InstructionTable};
pub use asm::{load_config, render_markdown, MachineConfig, Program, SourceLine};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
