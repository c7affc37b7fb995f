//! Execution engine.
//!
//! Implements the fetch-decode-execute loop over a text program. The counter
//! advances by [`WORD_SIZE`] before a line executes, so a taken branch simply
//! overwrites the default advance. Running off the end of the program is the
//! only way to finish.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;
use crate::asm::config::MachineConfig;
use crate::asm::source::{Program, SourceLine};
use crate::machine::operand::{resolve, Operand};
use crate::machine::ops::{self, OpError};
use crate::machine::state::{Machine, WORD_SIZE};
use crate::machine::table::{InstructionTable, Operation};
use crate::word::Word;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Engine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// More lines remain to execute.
    Running,
    /// The counter ran past the last line.
    Finished,
    /// A line failed to decode or execute; the run is over.
    Error,
}

/// Record of one executed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Zero-based line index.
    pub index: usize,
    /// Counter value the line was fetched at.
    pub counter: Word,
    /// The source text of the line.
    pub line: String,
    /// The operation performed, `None` for blank lines.
    pub operation: Option<Operation>,
}

/// A program bound to the machine it runs on.
#[derive(Clone)]
pub struct Engine {
    /// Machine state, exclusively owned for the run.
    pub machine: Machine,
    /// The program being executed.
    program: Program,
    /// Mnemonic lookup.
    table: InstructionTable,
    /// Initial configuration, kept for [`Engine::reset`].
    config: MachineConfig,
    /// Current execution state.
    pub state: EngineState,
    /// Lines executed so far.
    pub steps: u64,
    /// Last executed line (for tracing and debuggers).
    last_step: Option<Step>,
}

impl Engine {
    /// Bind `program` to a fresh machine built from `config`.
    pub fn new(program: Program, config: MachineConfig) -> Self {
        Self::with_table(program, config, InstructionTable::standard())
    }

    /// Parse program text and bind it to a fresh machine.
    pub fn from_source(source: &str, config: MachineConfig) -> Self {
        Self::new(Program::parse(source), config)
    }

    /// Like [`Engine::new`] with a custom instruction table.
    pub fn with_table(program: Program, config: MachineConfig, table: InstructionTable) -> Self {
        let mut engine = Self {
            machine: Machine::new(&config),
            program,
            table,
            config,
            state: EngineState::Running,
            steps: 0,
            last_step: None,
        };
        engine.settle();
        engine
    }

    /// Restore the machine to its initial configuration.
    pub fn reset(&mut self) {
        self.machine = Machine::new(&self.config);
        self.state = EngineState::Running;
        self.steps = 0;
        self.last_step = None;
        self.settle();
    }

    /// First counter value past the end of the program.
    pub fn end_counter(&self) -> BigInt {
        BigInt::from(self.program.len()) * WORD_SIZE
    }

    /// Execute a single line.
    ///
    /// Returns a record of the executed line, or an error that ends the run.
    pub fn step(&mut self) -> Result<Step, ExecError> {
        if self.state != EngineState::Running {
            return Err(ExecError::NotRunning(self.state));
        }

        match self.fetch_and_execute() {
            Ok(step) => {
                self.steps += 1;
                self.last_step = Some(step.clone());
                self.settle();
                Ok(step)
            }
            Err(e) => {
                debug!(error = %e, "run aborted");
                self.state = EngineState::Error;
                Err(e)
            }
        }
    }

    /// Run until the counter passes the last line.
    ///
    /// Returns the number of lines executed. A program that never lets the
    /// counter reach the end runs forever; see [`Engine::run_limited`].
    pub fn run(&mut self) -> Result<u64, ExecError> {
        let start = self.steps;
        while self.state == EngineState::Running {
            self.step()?;
        }
        Ok(self.steps - start)
    }

    /// Run for at most `max_steps` lines.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, ExecError> {
        let start = self.steps;
        let limit = self.steps.saturating_add(max_steps);
        while self.state == EngineState::Running && self.steps < limit {
            self.step()?;
        }
        Ok(self.steps - start)
    }

    fn fetch_and_execute(&mut self) -> Result<Step, ExecError> {
        // Fetch
        let counter = self.machine.counter.clone();
        let index = self.line_index(&counter)?;
        let line = self.program
            .line(index)
            .cloned()
            .ok_or_else(|| ExecError::CounterOutOfRange(counter.clone()))?;

        // Advance before executing so branches can overwrite it
        self.machine.counter = Word::new(counter.value() + WORD_SIZE);

        debug!(counter = %counter.value(), line = %line.text, "fetch");

        // Decode
        let operation = match self.decode(&line)? {
            Some((operation, operands)) => {
                // Execute
                ops::execute(operation, &operands, &mut self.machine).map_err(|source| {
                    ExecError::Operation { line: line.text.clone(), source }
                })?;
                Some(operation)
            }
            None => None,
        };

        Ok(Step {
            index,
            counter,
            line: line.text,
            operation,
        })
    }

    /// Look up, resolve, arity-check and bind one line.
    ///
    /// Every operand resolves before the count is checked, so an unresolved
    /// token wins over a wrong operand count.
    fn decode(&mut self, line: &SourceLine) -> Result<Option<(Operation, Vec<Operand>)>, ExecError> {
        let Some(mnemonic) = line.mnemonic.as_deref() else {
            return Ok(None);
        };

        let spec = self.table
            .lookup(mnemonic)
            .ok_or_else(|| ExecError::UnknownInstruction {
                line: line.text.clone(),
                mnemonic: mnemonic.to_string(),
            })?;

        let mut operands = Vec::with_capacity(spec.max_count());
        let mut failed = Vec::new();
        for token in &line.operands {
            match resolve(token, &mut self.machine) {
                Ok(operand) => operands.push(operand),
                Err(e) => {
                    debug!(token = %token, error = %e, "operand failed to resolve");
                    failed.push(token.clone());
                }
            }
        }
        if !failed.is_empty() {
            return Err(ExecError::UnresolvedOperand {
                line: line.text.clone(),
                tokens: failed,
            });
        }

        if !spec.accepts(operands.len()) {
            return Err(ExecError::ArityMismatch {
                line: line.text.clone(),
                min: spec.required_count(),
                max: spec.max_count(),
                got: operands.len(),
            });
        }

        let operands = spec.bind(operands);
        debug!(
            mnemonic = spec.mnemonic,
            operands = %operands.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(", "),
            "execute"
        );
        Ok(Some((spec.operation, operands)))
    }

    /// Map a counter value to a line index.
    fn line_index(&self, counter: &Word) -> Result<usize, ExecError> {
        if counter.is_negative() {
            return Err(ExecError::CounterOutOfRange(counter.clone()));
        }
        (counter.value() / WORD_SIZE)
            .to_usize()
            .ok_or_else(|| ExecError::CounterOutOfRange(counter.clone()))
    }

    /// Mark the run finished once the counter is past the last line.
    fn settle(&mut self) {
        if self.state == EngineState::Running && *self.machine.counter.value() >= self.end_counter() {
            self.state = EngineState::Finished;
        }
    }

    /// The program being executed.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The instruction table used for decoding.
    pub fn table(&self) -> &InstructionTable {
        &self.table
    }

    /// The configuration the machine was built from.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Index of the line the counter currently points at.
    pub fn current_line(&self) -> Option<usize> {
        self.line_index(&self.machine.counter)
            .ok()
            .filter(|&i| i < self.program.len())
    }

    /// Get the last executed line.
    pub fn last_step(&self) -> Option<&Step> {
        self.last_step.as_ref()
    }

    /// Check if the program ran to completion.
    pub fn is_finished(&self) -> bool {
        self.state == EngineState::Finished
    }

    /// Check if more lines remain.
    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("lines", &self.program.len())
            .field("machine", &self.machine)
            .finish()
    }
}

/// Run program text to completion against a fresh machine.
pub fn run_source(source: &str, config: MachineConfig) -> Result<Machine, ExecError> {
    let mut engine = Engine::from_source(source, config);
    engine.run()?;
    Ok(engine.machine)
}

/// Errors that abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("{line} - invalid command")]
    UnknownInstruction { line: String, mnemonic: String },

    #[error("{line} - failed to evaluate argument(s) {}", .tokens.join(","))]
    UnresolvedOperand { line: String, tokens: Vec<String> },

    #[error("{line} - expected {min} to {max} operands, got {got}")]
    ArityMismatch { line: String, min: usize, max: usize, got: usize },

    #[error("{line} - {source}")]
    Operation {
        line: String,
        #[source]
        source: OpError,
    },

    #[error("counter {} does not address a program line", .0.value())]
    CounterOutOfRange(Word),

    #[error("engine not running: {0:?}")]
    NotRunning(EngineState),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_engine(source: &str) -> Engine {
        Engine::from_source(source, MachineConfig::reference())
    }

    fn w(v: i128) -> Word {
        Word::new(v)
    }

    fn register(engine: &Engine, name: &str) -> Word {
        engine.machine.register(name).unwrap().word.clone()
    }

    fn cell(engine: &Engine, addr: &str) -> Word {
        engine.machine.peek_memory(addr).unwrap().word.clone()
    }

    #[test]
    fn test_reference_program() {
        let mut engine = reference_engine(
            r#"
            Load #1204, R1
            Add (R1),(R2),R5
            "#,
        );

        let executed = engine.run().unwrap();

        assert_eq!(executed, 2);
        assert!(engine.is_finished());
        assert_eq!(register(&engine, "R1"), w(1204));
        assert_eq!(register(&engine, "R2"), w(3240));
        assert_eq!(register(&engine, "R5"), w(3748));
        assert_eq!(cell(&engine, "1204"), w(3240));
        assert_eq!(cell(&engine, "3240"), w(508));
        assert_eq!(engine.machine.result, w(3748));
        assert_eq!(engine.machine.counter, w(8));
    }

    #[test]
    fn test_branch_loop() {
        let mut engine = reference_engine(
            "Load #13, R2\n\
             Load #4, R1\n\
             Add #3, R2\n\
             Decrement R1\n\
             Branch>0 #8\n\
             Load R2, 123",
        );

        engine.run().unwrap();

        assert_eq!(register(&engine, "R2"), w(25));
        assert_eq!(register(&engine, "R1"), w(0));
        assert_eq!(cell(&engine, "123"), w(25));
        assert_eq!(engine.machine.counter, w(24));
        assert_eq!(engine.steps, 2 + 4 * 3 + 1);
    }

    #[test]
    fn test_branch_skips_lines() {
        let mut engine = reference_engine("Clear\nBranch=0 #12\nIncrement\nIncrement");
        engine.run().unwrap();
        assert_eq!(engine.machine.accumulator, w(1));
        assert_eq!(engine.steps, 3);
    }

    #[test]
    fn test_bare_number_branch_target_reads_memory() {
        // `8` names memory cell 8 (value 0), so the branch returns to line 0
        let mut engine = reference_engine("Increment\nBranch>0 8");
        engine.run_limited(4).unwrap();
        assert_eq!(engine.machine.accumulator, w(2));
        assert!(engine.is_running());
    }

    #[test]
    fn test_clear_defaults_to_accumulator() {
        let mut engine = reference_engine("Load #7\nClear");
        engine.run().unwrap();
        assert_eq!(engine.machine.accumulator, w(0));
        assert_eq!(register(&engine, "R1"), w(246));
    }

    #[test]
    fn test_unknown_instruction_halts() {
        let mut engine = reference_engine("Foo 1\nLoad #5, R1");
        let err = engine.run().unwrap_err();

        assert!(matches!(err, ExecError::UnknownInstruction { ref mnemonic, .. } if mnemonic == "foo"));
        assert_eq!(err.to_string(), "Foo 1 - invalid command");
        assert_eq!(engine.state, EngineState::Error);
        assert_eq!(register(&engine, "R1"), w(246));
        assert!(engine.step().is_err());
    }

    #[test]
    fn test_store_without_operand_is_arity_error() {
        let mut engine = reference_engine("Store");
        let err = engine.run().unwrap_err();
        assert!(matches!(err, ExecError::ArityMismatch { min: 1, max: 1, got: 0, .. }));
    }

    #[test]
    fn test_too_many_operands_is_arity_error() {
        let mut engine = reference_engine("Store R1, R2");
        assert!(matches!(engine.run(), Err(ExecError::ArityMismatch { got: 2, .. })));
    }

    #[test]
    fn test_unresolved_operand_reported_before_arity() {
        let mut engine = reference_engine("Store R9, R8");
        let err = engine.run().unwrap_err();
        match &err {
            ExecError::UnresolvedOperand { tokens, .. } => assert_eq!(tokens, &["R9", "R8"]),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.to_string(), "Store R9, R8 - failed to evaluate argument(s) R9,R8");
    }

    #[test]
    fn test_big_literals_flow_through_a_run() {
        let mut engine = reference_engine(
            "Load #18446744073709551616
             Multiply #18446744073709551616
             Load #170141183460469231731687303715884105728, R1",
        );
        engine.run().unwrap();

        let two_128 = BigInt::from(1) << 128u32;
        assert_eq!(engine.machine.accumulator.value(), &two_128);
        assert_eq!(engine.machine.accumulator.value().to_string(), "340282366920938463463374607431768211456");
        assert_eq!(register(&engine, "R1").value(), &(BigInt::from(1) << 127u32));
        assert_eq!(engine.machine.result.value(), &(BigInt::from(1) << 127u32));
    }

    #[test]
    fn test_unresolved_operands_are_named() {
        let mut engine = reference_engine("Add R9, R1, R7");
        let err = engine.run().unwrap_err();
        match &err {
            ExecError::UnresolvedOperand { tokens, .. } => assert_eq!(tokens, &["R9", "R7"]),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.to_string(), "Add R9, R1, R7 - failed to evaluate argument(s) R9,R7");
    }

    #[test]
    fn test_blank_and_comment_lines_occupy_a_slot() {
        let mut engine = reference_engine("Increment\n\n; note\nIncrement");
        let executed = engine.run().unwrap();
        assert_eq!(executed, 4);
        assert_eq!(engine.machine.accumulator, w(2));
        assert_eq!(engine.machine.counter, w(16));
    }

    #[test]
    fn test_empty_program_is_finished() {
        let mut engine = reference_engine("   ");
        assert!(engine.is_finished());
        assert_eq!(engine.run().unwrap(), 0);
    }

    #[test]
    fn test_run_limited_stops_infinite_loop() {
        let mut engine = reference_engine("Increment\nBranch>0 #0");
        let executed = engine.run_limited(10).unwrap();
        assert_eq!(executed, 10);
        assert!(engine.is_running());
        assert_eq!(engine.machine.accumulator, w(5));
    }

    #[test]
    fn test_negative_branch_target() {
        let mut engine = reference_engine("Decrement\nBranch<0 SP\nLoad #1, R1");
        engine.machine.stack_pointer = Word::new(-4);
        let err = engine.run().unwrap_err();
        assert_eq!(err, ExecError::CounterOutOfRange(w(-4)));
    }

    #[test]
    fn test_misaligned_branch_reads_containing_line() {
        // Counter 10 falls inside line 2
        let mut engine = reference_engine("Clear\nBranch=0 #10\nIncrement R1\nIncrement");
        engine.run().unwrap();
        assert_eq!(register(&engine, "R1"), w(247));
        assert_eq!(engine.machine.accumulator, w(1));
        assert_eq!(engine.machine.counter, w(18));
    }

    #[test]
    fn test_step_records_line() {
        let mut engine = reference_engine("Load #1204, R1\nIncrement R1");
        let step = engine.step().unwrap();
        assert_eq!(step.index, 0);
        assert!(step.counter.is_zero());
        assert_eq!(step.operation, Some(Operation::Load));
        assert_eq!(engine.current_line(), Some(1));
        assert_eq!(engine.last_step().unwrap().line, "Load #1204, R1");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut engine = reference_engine("Load #1, R1\nRotateLC #1, R1");
        engine.run().unwrap();
        assert_ne!(register(&engine, "R1"), w(246));
        engine.reset();
        assert!(engine.is_running());
        assert_eq!(register(&engine, "R1"), w(246));
        assert!(engine.machine.carry);
        assert_eq!(engine.steps, 0);
    }

    #[test]
    fn test_rotate_carry_persists_across_lines() {
        let mut config = MachineConfig::default();
        config.registers.insert("R1".into(), w(0b1000_0000));
        let mut engine = Engine::from_source("RotateLC #1, R1\nRotateLC #1, R1", config);
        engine.run().unwrap();
        assert_eq!(register(&engine, "R1"), w(1));
        assert!(!engine.machine.carry);
    }

    #[test]
    fn test_run_source() {
        let machine = run_source("Load #3\nMultiply #5", MachineConfig::default()).unwrap();
        assert_eq!(machine.accumulator, w(15));
        assert_eq!(machine.result, w(15));
    }
}
