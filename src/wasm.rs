//! WebAssembly bindings for the accumulator machine.
//!
//! Values cross the boundary as decimal strings or JSON, since JavaScript
//! numbers cannot carry a full machine word.

use wasm_bindgen::prelude::*;
use crate::{Engine, MachineConfig, Program};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    engine: Engine,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a machine from a JSON configuration; an empty string gives a blank machine.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmMachine, JsError> {
        let config = if config_json.trim().is_empty() {
            MachineConfig::default()
        } else {
            MachineConfig::from_json(config_json).map_err(|e| JsError::new(&e.to_string()))?
        };
        Ok(Self { engine: Engine::new(Program::default(), config) })
    }

    /// Create a machine with the bundled reference state.
    #[wasm_bindgen]
    pub fn reference() -> WasmMachine {
        Self { engine: Engine::new(Program::default(), MachineConfig::reference()) }
    }

    /// Load program text, resetting the machine. Returns the line count.
    #[wasm_bindgen]
    pub fn load(&mut self, source: &str) -> usize {
        let config = self.engine.config().clone();
        self.engine = Engine::from_source(source, config);
        self.engine.program().len()
    }

    /// Execute one line. Returns the executed line text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let step = self.engine.step().map_err(|e| JsError::new(&e.to_string()))?;
        Ok(step.line)
    }

    /// Run for at most `max_steps` lines. Returns the number executed.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<u32, JsError> {
        let executed = self.engine
            .run_limited(max_steps as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(executed as u32)
    }

    /// Reset to the initial configuration, keeping the program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Check if lines remain to execute.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.engine.state)
    }

    /// Get the program counter as a decimal string.
    #[wasm_bindgen]
    pub fn counter(&self) -> String {
        self.engine.machine.counter.value().to_string()
    }

    /// Get the accumulator as a decimal string.
    #[wasm_bindgen]
    pub fn accumulator(&self) -> String {
        self.engine.machine.accumulator.value().to_string()
    }

    /// Get the carry bit.
    #[wasm_bindgen]
    pub fn carry(&self) -> bool {
        self.engine.machine.carry
    }

    /// Index of the line the counter points at, or -1 past the end.
    #[wasm_bindgen]
    pub fn current_line(&self) -> i32 {
        self.engine.current_line().map_or(-1, |i| i as i32)
    }

    /// Register listing, one `"R1 = 246(0b11110110)"` string per register.
    #[wasm_bindgen]
    pub fn registers(&self) -> js_sys::Array {
        self.engine.machine
            .registers()
            .map(|reg| JsValue::from_str(&reg.to_string()))
            .collect()
    }

    /// Full machine status as JSON.
    #[wasm_bindgen]
    pub fn status_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.engine.machine.status()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Human-readable status report.
    #[wasm_bindgen]
    pub fn status_text(&self) -> String {
        self.engine.machine.status().to_string()
    }

    /// Markdown reference for every supported operation.
    #[wasm_bindgen]
    pub fn docs(&self) -> String {
        crate::render_markdown(self.engine.table())
    }
}
