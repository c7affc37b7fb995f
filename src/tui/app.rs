//! Debugger application state and logic.

use crate::{Engine, MachineConfig, Program};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The engine being debugged.
    pub engine: Engine,
    /// Breakpoints (by line index).
    pub breakpoints: HashSet<usize>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
    /// Let the next tick pass a breakpoint on the current line.
    resume: bool,
}

impl DebuggerApp {
    /// Create a new debugger for a program.
    pub fn new(program: Program, config: MachineConfig) -> Self {
        Self {
            engine: Engine::new(program, config),
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
            resume: false,
        }
    }

    /// Step one line.
    pub fn step(&mut self) {
        if !self.engine.is_running() {
            self.status = format!("Machine stopped: {:?}", self.engine.state);
            self.running = false;
            return;
        }

        match self.engine.step() {
            Ok(step) => {
                self.status = format!("{:04}: {}", step.counter.value(), step.line);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until finished, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.resume = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.engine.is_running() {
            self.running = false;
            self.status = format!("Finished after {} lines", self.engine.steps);
            return;
        }

        // Breakpoints stop before their line executes
        if let Some(line) = self.engine.current_line() {
            if self.breakpoints.contains(&line) && !self.resume {
                self.running = false;
                self.status = format!("Breakpoint at line {}", line + 1);
                return;
            }
        }
        self.resume = false;

        self.step();
    }

    /// Toggle breakpoint at the current line.
    pub fn toggle_breakpoint(&mut self) {
        let Some(line) = self.engine.current_line() else {
            self.status = "No line under the counter".into();
            return;
        };
        if self.breakpoints.remove(&line) {
            self.status = format!("Removed breakpoint at line {}", line + 1);
        } else {
            self.breakpoints.insert(line);
            self.status = format!("Set breakpoint at line {}", line + 1);
        }
    }

    /// Reset the machine to its initial state.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Program lines around the current one: (index, text, is_current).
    pub fn listing(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let current = self.engine.current_line();
        let anchor = current.unwrap_or(self.engine.program().len());
        let start = anchor.saturating_sub(lines / 2);

        self.engine
            .program()
            .lines()
            .iter()
            .enumerate()
            .skip(start)
            .take(lines)
            .map(|(i, line)| (i, line.text.clone(), Some(i) == current))
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Program, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, config);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.mem_scroll = app.mem_scroll.saturating_sub(1),
                        KeyCode::Down => {
                            if app.mem_scroll + 1 < app.engine.machine.memory().count() {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
