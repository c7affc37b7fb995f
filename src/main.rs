//! Accumulator Machine Simulator - CLI Entry Point
//!
//! Commands:
//! - `accsim run <program>` - Run a program to completion
//! - `accsim debug <program>` - Interactive line-stepping debugger
//! - `accsim docs` - Generate the operations reference
//! - `accsim demo` - Run the bundled reference program

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use accsim::{Engine, MachineConfig, Program, Word};

/// The program the simulator ships with.
const DEMO_PROGRAM: &str = "
Load #1204, R1
Add (R1),(R2),R5
";

#[derive(Parser)]
#[command(name = "accsim")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An in-memory simulator for a pseudo-assembly accumulator machine")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until the counter passes its last line
    Run {
        /// Path to the program source
        program: String,
        #[command(flatten)]
        init: InitArgs,
        /// Maximum number of lines to execute (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Print every executed line
        #[arg(short, long)]
        trace: bool,
        /// Print the final status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Step through a program in the terminal debugger
    Debug {
        /// Path to the program source
        program: String,
        #[command(flatten)]
        init: InitArgs,
    },
    /// Generate the Markdown operations reference
    Docs {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run the bundled reference program
    Demo,
}

/// Initial machine state options shared by `run` and `debug`.
#[derive(Args)]
struct InitArgs {
    /// JSON file with registers, memory, stack_pointer and carry
    #[arg(short, long)]
    init: Option<String>,
    /// Register assignment, e.g. R1=246 (repeatable)
    #[arg(long = "reg", value_name = "NAME=VALUE")]
    registers: Vec<String>,
    /// Memory assignment, e.g. 1204=3240 (repeatable)
    #[arg(long = "mem", value_name = "ADDR=VALUE")]
    memory: Vec<String>,
    /// Initial stack pointer (decimal, 0x hex or 0b binary)
    #[arg(long, allow_hyphen_values = true, value_parser = accsim::asm::config::parse_word)]
    sp: Option<Word>,
    /// Initial carry bit (0 or 1)
    #[arg(long, allow_hyphen_values = true)]
    carry: Option<i128>,
}

impl InitArgs {
    /// Merge the file (if any) with command-line overrides.
    fn build(&self) -> Result<MachineConfig, accsim::asm::ConfigError> {
        let mut config = match &self.init {
            Some(path) => accsim::load_config(path)?,
            None => MachineConfig::default(),
        };
        for assignment in &self.registers {
            config.assign_register(assignment)?;
        }
        for assignment in &self.memory {
            config.assign_memory(assignment)?;
        }
        if let Some(sp) = &self.sp {
            config.stack_pointer = sp.clone();
        }
        if let Some(carry) = self.carry {
            config.set_carry(carry)?;
        }
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, init, max_steps, trace, json }) => {
            let config = load_init(&init);
            let source = read_source(&program);
            run_program(&source, config, max_steps, trace, json);
        }
        Some(Commands::Debug { program, init }) => {
            let config = load_init(&init);
            let source = read_source(&program);
            debug_program(&source, config);
        }
        Some(Commands::Docs { output }) => {
            generate_docs(output);
        }
        Some(Commands::Demo) => {
            run_program(DEMO_PROGRAM, MachineConfig::reference(), 10_000, false, false);
        }
        None => {
            println!("Accumulator Machine Simulator v0.1.0");
            println!();
            println!("Use --help for available commands");
            println!();
            run_program(DEMO_PROGRAM, MachineConfig::reference(), 10_000, false, false);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_init(init: &InitArgs) -> MachineConfig {
    match init.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid initial state: {}", e);
            std::process::exit(1);
        }
    }
}

fn read_source(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(source: &str, config: MachineConfig, max_steps: u64, trace: bool, json: bool) {
    let program = Program::parse(source);
    let mut engine = Engine::new(program, config);

    if !json {
        println!("Current program:");
        for line in engine.program().lines() {
            println!("    {}", line);
        }
        println!();
        println!("━━━ Status before running ━━━");
        print!("{}", engine.machine.status());
        println!();
        println!("━━━ Execution ━━━");
    }

    let mut steps = 0u64;
    while engine.is_running() && steps < max_steps {
        match engine.step() {
            Ok(step) => {
                if trace {
                    println!(
                        "{:04}: {:<24} ACC={} RES={} C={}",
                        step.counter.value(),
                        step.line,
                        engine.machine.accumulator.value(),
                        engine.machine.result.value(),
                        engine.machine.carry as u8,
                    );
                }
                steps += 1;
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&engine.machine.status()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode status: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Executed {} lines ({:?})", steps, engine.state);
        println!();
        println!("━━━ Status after running ━━━");
        print!("{}", engine.machine.status());
    }

    if engine.is_running() {
        eprintln!();
        eprintln!("⚠️  Reached max steps limit ({}). Use --max-steps to increase.", max_steps);
    }
}

#[cfg(feature = "tui")]
fn debug_program(source: &str, config: MachineConfig) {
    let program = Program::parse(source);
    if program.is_empty() {
        eprintln!("❌ No lines to execute");
        std::process::exit(1);
    }

    if let Err(e) = accsim::run_debugger(program, config) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_source: &str, _config: MachineConfig) {
    eprintln!("❌ This build has no debugger; rebuild with the `tui` feature");
    std::process::exit(1);
}

fn generate_docs(output: Option<String>) {
    let table = accsim::InstructionTable::standard();
    match output {
        Some(path) => {
            if let Err(e) = accsim::asm::write_markdown(&path, &table) {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
            println!("✓ Wrote {}", path);
        }
        None => print!("{}", accsim::render_markdown(&table)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_init_values_parse() {
        let cli = Cli::try_parse_from(["accsim", "run", "prog.asm", "--sp", "-4", "--carry", "-1"]).unwrap();
        let Some(Commands::Run { init, .. }) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(init.sp, Some(Word::new(-4)));
        assert_eq!(init.carry, Some(-1));
        assert!(init.build().is_err());
    }

    #[test]
    fn test_sp_accepts_wide_values() {
        let cli = Cli::try_parse_from(["accsim", "debug", "prog.asm", "--sp", "-0x100000000000000000000000000000000"]).unwrap();
        let Some(Commands::Debug { init, .. }) = cli.command else {
            panic!("expected the debug command");
        };
        let config = init.build().unwrap();
        assert_eq!(config.stack_pointer.value().to_string(), "-340282366920938463463374607431768211456");
    }
}
