//! CLI entry point for the bytecode runner.
//!
//! Loads raw bytecode (or the built-in sample program), runs it under a step
//! bound and prints the final register file followed by the outcome.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use ebpf_core::{
    decode_program, disassemble, sample_program, CoreConfig, DecodeError, Instruction,
    Interpreter, MachineState, Register, RunBoundary, RunOutcome, StopReason,
    DEFAULT_MEMORY_CAPACITY,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
use tempfile as _;

const DEFAULT_MAX_STEPS: u64 = 1_000_000;
const MAX_MEMORY_CAPACITY: u64 = 1 << 30;

const EXIT_FAULT: u8 = 1;
const EXIT_LOAD_ERROR: u8 = 2;
const EXIT_STEP_LIMIT: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "ebpf-run")]
#[command(about = "Run eBPF-style bytecode and print the final register file")]
struct Cli {
    /// Raw bytecode file; the built-in sample program runs when omitted
    program: Option<PathBuf>,

    /// Data memory capacity in bytes (at most 1 GiB)
    #[arg(
        long,
        default_value_t = DEFAULT_MEMORY_CAPACITY,
        value_parser = RangedU64ValueParser::<usize>::new().range(0..=MAX_MEMORY_CAPACITY)
    )]
    memory: usize,

    /// Stop after this many retired instructions
    #[arg(long = "max-steps", default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,

    /// Print a disassembly listing before running
    #[arg(long)]
    disasm: bool,

    /// Log every executed instruction to stderr
    #[arg(long)]
    trace: bool,
}

fn init_logging(trace: bool) {
    let default_filter = if trace {
        "warn,ebpf_run=info,ebpf_core=trace"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_program(path: Option<&Path>) -> Result<Vec<Instruction>> {
    let Some(path) = path else {
        info!("no program given, running the built-in sample");
        return Ok(sample_program());
    };

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let program =
        decode_program(&bytes).with_context(|| format!("failed to decode {}", path.display()))?;
    info!(path = %path.display(), instructions = program.len(), "loaded program");
    Ok(program)
}

fn render_load_error(error: &anyhow::Error) -> String {
    error.downcast_ref::<DecodeError>().map_or_else(
        || format!("error: {error:#}"),
        |decode| format!("error [{:#04x}]: {error:#}", decode.fault_code().as_u8()),
    )
}

fn render_listing(program: &[Instruction]) -> String {
    let mut listing = String::new();
    for row in disassemble(program) {
        let _ = writeln!(listing, "{row}");
    }
    listing
}

fn render_registers(state: &MachineState) -> String {
    let mut out = String::new();
    for reg in Register::ALL {
        let _ = writeln!(out, "R{}: {}", reg.index(), state.register(reg));
    }
    out
}

fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome.stop {
        StopReason::Exited => format!("exited after {} instructions", outcome.steps),
        StopReason::Faulted(fault) => format!(
            "fault [{:#04x}]: {fault} after {} instructions",
            fault.code().as_u8(),
            outcome.steps
        ),
        StopReason::StepLimitReached => {
            format!("step limit reached after {} instructions", outcome.steps)
        }
    }
}

const fn exit_code(stop: StopReason) -> u8 {
    match stop {
        StopReason::Exited => 0,
        StopReason::Faulted(_) => EXIT_FAULT,
        StopReason::StepLimitReached => EXIT_STEP_LIMIT,
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let program = load_program(cli.program.as_deref())?;
    if cli.disasm {
        println!("{}", render_listing(&program));
    }

    let config = CoreConfig {
        memory_capacity: cli.memory,
        tracing_enabled: cli.trace,
    };
    let mut interpreter = Interpreter::new(program, &config);
    let outcome = interpreter.run(RunBoundary::StepLimit(cli.max_steps));
    info!(steps = outcome.steps, stop = ?outcome.stop, "run finished");

    print!("{}", render_registers(interpreter.state()));
    println!("{}", render_outcome(&outcome));
    Ok(exit_code(outcome.stop))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.trace);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("{}", render_load_error(&error));
            ExitCode::from(EXIT_LOAD_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebpf_core::{encode_program, Fault, FaultKind, Opcode};

    #[test]
    fn parses_defaults() {
        let cli = Cli::try_parse_from(["ebpf-run"]).expect("no arguments are required");

        assert_eq!(cli.program, None);
        assert_eq!(cli.memory, DEFAULT_MEMORY_CAPACITY);
        assert_eq!(cli.max_steps, DEFAULT_MAX_STEPS);
        assert!(!cli.disasm);
        assert!(!cli.trace);
    }

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "ebpf-run",
            "prog.bin",
            "--memory",
            "128",
            "--max-steps",
            "40",
            "--disasm",
            "--trace",
        ])
        .expect("valid flags");

        assert_eq!(cli.program, Some(PathBuf::from("prog.bin")));
        assert_eq!(cli.memory, 128);
        assert_eq!(cli.max_steps, 40);
        assert!(cli.disasm);
        assert!(cli.trace);
    }

    #[test]
    fn rejects_non_numeric_step_limit() {
        assert!(Cli::try_parse_from(["ebpf-run", "--max-steps", "many"]).is_err());
    }

    #[test]
    fn missing_program_falls_back_to_sample() {
        assert_eq!(load_program(None).expect("sample"), sample_program());
    }

    #[test]
    fn loads_program_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("prog.bin");
        let program = vec![Instruction::new(Opcode::Exit, 0, 0, 0, 0)];
        fs::write(&path, encode_program(&program)).expect("write program");

        assert_eq!(load_program(Some(&path)).expect("decodes"), program);
    }

    #[test]
    fn truncated_file_reports_decode_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("short.bin");
        fs::write(&path, [0x95, 0x00, 0x00]).expect("write program");

        let error = load_program(Some(&path)).expect_err("partial slot");
        let message = format!("{error:#}");

        assert!(message.contains("failed to decode"), "{message}");
        assert!(message.contains("not a multiple of 8"), "{message}");
    }

    #[test]
    fn rejects_memory_above_the_cap() {
        let too_big = (MAX_MEMORY_CAPACITY + 1).to_string();

        assert!(Cli::try_parse_from(["ebpf-run", "--memory", too_big.as_str()]).is_err());
        assert!(Cli::try_parse_from(["ebpf-run", "--memory", "18446744073709551615"]).is_err());
        assert!(Cli::try_parse_from(["ebpf-run", "--memory", "0"]).is_ok());
    }

    #[test]
    fn decode_errors_report_their_fault_code() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("short.bin");
        fs::write(&path, [0x95, 0x00, 0x00]).expect("write program");
        let decode = load_program(Some(&path)).expect_err("partial slot");
        let read = load_program(Some(&dir.path().join("absent.bin"))).expect_err("no file");

        assert!(render_load_error(&decode).starts_with("error [0x01]: failed to decode"));
        assert!(render_load_error(&read).starts_with("error: failed to read"));
    }

    #[test]
    fn renders_every_register_in_order() {
        let mut state = MachineState::default();
        state.registers.set(Register::R0, 11);
        state.registers.set(Register::R10, -3);

        let rendered = render_registers(&state);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "R0: 11");
        assert_eq!(lines[1], "R1: 0");
        assert_eq!(lines[10], "R10: -3");
    }

    #[test]
    fn renders_outcomes_and_exit_codes() {
        let fault = Fault::new(FaultKind::DivisionByZero, 4);
        let faulted = RunOutcome {
            steps: 4,
            stop: StopReason::Faulted(fault),
        };
        let limited = RunOutcome {
            steps: 9,
            stop: StopReason::StepLimitReached,
        };

        assert_eq!(
            render_outcome(&faulted),
            "fault [0x05]: division by zero (pc 4) after 4 instructions"
        );
        assert_eq!(
            render_outcome(&limited),
            "step limit reached after 9 instructions"
        );
        assert_eq!(exit_code(StopReason::Exited), 0);
        assert_eq!(exit_code(faulted.stop), EXIT_FAULT);
        assert_eq!(exit_code(limited.stop), EXIT_STEP_LIMIT);
    }

    #[test]
    fn listing_has_one_line_per_row() {
        let listing = render_listing(&sample_program());

        assert_eq!(listing.lines().count(), 6);
        assert!(listing.starts_with("0000: mov r1, 5\n"));
    }
}
