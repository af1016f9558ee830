//! Decoder and interpreter core for a 64-bit eBPF-style bytecode machine.
//!
//! Programs are flat sequences of 8-byte instruction slots executed against
//! eleven 64-bit registers and a bounded, little-endian data memory. Every
//! run ends in `exit`, a typed [`Fault`], or a caller-imposed step limit.

/// Bounded data memory and access width rules.
pub mod memory;
pub use memory::{validate_access, AccessWidth, Memory, DEFAULT_MEMORY_CAPACITY};

/// Public host-facing API contract and observation types.
pub mod api;
pub use api::{
    CoreConfig, LogTraceSink, MachineState, NoopTraceSink, RecordingTraceSink, RunBoundary,
    RunOutcome, StepOutcome, StopReason, TraceEvent, TraceSink,
};

/// Register file and run state.
pub mod state;
pub use state::{Register, RegisterFile, RunState, REGISTER_COUNT};

/// Opcode assignments and classification table.
pub mod opcode;
pub use opcode::{Opcode, OpcodeClass, OPCODE_TABLE};

/// Bytecode decoding into fixed-width instruction records.
pub mod decoder;
pub use decoder::{decode_program, encode_program, DecodeError, Instruction, INSTRUCTION_WIDTH};

/// Fault taxonomy.
pub mod fault;
pub use fault::{Fault, FaultCode, FaultKind};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{
    commit_execution, execute_instruction, fetch, run, step_one, AluOp, BranchOp, ExecuteState,
    MemoryAccess,
};

/// Interpreter front end and one-shot entry points.
pub mod interpret;
pub use interpret::{interpret, interpret_with_boundary, InterpretError, Interpreter};

/// Program listing.
pub mod disasm;
pub use disasm::{disassemble, DisassemblyRow};

/// Built-in demonstration program.
pub mod sample;
pub use sample::{sample_bytecode, sample_program};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use serde_json as _;
