//! Public host-facing API contracts for embedding the interpreter core.

use crate::memory::{AccessWidth, Memory, DEFAULT_MEMORY_CAPACITY};
use crate::state::{Register, RegisterFile, RunState};
use crate::{Fault, Instruction};

/// Top-level immutable configuration for one interpretation run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Data memory capacity in bytes.
    pub memory_capacity: usize,
    /// Forwards per-instruction trace events to `tracing` at `TRACE` level.
    pub tracing_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            tracing_enabled: false,
        }
    }
}

/// Complete machine state of one run: registers, memory, program counter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineState {
    /// General-purpose registers.
    pub registers: RegisterFile,
    /// Data memory.
    pub memory: Memory,
    /// Index of the next instruction to fetch.
    pub pc: i64,
    /// Current execution state.
    pub run_state: RunState,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl MachineState {
    /// Creates a zeroed machine sized by `config`, ready to run from `pc = 0`.
    #[must_use]
    pub fn with_config(config: &CoreConfig) -> Self {
        Self {
            registers: RegisterFile::default(),
            memory: Memory::new(config.memory_capacity),
            pc: 0,
            run_state: RunState::Running,
        }
    }

    /// Reads one register.
    #[must_use]
    pub const fn register(&self, reg: Register) -> i64 {
        self.registers.get(reg)
    }
}

/// Output status from one instruction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired; the run continues.
    Retired,
    /// `exit` retired; the run is over.
    Exited,
    /// Fault raised or already latched.
    Fault {
        /// Fault that stopped the run.
        fault: Fault,
    },
}

/// Stop conditions for batched execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunBoundary {
    /// Run until `exit` or a fault. Never returns on a program that loops.
    Exit,
    /// Additionally stop after this many retired instructions.
    StepLimit(u64),
}

/// Why a batched run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// `exit` retired.
    Exited,
    /// A fault stopped the run.
    Faulted(Fault),
    /// The step limit was reached while still running.
    StepLimitReached,
}

/// Aggregated outcome from running until a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Number of retired instructions during this call, `exit` included.
    pub steps: u64,
    /// Reason the run returned.
    pub stop: StopReason,
}

/// Deterministic trace events emitted at step boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// Instruction fetched and about to execute.
    InstructionStart {
        /// Program counter of the fetched instruction.
        pc: i64,
        /// Decoded instruction record.
        instruction: Instruction,
    },
    /// Data memory access in commit order.
    MemoryAccess {
        /// Effective address.
        addr: i64,
        /// Access width.
        width: AccessWidth,
        /// Raw little-endian value read or written.
        value: u64,
        /// True for writes, false for reads.
        is_write: bool,
    },
    /// Non-terminal instruction retired.
    InstructionRetired {
        /// Program counter of the retired instruction.
        pc: i64,
        /// Program counter after commit.
        next_pc: i64,
    },
    /// `exit` retired.
    Exited {
        /// Program counter of the `exit` instruction.
        pc: i64,
    },
    /// Fault raised.
    FaultRaised {
        /// Raised fault.
        fault: Fault,
    },
}

/// Observer for trace events; the engine itself performs no I/O.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::InstructionStart { pc, instruction } => tracing::trace!(
                pc,
                opcode = instruction.opcode,
                dst = instruction.dst,
                src = instruction.src,
                offset = instruction.offset,
                imm = instruction.imm,
                "fetch"
            ),
            TraceEvent::MemoryAccess {
                addr,
                width,
                value,
                is_write,
            } => tracing::trace!(addr, width = width.bytes(), value, is_write, "memory"),
            TraceEvent::InstructionRetired { pc, next_pc } => {
                tracing::trace!(pc, next_pc, "retired");
            }
            TraceEvent::Exited { pc } => tracing::debug!(pc, "exit"),
            TraceEvent::FaultRaised { fault } => {
                tracing::debug!(pc = fault.pc, code = fault.code().as_u8(), %fault, "fault");
            }
        }
    }
}

/// Sink that records every event, for tests and offline inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingTraceSink {
    /// Events in execution order.
    pub events: Vec<TraceEvent>,
}

impl TraceSink for RecordingTraceSink {
    fn on_event(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CoreConfig, MachineState, RecordingTraceSink, TraceEvent, TraceSink,
    };
    use crate::memory::DEFAULT_MEMORY_CAPACITY;
    use crate::state::{Register, RunState};

    #[test]
    fn default_core_config_uses_64kib_and_no_tracing() {
        let config = CoreConfig::default();

        assert_eq!(config.memory_capacity, DEFAULT_MEMORY_CAPACITY);
        assert!(!config.tracing_enabled);
    }

    #[test]
    fn machine_state_is_sized_by_config() {
        let config = CoreConfig {
            memory_capacity: 128,
            ..CoreConfig::default()
        };
        let state = MachineState::with_config(&config);

        assert_eq!(state.memory.capacity(), 128);
        assert_eq!(state.pc, 0);
        assert_eq!(state.run_state, RunState::Running);
        for reg in Register::ALL {
            assert_eq!(state.register(reg), 0);
        }
    }

    #[test]
    fn recording_sink_preserves_order() {
        let mut sink = RecordingTraceSink::default();
        sink.on_event(TraceEvent::Exited { pc: 1 });
        sink.on_event(TraceEvent::Exited { pc: 2 });

        assert_eq!(
            sink.events,
            vec![TraceEvent::Exited { pc: 1 }, TraceEvent::Exited { pc: 2 }]
        );
    }
}
