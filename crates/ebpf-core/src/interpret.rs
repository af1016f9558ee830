//! Host-facing interpreter over a decoded program.

use thiserror::Error;
use tracing::debug;

use crate::api::{
    CoreConfig, LogTraceSink, MachineState, NoopTraceSink, RunBoundary, RunOutcome, StepOutcome,
    StopReason, TraceSink,
};
use crate::decoder::{decode_program, DecodeError, Instruction};
use crate::execute::{run, step_one};
use crate::Fault;

/// Owns a decoded program and the machine state executing it.
#[derive(Debug, Clone)]
pub struct Interpreter {
    program: Vec<Instruction>,
    state: MachineState,
    tracing_enabled: bool,
}

impl Interpreter {
    /// Creates an interpreter with a fresh machine sized by `config`.
    #[must_use]
    pub fn new(program: Vec<Instruction>, config: &CoreConfig) -> Self {
        Self::with_state(program, MachineState::with_config(config), config)
    }

    /// Creates an interpreter resuming from an existing machine state.
    ///
    /// Use this to seed registers or memory before running.
    #[must_use]
    pub const fn with_state(
        program: Vec<Instruction>,
        state: MachineState,
        config: &CoreConfig,
    ) -> Self {
        Self {
            program,
            state,
            tracing_enabled: config.tracing_enabled,
        }
    }

    /// Current machine state.
    #[must_use]
    pub const fn state(&self) -> &MachineState {
        &self.state
    }

    /// Consumes the interpreter and returns its final state.
    #[must_use]
    pub fn into_state(self) -> MachineState {
        self.state
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> StepOutcome {
        if self.tracing_enabled {
            self.step_with_sink(&mut LogTraceSink)
        } else {
            self.step_with_sink(&mut NoopTraceSink)
        }
    }

    /// Executes one instruction, reporting trace events to `sink`.
    pub fn step_with_sink(&mut self, sink: &mut dyn TraceSink) -> StepOutcome {
        step_one(&self.program, &mut self.state, sink)
    }

    /// Runs until `exit`, a fault, or the boundary.
    pub fn run(&mut self, boundary: RunBoundary) -> RunOutcome {
        if self.tracing_enabled {
            self.run_with_sink(boundary, &mut LogTraceSink)
        } else {
            self.run_with_sink(boundary, &mut NoopTraceSink)
        }
    }

    /// Runs until `exit`, a fault, or the boundary, reporting trace events to
    /// `sink`.
    pub fn run_with_sink(&mut self, boundary: RunBoundary, sink: &mut dyn TraceSink) -> RunOutcome {
        run(&self.program, &mut self.state, boundary, sink)
    }
}

/// Failure of a one-shot [`interpret`] call.
///
/// Runtime variants keep the machine state as it was when the run stopped.
#[derive(Debug, Error)]
pub enum InterpretError {
    /// Bytecode could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Execution faulted.
    #[error("execution faulted: {fault}")]
    Fault {
        /// Fault that stopped the run.
        fault: Fault,
        /// State after the last retired instruction.
        state: Box<MachineState>,
    },
    /// The step limit was reached before `exit`.
    #[error("step limit reached after {steps} instructions")]
    StepLimit {
        /// Retired instructions.
        steps: u64,
        /// State when the limit was reached.
        state: Box<MachineState>,
    },
}

impl InterpretError {
    /// Machine state at the point the run stopped, if execution started.
    #[must_use]
    pub fn state(&self) -> Option<&MachineState> {
        match self {
            Self::Decode(_) => None,
            Self::Fault { state, .. } | Self::StepLimit { state, .. } => Some(&**state),
        }
    }
}

/// Decodes `bytecode` and runs it until `exit`.
///
/// Never returns on a program that loops forever; see
/// [`interpret_with_boundary`].
///
/// # Errors
///
/// Returns [`InterpretError::Decode`] for malformed bytecode and
/// [`InterpretError::Fault`] when execution faults.
pub fn interpret(bytecode: &[u8], config: &CoreConfig) -> Result<MachineState, InterpretError> {
    interpret_with_boundary(bytecode, config, RunBoundary::Exit)
}

/// Decodes `bytecode` and runs it until `exit` or `boundary`.
///
/// # Errors
///
/// As [`interpret`], plus [`InterpretError::StepLimit`] when the boundary's
/// step limit is reached first.
pub fn interpret_with_boundary(
    bytecode: &[u8],
    config: &CoreConfig,
    boundary: RunBoundary,
) -> Result<MachineState, InterpretError> {
    let program = decode_program(bytecode)?;
    debug!(
        instructions = program.len(),
        memory_capacity = config.memory_capacity,
        "decoded program"
    );

    let mut interpreter = Interpreter::new(program, config);
    let outcome = interpreter.run(boundary);
    let state = interpreter.into_state();
    match outcome.stop {
        StopReason::Exited => Ok(state),
        StopReason::Faulted(fault) => Err(InterpretError::Fault {
            fault,
            state: Box::new(state),
        }),
        StopReason::StepLimitReached => Err(InterpretError::StepLimit {
            steps: outcome.steps,
            state: Box::new(state),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{interpret, interpret_with_boundary, InterpretError, Interpreter};
    use crate::api::{CoreConfig, RecordingTraceSink, RunBoundary, StepOutcome, TraceEvent};
    use crate::decoder::{encode_program, DecodeError, Instruction};
    use crate::opcode::Opcode;
    use crate::state::{Register, RunState};
    use crate::{FaultKind, MachineState};

    fn ins(opcode: Opcode, dst: u8, src: u8, offset: i16, imm: i32) -> Instruction {
        Instruction::new(opcode, dst, src, offset, imm)
    }

    #[test]
    fn partial_slot_is_a_decode_error() {
        let result = interpret(&[0x95, 0, 0], &CoreConfig::default());

        assert!(matches!(
            result,
            Err(InterpretError::Decode(DecodeError::MalformedInput { len: 3 }))
        ));
    }

    #[test]
    fn empty_program_faults_on_first_fetch() {
        let error = interpret(&[], &CoreConfig::default()).expect_err("nothing to fetch");

        match error {
            InterpretError::Fault { fault, state } => {
                assert_eq!(
                    fault.kind,
                    FaultKind::ProgramCounterOutOfRange { pc: 0, len: 0 }
                );
                assert_eq!(state.pc, 0);
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn fault_error_keeps_partial_state() {
        let bytecode = encode_program(&[
            ins(Opcode::MovImm, 1, 0, 0, 7),
            ins(Opcode::DivImm, 1, 0, 0, 0),
            ins(Opcode::Exit, 0, 0, 0, 0),
        ]);

        let error = interpret(&bytecode, &CoreConfig::default()).expect_err("divides by zero");

        let state = error.state().expect("execution started");
        assert_eq!(state.register(Register::R1), 7);
        assert_eq!(state.pc, 1);
        assert!(matches!(state.run_state, RunState::Faulted(_)));
    }

    #[test]
    fn step_limit_error_reports_retired_count() {
        let bytecode = encode_program(&[ins(Opcode::Ja, 0, 0, -1, 0)]);

        let error =
            interpret_with_boundary(&bytecode, &CoreConfig::default(), RunBoundary::StepLimit(25))
                .expect_err("loops forever");

        assert!(matches!(error, InterpretError::StepLimit { steps: 25, .. }));
        assert_eq!(error.state().map(|state| state.pc), Some(0));
    }

    #[test]
    fn seeded_state_is_visible_to_the_program() {
        let config = CoreConfig::default();
        let mut state = MachineState::with_config(&config);
        state.registers.set(Register::R1, 40);
        let program = vec![
            ins(Opcode::MovReg, 0, 1, 0, 0),
            ins(Opcode::AddImm, 0, 0, 0, 2),
            ins(Opcode::Exit, 0, 0, 0, 0),
        ];

        let mut interpreter = Interpreter::with_state(program, state, &config);
        assert_eq!(interpreter.step(), StepOutcome::Retired);
        assert_eq!(interpreter.step(), StepOutcome::Retired);
        assert_eq!(interpreter.step(), StepOutcome::Exited);
        assert_eq!(interpreter.step(), StepOutcome::Exited);

        assert_eq!(interpreter.state().register(Register::R0), 42);
    }

    #[test]
    fn run_with_sink_records_fault() {
        let program = vec![ins(Opcode::LdxW, 0, 1, 0, 0)];
        let config = CoreConfig {
            memory_capacity: 2,
            ..CoreConfig::default()
        };
        let mut interpreter = Interpreter::new(program, &config);
        let mut sink = RecordingTraceSink::default();

        interpreter.run_with_sink(RunBoundary::Exit, &mut sink);

        let expected = FaultKind::MemoryAccessOutOfBounds {
            addr: 0,
            width: 4,
            capacity: 2,
        };
        assert!(matches!(
            sink.events.last(),
            Some(TraceEvent::FaultRaised { fault }) if fault.kind == expected
        ));
    }
}
