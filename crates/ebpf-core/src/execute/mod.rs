//! Instruction execution pipeline.
//!
//! Each step runs in two phases:
//! 1. [`execute_instruction`] reads operands, computes the result and
//!    validates every memory access against the current state, collecting
//!    side effects into an [`ExecuteState`].
//! 2. [`commit_execution`] applies them in a fixed order: memory write,
//!    destination register, program counter.
//!
//! Faults are precise: a faulting instruction commits nothing.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

mod branch;
mod helpers;

pub use branch::BranchOp;
pub use helpers::{branch_target, effective_address, Source};

use tracing::{debug, instrument};

use crate::api::{RunBoundary, RunOutcome, StepOutcome, StopReason, TraceEvent, TraceSink};
use crate::decoder::Instruction;
use crate::memory::{validate_access, AccessWidth};
use crate::opcode::Opcode;
use crate::state::{Register, RunState};
use crate::{Fault, FaultKind, MachineState};

use helpers::{read_dst, read_operand, read_src, register_field};

/// One validated data memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccess {
    /// Effective address.
    pub addr: i64,
    /// Access width.
    pub width: AccessWidth,
    /// Raw value, zero-extended from `width` bytes.
    pub value: u64,
}

/// Side effects of one instruction, pending commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteState {
    /// Register write.
    pub dest: Option<(Register, i64)>,
    /// Memory read performed while computing the result.
    pub memory_read: Option<MemoryAccess>,
    /// Memory write to apply.
    pub memory_write: Option<MemoryAccess>,
    /// Program counter after commit.
    pub next_pc: i64,
    /// `exit` retired.
    pub exited: bool,
}

impl ExecuteState {
    /// Falls through to `next_pc` with no other effect.
    #[must_use]
    pub const fn fall_through(next_pc: i64) -> Self {
        Self {
            dest: None,
            memory_read: None,
            memory_write: None,
            next_pc,
            exited: false,
        }
    }

    const fn with_dest(mut self, reg: Register, value: i64) -> Self {
        self.dest = Some((reg, value));
        self
    }
}

/// Binary ALU operations on `(dst, operand)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Or,
    And,
    Lsh,
    Rsh,
    Mod,
    Xor,
    Mov,
    Arsh,
}

impl AluOp {
    /// Computes `lhs op rhs` with 64-bit wrapping semantics.
    ///
    /// Shift counts use the low six bits of `rhs`. `Rsh` is logical and
    /// `Arsh` arithmetic. `Div` and `Mod` are signed.
    ///
    /// # Errors
    ///
    /// Returns [`FaultKind::DivisionByZero`] for `Div`/`Mod` with `rhs == 0`.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn apply(self, lhs: i64, rhs: i64) -> Result<i64, FaultKind> {
        let shift = (rhs & 63) as u32;
        let value = match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div | Self::Mod if rhs == 0 => return Err(FaultKind::DivisionByZero),
            Self::Div => lhs.wrapping_div(rhs),
            Self::Mod => lhs.wrapping_rem(rhs),
            Self::Or => lhs | rhs,
            Self::And => lhs & rhs,
            Self::Lsh => lhs << shift,
            Self::Rsh => ((lhs as u64) >> shift) as i64,
            Self::Xor => lhs ^ rhs,
            Self::Mov => rhs,
            Self::Arsh => lhs >> shift,
        };
        Ok(value)
    }
}

/// Computes the side effects of `instr` at `pc` without touching `state`.
///
/// `program` is consulted only by `lddw`, whose value spans two slots.
///
/// # Errors
///
/// Returns the fault raised by the instruction. Nothing has been applied in
/// that case.
#[allow(clippy::too_many_lines)]
pub fn execute_instruction(
    program: &[Instruction],
    pc: i64,
    instr: &Instruction,
    state: &MachineState,
) -> Result<ExecuteState, FaultKind> {
    let Some(opcode) = instr.opcode() else {
        return Err(FaultKind::UnknownOpcode {
            opcode: instr.opcode,
        });
    };
    let next_pc = pc.wrapping_add(1);

    let alu = |op: AluOp, source: Source| execute_alu(instr, state, next_pc, op, source);
    let branch = |op: BranchOp, source: Source| execute_branch(instr, state, pc, op, source);

    match opcode {
        Opcode::AddImm => alu(AluOp::Add, Source::Imm),
        Opcode::AddReg => alu(AluOp::Add, Source::Reg),
        Opcode::SubImm => alu(AluOp::Sub, Source::Imm),
        Opcode::SubReg => alu(AluOp::Sub, Source::Reg),
        Opcode::MulImm => alu(AluOp::Mul, Source::Imm),
        Opcode::MulReg => alu(AluOp::Mul, Source::Reg),
        Opcode::DivImm => alu(AluOp::Div, Source::Imm),
        Opcode::DivReg => alu(AluOp::Div, Source::Reg),
        Opcode::OrImm => alu(AluOp::Or, Source::Imm),
        Opcode::OrReg => alu(AluOp::Or, Source::Reg),
        Opcode::AndImm => alu(AluOp::And, Source::Imm),
        Opcode::AndReg => alu(AluOp::And, Source::Reg),
        Opcode::LshImm => alu(AluOp::Lsh, Source::Imm),
        Opcode::LshReg => alu(AluOp::Lsh, Source::Reg),
        Opcode::RshImm => alu(AluOp::Rsh, Source::Imm),
        Opcode::RshReg => alu(AluOp::Rsh, Source::Reg),
        Opcode::ModImm => alu(AluOp::Mod, Source::Imm),
        Opcode::ModReg => alu(AluOp::Mod, Source::Reg),
        Opcode::XorImm => alu(AluOp::Xor, Source::Imm),
        Opcode::XorReg => alu(AluOp::Xor, Source::Reg),
        Opcode::MovImm => alu(AluOp::Mov, Source::Imm),
        Opcode::MovReg => alu(AluOp::Mov, Source::Reg),
        Opcode::ArshImm => alu(AluOp::Arsh, Source::Imm),
        Opcode::ArshReg => alu(AluOp::Arsh, Source::Reg),
        Opcode::Neg => execute_neg(instr, state, next_pc),
        Opcode::ToLe => execute_byteswap(instr, state, next_pc, false),
        Opcode::ToBe => execute_byteswap(instr, state, next_pc, true),
        Opcode::Lddw => execute_lddw(program, pc, instr),
        Opcode::LdAbsW => execute_load_abs(instr, state, next_pc, AccessWidth::Word),
        Opcode::LdAbsH => execute_load_abs(instr, state, next_pc, AccessWidth::Half),
        Opcode::LdAbsB => execute_load_abs(instr, state, next_pc, AccessWidth::Byte),
        Opcode::LdAbsDw => execute_load_abs(instr, state, next_pc, AccessWidth::Double),
        Opcode::LdIndW => execute_load_ind(instr, state, next_pc, AccessWidth::Word),
        Opcode::LdIndH => execute_load_ind(instr, state, next_pc, AccessWidth::Half),
        Opcode::LdIndB => execute_load_ind(instr, state, next_pc, AccessWidth::Byte),
        Opcode::LdIndDw => execute_load_ind(instr, state, next_pc, AccessWidth::Double),
        Opcode::LdxW => execute_load_indexed(instr, state, next_pc, AccessWidth::Word),
        Opcode::LdxH => execute_load_indexed(instr, state, next_pc, AccessWidth::Half),
        Opcode::LdxB => execute_load_indexed(instr, state, next_pc, AccessWidth::Byte),
        Opcode::LdxDw => execute_load_indexed(instr, state, next_pc, AccessWidth::Double),
        Opcode::StW => execute_store(instr, state, next_pc, AccessWidth::Word, Source::Imm),
        Opcode::StH => execute_store(instr, state, next_pc, AccessWidth::Half, Source::Imm),
        Opcode::StB => execute_store(instr, state, next_pc, AccessWidth::Byte, Source::Imm),
        Opcode::StDw => execute_store(instr, state, next_pc, AccessWidth::Double, Source::Imm),
        Opcode::StxW => execute_store(instr, state, next_pc, AccessWidth::Word, Source::Reg),
        Opcode::StxH => execute_store(instr, state, next_pc, AccessWidth::Half, Source::Reg),
        Opcode::StxB => execute_store(instr, state, next_pc, AccessWidth::Byte, Source::Reg),
        Opcode::StxDw => execute_store(instr, state, next_pc, AccessWidth::Double, Source::Reg),
        Opcode::Ja => Ok(ExecuteState::fall_through(branch_target(pc, instr.offset))),
        Opcode::JeqImm => branch(BranchOp::Eq, Source::Imm),
        Opcode::JeqReg => branch(BranchOp::Eq, Source::Reg),
        Opcode::JgtImm => branch(BranchOp::Gt, Source::Imm),
        Opcode::JgtReg => branch(BranchOp::Gt, Source::Reg),
        Opcode::JgeImm => branch(BranchOp::Ge, Source::Imm),
        Opcode::JgeReg => branch(BranchOp::Ge, Source::Reg),
        Opcode::JltImm => branch(BranchOp::Lt, Source::Imm),
        Opcode::JltReg => branch(BranchOp::Lt, Source::Reg),
        Opcode::JleImm => branch(BranchOp::Le, Source::Imm),
        Opcode::JleReg => branch(BranchOp::Le, Source::Reg),
        Opcode::JsetImm => branch(BranchOp::Set, Source::Imm),
        Opcode::JsetReg => branch(BranchOp::Set, Source::Reg),
        Opcode::JneImm => branch(BranchOp::Ne, Source::Imm),
        Opcode::JneReg => branch(BranchOp::Ne, Source::Reg),
        Opcode::JsgtImm => branch(BranchOp::Sgt, Source::Imm),
        Opcode::JsgtReg => branch(BranchOp::Sgt, Source::Reg),
        Opcode::JsgeImm => branch(BranchOp::Sge, Source::Imm),
        Opcode::JsgeReg => branch(BranchOp::Sge, Source::Reg),
        Opcode::JsltImm => branch(BranchOp::Slt, Source::Imm),
        Opcode::JsltReg => branch(BranchOp::Slt, Source::Reg),
        Opcode::JsleImm => branch(BranchOp::Sle, Source::Imm),
        Opcode::JsleReg => branch(BranchOp::Sle, Source::Reg),
        Opcode::Call => Ok(ExecuteState::fall_through(branch_target(pc, instr.offset))
            .with_dest(Register::LINK, next_pc)),
        Opcode::Exit => Ok(ExecuteState {
            exited: true,
            ..ExecuteState::fall_through(pc)
        }),
    }
}

/// Applies pending side effects: memory write, then register, then `pc`.
///
/// # Errors
///
/// Returns [`FaultKind::MemoryAccessOutOfBounds`] if the pending write no
/// longer fits the buffer; `state` is unchanged in that case.
pub fn commit_execution(state: &mut MachineState, exec: &ExecuteState) -> Result<(), FaultKind> {
    if let Some(write) = exec.memory_write {
        state.memory.store(write.addr, write.width, write.value)?;
    }
    if let Some((reg, value)) = exec.dest {
        state.registers.set(reg, value);
    }
    state.pc = exec.next_pc;
    Ok(())
}

/// Fetches the instruction at `pc`.
///
/// # Errors
///
/// Returns [`FaultKind::ProgramCounterOutOfRange`] when `pc` does not index
/// a program slot.
pub fn fetch(program: &[Instruction], pc: i64) -> Result<Instruction, FaultKind> {
    usize::try_from(pc)
        .ok()
        .and_then(|index| program.get(index))
        .copied()
        .ok_or(FaultKind::ProgramCounterOutOfRange {
            pc,
            len: program.len(),
        })
}

/// Executes exactly one instruction and reports the outcome.
///
/// A terminated or faulted machine is left as is and reports its terminal
/// outcome again.
pub fn step_one(
    program: &[Instruction],
    state: &mut MachineState,
    sink: &mut dyn TraceSink,
) -> StepOutcome {
    match state.run_state {
        RunState::Faulted(fault) => return StepOutcome::Fault { fault },
        RunState::Terminated => return StepOutcome::Exited,
        RunState::Running => {}
    }

    let pc = state.pc;
    match fetch_execute_commit(program, state, sink) {
        Ok(exec) if exec.exited => {
            state.run_state = RunState::Terminated;
            sink.on_event(TraceEvent::Exited { pc });
            StepOutcome::Exited
        }
        Ok(exec) => {
            sink.on_event(TraceEvent::InstructionRetired {
                pc,
                next_pc: exec.next_pc,
            });
            StepOutcome::Retired
        }
        Err(kind) => {
            let fault = Fault::new(kind, pc);
            state.run_state = RunState::Faulted(fault);
            sink.on_event(TraceEvent::FaultRaised { fault });
            StepOutcome::Fault { fault }
        }
    }
}

/// Steps until `exit`, a fault, or the boundary's step limit.
#[instrument(skip_all, fields(instructions = program.len(), boundary = ?boundary))]
pub fn run(
    program: &[Instruction],
    state: &mut MachineState,
    boundary: RunBoundary,
    sink: &mut dyn TraceSink,
) -> RunOutcome {
    match state.run_state {
        RunState::Terminated => {
            return RunOutcome {
                steps: 0,
                stop: StopReason::Exited,
            }
        }
        RunState::Faulted(fault) => {
            return RunOutcome {
                steps: 0,
                stop: StopReason::Faulted(fault),
            }
        }
        RunState::Running => {}
    }

    let limit = match boundary {
        RunBoundary::Exit => None,
        RunBoundary::StepLimit(limit) => Some(limit),
    };
    let mut steps = 0u64;

    loop {
        if limit.is_some_and(|limit| steps >= limit) {
            debug!(steps, pc = state.pc, "step limit reached");
            return RunOutcome {
                steps,
                stop: StopReason::StepLimitReached,
            };
        }

        match step_one(program, state, sink) {
            StepOutcome::Retired => steps += 1,
            StepOutcome::Exited => {
                steps += 1;
                debug!(steps, r0 = state.register(Register::RETURN_VALUE), "program exited");
                return RunOutcome {
                    steps,
                    stop: StopReason::Exited,
                };
            }
            StepOutcome::Fault { fault } => {
                debug!(steps, %fault, "program faulted");
                return RunOutcome {
                    steps,
                    stop: StopReason::Faulted(fault),
                };
            }
        }
    }
}

fn fetch_execute_commit(
    program: &[Instruction],
    state: &mut MachineState,
    sink: &mut dyn TraceSink,
) -> Result<ExecuteState, FaultKind> {
    let pc = state.pc;
    let instruction = fetch(program, pc)?;
    sink.on_event(TraceEvent::InstructionStart { pc, instruction });

    let exec = execute_instruction(program, pc, &instruction, state)?;
    commit_execution(state, &exec)?;

    for (access, is_write) in [(exec.memory_read, false), (exec.memory_write, true)] {
        if let Some(access) = access {
            sink.on_event(TraceEvent::MemoryAccess {
                addr: access.addr,
                width: access.width,
                value: access.value,
                is_write,
            });
        }
    }
    Ok(exec)
}

fn execute_alu(
    instr: &Instruction,
    state: &MachineState,
    next_pc: i64,
    op: AluOp,
    source: Source,
) -> Result<ExecuteState, FaultKind> {
    let dst = register_field(instr.dst)?;
    let rhs = read_operand(instr, state, source)?;
    let value = op.apply(state.registers.get(dst), rhs)?;
    Ok(ExecuteState::fall_through(next_pc).with_dest(dst, value))
}

fn execute_neg(
    instr: &Instruction,
    state: &MachineState,
    next_pc: i64,
) -> Result<ExecuteState, FaultKind> {
    let dst = register_field(instr.dst)?;
    let value = state.registers.get(dst).wrapping_neg();
    Ok(ExecuteState::fall_through(next_pc).with_dest(dst, value))
}

#[allow(clippy::cast_possible_truncation)]
fn execute_byteswap(
    instr: &Instruction,
    state: &MachineState,
    next_pc: i64,
    big_endian: bool,
) -> Result<ExecuteState, FaultKind> {
    let dst = register_field(instr.dst)?;
    let value = state.registers.get(dst) as u64;
    let swapped = match (instr.imm, big_endian) {
        (16, false) => u64::from(value as u16),
        (32, false) => u64::from(value as u32),
        (64, false) => value,
        (16, true) => u64::from((value as u16).swap_bytes()),
        (32, true) => u64::from((value as u32).swap_bytes()),
        (64, true) => value.swap_bytes(),
        (width, _) => return Err(FaultKind::InvalidSwapWidth { width }),
    };
    Ok(ExecuteState::fall_through(next_pc).with_dest(dst, swapped as i64))
}

fn execute_lddw(
    program: &[Instruction],
    pc: i64,
    instr: &Instruction,
) -> Result<ExecuteState, FaultKind> {
    let dst = register_field(instr.dst)?;
    let high = usize::try_from(pc.wrapping_add(1))
        .ok()
        .and_then(|index| program.get(index))
        .ok_or(FaultKind::IncompleteWideLoad)?;
    let value = u64::from(instr.imm as u32) | (u64::from(high.imm as u32) << 32);
    Ok(ExecuteState::fall_through(pc.wrapping_add(2)).with_dest(dst, value as i64))
}

fn load(state: &MachineState, addr: i64, width: AccessWidth) -> Result<MemoryAccess, FaultKind> {
    let value = state.memory.load(addr, width)?;
    Ok(MemoryAccess { addr, width, value })
}

const fn loaded_into(reg: Register, access: MemoryAccess, next_pc: i64) -> ExecuteState {
    ExecuteState {
        memory_read: Some(access),
        ..ExecuteState::fall_through(next_pc).with_dest(reg, access.width.extend(access.value))
    }
}

fn execute_load_abs(
    instr: &Instruction,
    state: &MachineState,
    next_pc: i64,
    width: AccessWidth,
) -> Result<ExecuteState, FaultKind> {
    let access = load(state, i64::from(instr.imm), width)?;
    Ok(loaded_into(Register::RETURN_VALUE, access, next_pc))
}

fn execute_load_ind(
    instr: &Instruction,
    state: &MachineState,
    next_pc: i64,
    width: AccessWidth,
) -> Result<ExecuteState, FaultKind> {
    let addr = read_src(instr, state)?.wrapping_add(i64::from(instr.imm));
    let access = load(state, addr, width)?;
    Ok(loaded_into(Register::RETURN_VALUE, access, next_pc))
}

fn execute_load_indexed(
    instr: &Instruction,
    state: &MachineState,
    next_pc: i64,
    width: AccessWidth,
) -> Result<ExecuteState, FaultKind> {
    let dst = register_field(instr.dst)?;
    let addr = effective_address(read_src(instr, state)?, instr.offset);
    let access = load(state, addr, width)?;
    Ok(loaded_into(dst, access, next_pc))
}

fn execute_store(
    instr: &Instruction,
    state: &MachineState,
    next_pc: i64,
    width: AccessWidth,
    source: Source,
) -> Result<ExecuteState, FaultKind> {
    let addr = effective_address(read_dst(instr, state)?, instr.offset);
    let value = read_operand(instr, state, source)? as u64;
    validate_access(addr, width, state.memory.capacity())?;

    let mask = match width {
        AccessWidth::Double => u64::MAX,
        narrow => (1u64 << (u32::from(narrow.bytes()) * 8)) - 1,
    };
    Ok(ExecuteState {
        memory_write: Some(MemoryAccess {
            addr,
            width,
            value: value & mask,
        }),
        ..ExecuteState::fall_through(next_pc)
    })
}

fn execute_branch(
    instr: &Instruction,
    state: &MachineState,
    pc: i64,
    op: BranchOp,
    source: Source,
) -> Result<ExecuteState, FaultKind> {
    let lhs = read_dst(instr, state)?;
    let rhs = read_operand(instr, state, source)?;
    let next_pc = if op.taken(lhs, rhs) {
        branch_target(pc, instr.offset)
    } else {
        pc.wrapping_add(1)
    };
    Ok(ExecuteState::fall_through(next_pc))
}
