//! Deterministic run fingerprint used for cross-host comparison.

use ebpf_core::{
    sample_program, CoreConfig, Instruction, Interpreter, Opcode, RunBoundary, StopReason,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use serde_json as _;
use thiserror as _;
use tracing as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn memory_workload() -> Vec<Instruction> {
    vec![
        Instruction::new(Opcode::MovImm, 1, 0, 0, 16),
        Instruction::new(Opcode::MovImm, 2, 0, 0, 0x0102_0304),
        Instruction::new(Opcode::StxW, 1, 2, 0, 0),
        Instruction::new(Opcode::ToBe, 2, 0, 0, 32),
        Instruction::new(Opcode::StxW, 1, 2, 4, 0),
        Instruction::new(Opcode::AddImm, 1, 0, 0, 8),
        Instruction::new(Opcode::JltImm, 1, 0, -6, 256),
        Instruction::new(Opcode::LdxDw, 0, 10, 16, 0),
        Instruction::new(Opcode::Exit, 0, 0, 0, 0),
    ]
}

fn fingerprint() -> String {
    let config = CoreConfig {
        memory_capacity: 512,
        ..CoreConfig::default()
    };
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;

    for program in [sample_program(), memory_workload()] {
        let mut interpreter = Interpreter::new(program, &config);
        let outcome = interpreter.run(RunBoundary::StepLimit(100_000));
        hash_bytes(&mut hash, &outcome.steps.to_le_bytes());

        match outcome.stop {
            StopReason::Exited => hash_bytes(&mut hash, &[0x10]),
            StopReason::Faulted(fault) => {
                hash_bytes(&mut hash, &[0x11, fault.code().as_u8()]);
                hash_bytes(&mut hash, &fault.pc.to_le_bytes());
            }
            StopReason::StepLimitReached => hash_bytes(&mut hash, &[0x12]),
        }

        let state = interpreter.into_state();
        for value in state.registers.as_array() {
            hash_bytes(&mut hash, &value.to_le_bytes());
        }
        hash_bytes(&mut hash, &state.pc.to_le_bytes());
        hash_bytes(&mut hash, state.memory.as_bytes());
    }

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
