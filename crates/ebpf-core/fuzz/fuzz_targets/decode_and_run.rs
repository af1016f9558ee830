#![no_main]

use ebpf_core::{decode_program, disassemble, CoreConfig, Interpreter, RunBoundary, StopReason};
use libfuzzer_sys::fuzz_target;

const STEP_LIMIT: u64 = 4_096;

fuzz_target!(|data: &[u8]| {
    let Ok(program) = decode_program(data) else {
        assert!(!data.len().is_multiple_of(8));
        return;
    };

    let _ = disassemble(&program);

    let config = CoreConfig {
        memory_capacity: 1_024,
        ..CoreConfig::default()
    };
    let mut interpreter = Interpreter::new(program, &config);
    let outcome = interpreter.run(RunBoundary::StepLimit(STEP_LIMIT));

    assert!(outcome.steps <= STEP_LIMIT);
    if let StopReason::Faulted(fault) = outcome.stop {
        assert_eq!(fault.pc, interpreter.state().pc);
    }
});
