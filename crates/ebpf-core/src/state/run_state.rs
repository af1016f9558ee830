use crate::Fault;

/// Execution state machine of one interpretation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the instruction at the program counter.
    #[default]
    Running,
    /// `exit` retired; no further instructions run.
    Terminated,
    /// A fault stopped the run; no further instructions run.
    Faulted(Fault),
}

#[cfg(test)]
mod tests {
    use super::RunState;
    use crate::{Fault, FaultKind};

    #[test]
    fn run_state_default_is_running() {
        assert_eq!(RunState::default(), RunState::Running);
    }

    #[test]
    fn faulted_state_carries_the_fault() {
        let fault = Fault::new(FaultKind::DivisionByZero, 2);
        let state = RunState::Faulted(fault);

        assert_ne!(state, RunState::Terminated);
        assert!(matches!(state, RunState::Faulted(inner) if inner.pc == 2));
    }
}
