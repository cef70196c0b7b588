//! Per-turn pipeline state machine.

use crate::error::PipCoreError;
use log::debug;
use pip_rs_protocol::PipelineState;

/// Tracks the state of one turn and every state it visited.
#[derive(Debug, Clone)]
pub(crate) struct Turn {
    state: PipelineState,
    trace: Vec<PipelineState>,
    dispatched: bool,
}

impl Turn {
    pub(crate) fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            trace: vec![PipelineState::Idle],
            dispatched: false,
        }
    }

    pub(crate) fn state(&self) -> PipelineState {
        self.state
    }

    /// Move to `next`, refusing transitions the pipeline does not allow and
    /// a second dispatch in the same turn.
    pub(crate) fn advance(&mut self, next: PipelineState) -> Result<(), PipCoreError> {
        if !allowed(self.state, next) || (next == PipelineState::Dispatching && self.dispatched) {
            return Err(PipCoreError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        if next == PipelineState::Dispatching {
            self.dispatched = true;
        }
        debug!("pipeline transition (from={:?}, to={:?})", self.state, next);
        self.state = next;
        self.trace.push(next);
        Ok(())
    }

    /// Jump to `Responding` from wherever the turn failed.
    pub(crate) fn fail(&mut self) {
        if self.state != PipelineState::Responding {
            self.state = PipelineState::Responding;
            self.trace.push(PipelineState::Responding);
        }
    }

    /// Return to `Idle` and hand back the trace.
    pub(crate) fn finish(mut self) -> Vec<PipelineState> {
        if self.state != PipelineState::Idle {
            self.trace.push(PipelineState::Idle);
        }
        self.trace
    }
}

fn allowed(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;
    matches!(
        (from, to),
        (Idle, Classifying)
            | (Classifying, Dispatching)
            | (Dispatching, AgentHandling)
            | (Dispatching, ConfirmationPending)
            | (Dispatching, Responding)
            | (AgentHandling, ConfirmationPending)
            | (AgentHandling, Responding)
            | (ConfirmationPending, Responding)
            | (Responding, Idle)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn happy_path_visits_every_stage_once() {
        let mut turn = Turn::new();
        for next in [
            PipelineState::Classifying,
            PipelineState::Dispatching,
            PipelineState::AgentHandling,
            PipelineState::Responding,
        ] {
            turn.advance(next).expect("legal transition");
        }
        assert_eq!(
            turn.finish(),
            vec![
                PipelineState::Idle,
                PipelineState::Classifying,
                PipelineState::Dispatching,
                PipelineState::AgentHandling,
                PipelineState::Responding,
                PipelineState::Idle,
            ]
        );
    }

    #[test]
    fn refuses_skipping_classification() {
        let mut turn = Turn::new();
        let err = turn
            .advance(PipelineState::AgentHandling)
            .expect_err("illegal");
        assert!(matches!(err, PipCoreError::InvalidTransition { .. }));
        assert_eq!(turn.state(), PipelineState::Idle);
    }

    #[test]
    fn fail_jumps_to_responding() {
        let mut turn = Turn::new();
        turn.advance(PipelineState::Classifying).expect("legal");
        turn.fail();
        assert_eq!(turn.state(), PipelineState::Responding);
        assert_eq!(turn.finish().last(), Some(&PipelineState::Idle));
    }
}
