use tracing::debug;

use super::events::StepEvent;
use super::states::StepState;

/// Rejected transition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid transition from '{from}' on event '{event}' for step '{step_name}'")]
pub struct StepStateError {
    pub step_name: String,
    pub from: StepState,
    pub event: String,
}

/// In-memory state machine for a single step invocation
///
/// `PENDING → RUNNING → (AWAITING_INPUT ⇄ RUNNING)* → SUCCEEDED | FAILED`
#[derive(Debug, Clone)]
pub struct StepStateMachine {
    step_name: String,
    state: StepState,
    history: Vec<StepState>,
}

impl StepStateMachine {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            state: StepState::default(),
            history: vec![StepState::default()],
        }
    }

    pub fn current_state(&self) -> StepState {
        self.state
    }

    /// Every state visited, oldest first
    pub fn history(&self) -> &[StepState] {
        &self.history
    }

    /// Apply an event, returning the new state
    pub fn transition(&mut self, event: StepEvent) -> Result<StepState, StepStateError> {
        let target = Self::determine_target_state(self.state, &event).ok_or_else(|| {
            StepStateError {
                step_name: self.step_name.clone(),
                from: self.state,
                event: event.event_type().to_string(),
            }
        })?;

        debug!(
            step_name = %self.step_name,
            from = %self.state,
            to = %target,
            event = event.event_type(),
            "Step state transition"
        );
        self.state = target;
        self.history.push(target);
        Ok(target)
    }

    /// Target state for an event, or `None` when the transition is invalid
    pub fn determine_target_state(current: StepState, event: &StepEvent) -> Option<StepState> {
        let target = match (current, event) {
            (StepState::Pending, StepEvent::Start) => StepState::Running,
            (StepState::Running, StepEvent::AwaitInput) => StepState::AwaitingInput,
            (StepState::AwaitingInput, StepEvent::InputResolved) => StepState::Running,
            (StepState::Running, StepEvent::Succeed) => StepState::Succeeded,
            (StepState::Pending | StepState::Running | StepState::AwaitingInput, StepEvent::Fail(_)) => {
                StepState::Failed
            }
            _ => return None,
        };
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_with_input_round_trips() {
        let mut sm = StepStateMachine::new("Обработка данных");
        sm.transition(StepEvent::Start).unwrap();
        sm.transition(StepEvent::AwaitInput).unwrap();
        sm.transition(StepEvent::InputResolved).unwrap();
        sm.transition(StepEvent::AwaitInput).unwrap();
        sm.transition(StepEvent::InputResolved).unwrap();
        assert_eq!(sm.transition(StepEvent::Succeed).unwrap(), StepState::Succeeded);

        assert_eq!(
            sm.history(),
            &[
                StepState::Pending,
                StepState::Running,
                StepState::AwaitingInput,
                StepState::Running,
                StepState::AwaitingInput,
                StepState::Running,
                StepState::Succeeded,
            ]
        );
    }

    #[test]
    fn test_failure_while_awaiting_input() {
        let mut sm = StepStateMachine::new("s");
        sm.transition(StepEvent::Start).unwrap();
        sm.transition(StepEvent::AwaitInput).unwrap();
        assert_eq!(
            sm.transition(StepEvent::Fail("boom".into())).unwrap(),
            StepState::Failed
        );
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut sm = StepStateMachine::new("s");
        let err = sm.transition(StepEvent::Succeed).unwrap_err();
        assert_eq!(err.from, StepState::Pending);
        assert_eq!(err.event, "succeed");

        sm.transition(StepEvent::Start).unwrap();
        assert!(sm.transition(StepEvent::InputResolved).is_err());
        sm.transition(StepEvent::Succeed).unwrap();
        assert!(sm.transition(StepEvent::Start).is_err());
        assert!(sm.transition(StepEvent::Fail("late".into())).is_err());
    }

    #[test]
    fn test_cannot_succeed_while_awaiting_input() {
        assert_eq!(
            StepStateMachine::determine_target_state(StepState::AwaitingInput, &StepEvent::Succeed),
            None
        );
    }
}
