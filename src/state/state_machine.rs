use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Committed phases of a round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No round has been started (or the screen was reset).
    Idle,
    /// A round is on screen and waiting for an answer.
    Ready,
    /// The last round was answered and its result is displayed.
    Resulted,
}

/// Phase as seen by the screens, folding the pending plan into the committed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// Nothing to show yet.
    Idle,
    /// A start request is in flight.
    Loading,
    /// A round is waiting for an answer.
    Ready,
    /// A submission is in flight.
    Submitting,
    /// A result is displayed.
    Resulted,
}

/// Events that can be applied to the round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Request a fresh round from the backend.
    StartRound,
    /// Submit the answer or sequence for the current round.
    Submit,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoundPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoundEvent,
}

/// Errors that can occur when planning a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A request is already in flight and must complete first.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// Phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: RoundPhase,
        /// Current phase.
        actual: RoundPhase,
    },
}

/// Errors that can occur when aborting a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned transition.
pub type PlanId = Uuid;

/// A validated transition waiting for its backend call to settle.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: RoundPhase,
    /// Phase the state machine moves to once the call succeeds.
    pub to: RoundPhase,
    /// Event that triggered this transition.
    pub event: RoundEvent,
    /// When the call was dispatched.
    pub pending_since: Instant,
}

/// Round lifecycle: `idle → loading → ready → submitting → resulted → loading ...`.
///
/// Loading and submitting are not committed phases; they are the pending plan of a
/// start or submit event. Only one plan may be pending, which is what keeps a second
/// start or submit from being dispatched while one is in flight.
#[derive(Debug, Clone)]
pub struct RoundStateMachine {
    phase: RoundPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for RoundStateMachine {
    fn default() -> Self {
        Self {
            phase: RoundPhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl RoundStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the committed phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of committed transitions (resets included).
    pub fn version(&self) -> usize {
        self.version
    }

    /// Event of the in-flight request, if any.
    pub fn pending_event(&self) -> Option<RoundEvent> {
        self.pending.as_ref().map(|plan| plan.event)
    }

    /// Phase as rendered by the screens.
    pub fn view(&self) -> ViewPhase {
        match (self.pending_event(), self.phase) {
            (Some(RoundEvent::StartRound), _) => ViewPhase::Loading,
            (Some(RoundEvent::Submit), _) => ViewPhase::Submitting,
            (None, RoundPhase::Idle) => ViewPhase::Idle,
            (None, RoundPhase::Ready) => ViewPhase::Ready,
            (None, RoundPhase::Resulted) => ViewPhase::Resulted,
        }
    }

    /// Validate that `event` can be applied and mark it in flight.
    pub fn plan(&mut self, event: RoundEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Commit a planned transition once its call succeeded.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RoundPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        self.phase = plan.to;
        self.version += 1;

        Ok(self.phase)
    }

    /// Drop a planned transition after its call failed, keeping the previous phase.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Return to idle, orphaning any in-flight plan so its late result is ignored.
    pub fn reset(&mut self) {
        self.phase = RoundPhase::Idle;
        self.pending = None;
        self.version += 1;
    }

    fn compute_transition(&self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (
                RoundPhase::Idle | RoundPhase::Ready | RoundPhase::Resulted,
                RoundEvent::StartRound,
            ) => RoundPhase::Ready,
            (RoundPhase::Ready, RoundEvent::Submit) => RoundPhase::Resulted,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
