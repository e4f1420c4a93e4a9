//! Reducer-style containers for the regular and advanced game screens.

use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::{
    error::{ErrorInfo, ServiceError},
    state::{
        game::{AggregateStats, GameResult, GameRound, Level, SequenceResult, SequenceRound},
        state_machine::{PlanId, RoundEvent, RoundStateMachine, ViewPhase},
    },
};

/// Slice of the regular (single chord) screen.
pub type RegularSlice = GameSlice<GameRound, GameResult>;

/// Round, result, stats and UI flags of one game screen.
///
/// Every backend call is bracketed by a `begin_*` reducer, which plans the transition,
/// and a `*_fulfilled` / `*_rejected` reducer, which applies or aborts it.
#[derive(Debug)]
pub struct GameSlice<R, O> {
    machine: RoundStateMachine,
    round: Option<R>,
    result: Option<O>,
    stats: Option<AggregateStats>,
    current_level: Level,
    pending_level: Option<Level>,
    error: Option<ErrorInfo>,
    subscription_modal: bool,
    round_started_at: Option<Instant>,
}

impl<R, O> Default for GameSlice<R, O> {
    fn default() -> Self {
        Self {
            machine: RoundStateMachine::new(),
            round: None,
            result: None,
            stats: None,
            current_level: Level::default(),
            pending_level: None,
            error: None,
            subscription_modal: false,
            round_started_at: None,
        }
    }
}

impl<R, O> GameSlice<R, O> {
    /// Fresh slice at level 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase rendered by the screen.
    pub fn view(&self) -> ViewPhase {
        self.machine.view()
    }

    /// True while a start or submit call is in flight.
    pub fn is_busy(&self) -> bool {
        self.machine.pending_event().is_some()
    }

    /// Round currently on screen.
    pub fn round(&self) -> Option<&R> {
        self.round.as_ref()
    }

    /// Result of the last submission.
    pub fn result(&self) -> Option<&O> {
        self.result.as_ref()
    }

    /// Latest stats, server-sourced or guest-computed.
    pub fn stats(&self) -> Option<&AggregateStats> {
        self.stats.as_ref()
    }

    /// Level of the last successfully started round.
    pub fn current_level(&self) -> Level {
        self.current_level
    }

    /// Error shown by the error modal.
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Whether the subscription upsell is open.
    pub fn subscription_modal(&self) -> bool {
        self.subscription_modal
    }

    /// Seed the stats panel before any round is played.
    pub fn set_stats(&mut self, stats: AggregateStats) {
        self.stats = Some(stats);
    }

    /// Mark a start request for `level` in flight.
    pub fn begin_start(&mut self, level: Level) -> Result<PlanId, ServiceError> {
        let plan = self.machine.plan(RoundEvent::StartRound)?;
        self.pending_level = Some(level);
        Ok(plan.id)
    }

    /// Install the new round. The level only moves here, once the backend accepted it.
    pub fn start_fulfilled(&mut self, plan_id: PlanId, round: R) -> Result<(), ServiceError> {
        self.machine.apply(plan_id)?;
        if let Some(level) = self.pending_level.take() {
            self.current_level = level;
        }
        self.round = Some(round);
        self.result = None;
        self.round_started_at = Some(Instant::now());
        Ok(())
    }

    /// Keep the previous round and level, and surface the error.
    pub fn start_rejected(&mut self, plan_id: PlanId, err: &ServiceError) {
        if self.settle_rejected(plan_id, err) {
            self.pending_level = None;
        }
    }

    /// Mark a submission in flight, returning the measured response time.
    pub fn begin_submit(&mut self) -> Result<(PlanId, u64), ServiceError> {
        let plan = self.machine.plan(RoundEvent::Submit)?;
        let response_time_ms = self
            .round_started_at
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or_default();
        Ok((plan.id, response_time_ms))
    }

    /// Store the result and the stats that came with it.
    pub fn submit_fulfilled(
        &mut self,
        plan_id: PlanId,
        result: O,
        stats: Option<AggregateStats>,
    ) -> Result<(), ServiceError> {
        self.machine.apply(plan_id)?;
        self.result = Some(result);
        if let Some(stats) = stats {
            self.stats = Some(stats);
        }
        Ok(())
    }

    /// Return to the ready round and surface the error.
    pub fn submit_rejected(&mut self, plan_id: PlanId, err: &ServiceError) {
        self.settle_rejected(plan_id, err);
    }

    /// Surface a failure that happened outside a start/submit call.
    pub fn report_error(&mut self, err: &ServiceError) {
        self.error = Some(ErrorInfo::from(err));
    }

    /// Dismiss the error modal.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Close the subscription upsell.
    pub fn dismiss_subscription_modal(&mut self) {
        self.subscription_modal = false;
    }

    /// Drop round and result (screen left). In-flight responses will be ignored.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.round = None;
        self.result = None;
        self.pending_level = None;
        self.round_started_at = None;
    }

    /// Returns false when the plan was orphaned by a reset and the error was dropped.
    fn settle_rejected(&mut self, plan_id: PlanId, err: &ServiceError) -> bool {
        if let Err(abort_err) = self.machine.abort(plan_id) {
            debug!(error = ?abort_err, "ignoring failure of a superseded request");
            return false;
        }
        self.error = Some(ErrorInfo::from(err));
        if err.is_subscription_required() {
            self.subscription_modal = true;
        }
        true
    }
}

/// Refusals of the sequence builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// No round is on screen, or it was already submitted.
    #[error("no sequence is being built")]
    NotBuilding,
    /// The sequence already has all its chords.
    #[error("sequence already holds {capacity} chords")]
    Full {
        /// Target sequence length.
        capacity: usize,
    },
    /// Index past the end of the partial sequence.
    #[error("no chord at position {index}")]
    OutOfRange {
        /// Requested position.
        index: usize,
    },
}

impl From<SelectionError> for ServiceError {
    fn from(err: SelectionError) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

/// Partial sequence the player is assembling.
///
/// Each change bumps `generation`. A completed generation can be claimed once at a time,
/// and the auto-submit only ever claims a generation nobody has attempted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceSelection {
    chords: Vec<String>,
    capacity: usize,
    generation: u64,
    claimed: Option<u64>,
    attempted: Option<u64>,
}

impl SequenceSelection {
    /// Chords selected so far.
    pub fn chords(&self) -> &[String] {
        &self.chords
    }

    /// Target sequence length.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counter bumped on every change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the sequence holds `capacity` chords.
    pub fn is_complete(&self) -> bool {
        self.capacity > 0 && self.chords.len() == self.capacity
    }

    fn restart(&mut self, capacity: usize) {
        self.chords.clear();
        self.capacity = capacity;
        self.generation += 1;
        self.claimed = None;
        self.attempted = None;
    }

    fn push(&mut self, chord_id: String) -> Result<(), SelectionError> {
        if self.chords.len() >= self.capacity {
            return Err(SelectionError::Full {
                capacity: self.capacity,
            });
        }
        self.chords.push(chord_id);
        self.generation += 1;
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<String, SelectionError> {
        if index >= self.chords.len() {
            return Err(SelectionError::OutOfRange { index });
        }
        self.generation += 1;
        Ok(self.chords.remove(index))
    }
}

/// Who asks for a sequence to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The player pressed submit; allowed again after a failure.
    Manual,
    /// The debounce timer fired; never repeats an attempted generation.
    Auto,
}

/// Slice of the advanced (sequence) screen.
#[derive(Debug, Default)]
pub struct AdvancedSlice {
    game: GameSlice<SequenceRound, SequenceResult>,
    selection: SequenceSelection,
}

impl AdvancedSlice {
    /// Fresh slice at level 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Round/result/stats part shared with the regular screen.
    pub fn game(&self) -> &GameSlice<SequenceRound, SequenceResult> {
        &self.game
    }

    /// Mutable access for the reducers that do not touch the selection.
    pub fn game_mut(&mut self) -> &mut GameSlice<SequenceRound, SequenceResult> {
        &mut self.game
    }

    /// Sequence under construction.
    pub fn selection(&self) -> &SequenceSelection {
        &self.selection
    }

    /// Install the round and size the selection to its sequence.
    pub fn start_fulfilled(
        &mut self,
        plan_id: PlanId,
        round: SequenceRound,
    ) -> Result<(), ServiceError> {
        let capacity = round.sequence_length;
        self.game.start_fulfilled(plan_id, round)?;
        self.selection.restart(capacity);
        Ok(())
    }

    /// Append a chord; returns the generation reached and whether the sequence is complete.
    pub fn select(&mut self, chord_id: String) -> Result<(u64, bool), SelectionError> {
        self.ensure_building()?;
        self.selection.push(chord_id)?;
        Ok((self.selection.generation, self.selection.is_complete()))
    }

    /// Remove the chord at `index` before submission.
    pub fn remove_at(&mut self, index: usize) -> Result<String, SelectionError> {
        self.ensure_building()?;
        self.selection.remove(index)
    }

    /// Empty the partial sequence.
    pub fn clear_selection(&mut self) -> Result<(), SelectionError> {
        self.ensure_building()?;
        let capacity = self.selection.capacity;
        self.selection.restart(capacity);
        Ok(())
    }

    /// Claim the completed sequence of `generation` for submission.
    ///
    /// Returns `None` when the sequence changed since, is incomplete, is claimed, or a
    /// request is in flight. An [`SubmitTrigger::Auto`] claim is also refused once the
    /// generation was attempted, so a failed submission is only retried by the player.
    pub fn claim(&mut self, generation: u64, trigger: SubmitTrigger) -> Option<Vec<String>> {
        let selection = &self.selection;
        let claimable = self.game.view() == ViewPhase::Ready
            && selection.generation == generation
            && selection.is_complete()
            && selection.claimed != Some(generation)
            && !(trigger == SubmitTrigger::Auto && selection.attempted == Some(generation));
        if !claimable {
            return None;
        }
        self.selection.claimed = Some(generation);
        self.selection.attempted = Some(generation);
        Some(self.selection.chords.clone())
    }

    /// Forget a claim whose submission failed so the player can retry by hand.
    pub fn release_claim(&mut self) {
        self.selection.claimed = None;
    }

    /// Drop round, result and selection.
    pub fn reset(&mut self) {
        self.game.reset();
        self.selection.restart(0);
    }

    fn ensure_building(&self) -> Result<(), SelectionError> {
        if self.game.view() == ViewPhase::Ready {
            Ok(())
        } else {
            Err(SelectionError::NotBuilding)
        }
    }
}
