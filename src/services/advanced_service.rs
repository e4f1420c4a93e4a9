use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    dao::backend::SequenceSubmission,
    error::ServiceError,
    services::{current_instrument_id, today},
    state::{
        PlanId, SharedState,
        game::{AggregateStats, GameMode, Level, Player, SequenceResult, SequenceRound},
        slice::SubmitTrigger,
    },
};

/// What happened to the sequence after a chord was picked.
#[derive(Debug)]
pub struct SelectOutcome {
    /// Chords selected so far.
    pub selected: usize,
    /// Target sequence length.
    pub capacity: usize,
    /// Debounced submission, scheduled once the sequence is full.
    pub auto_submit: Option<JoinHandle<()>>,
}

struct PendingSubmit {
    plan_id: PlanId,
    player: Player,
    sequence_length: usize,
    submission: SequenceSubmission,
}

/// Request a new sequence round at `level`.
pub async fn start_advanced_game(
    state: &SharedState,
    level: Level,
) -> Result<SequenceRound, ServiceError> {
    let plan_id = state.advanced().write().await.game_mut().begin_start(level)?;
    let player = state.player().await;

    let outcome: Result<SequenceRound, ServiceError> = async {
        let instrument_id = current_instrument_id(state).await?;
        Ok(state
            .backend()
            .start_advanced_game(player, instrument_id, level)
            .await?)
    }
    .await;

    let mut slice = state.advanced().write().await;
    match outcome {
        Ok(round) => {
            slice.start_fulfilled(plan_id, round.clone())?;
            info!(
                session_id = %round.session_id,
                %level,
                sequence_length = round.sequence_length,
                "advanced round started"
            );
            Ok(round)
        }
        Err(err) => {
            warn!(%level, error = %err, "failed to start advanced round");
            slice.game_mut().start_rejected(plan_id, &err);
            Err(err)
        }
    }
}

/// Append `chord_id` to the sequence. Completing the sequence schedules a submission
/// after the configured quiet period; any later edit cancels it.
pub async fn select_chord(
    state: &SharedState,
    chord_id: &str,
) -> Result<SelectOutcome, ServiceError> {
    let mut slice = state.advanced().write().await;
    let in_pool = slice
        .game()
        .round()
        .is_some_and(|round| round.chord_pool.iter().any(|chord| chord.id == chord_id));
    if !in_pool {
        return Err(ServiceError::Validation(format!(
            "chord `{chord_id}` is not part of this round"
        )));
    }

    let (generation, complete) = slice.select(chord_id.to_string())?;
    let selection = slice.selection();
    let outcome = SelectOutcome {
        selected: selection.chords().len(),
        capacity: selection.capacity(),
        auto_submit: complete.then(|| schedule_auto_submit(state.clone(), generation)),
    };
    debug!(chord_id, selected = outcome.selected, capacity = outcome.capacity, "chord selected");
    Ok(outcome)
}

/// Remove the chord at `index` before the sequence is submitted.
pub async fn remove_chord(state: &SharedState, index: usize) -> Result<String, ServiceError> {
    Ok(state.advanced().write().await.remove_at(index)?)
}

/// Empty the sequence under construction.
pub async fn clear_sequence(state: &SharedState) -> Result<(), ServiceError> {
    Ok(state.advanced().write().await.clear_selection()?)
}

/// Submit the full sequence now instead of waiting for the auto-submit.
pub async fn submit_sequence(state: &SharedState) -> Result<SequenceResult, ServiceError> {
    let generation = state.advanced().read().await.selection().generation();
    let claimed = begin_claimed(state, generation, SubmitTrigger::Manual).await?;
    let pending = claimed.ok_or_else(|| {
        ServiceError::InvalidState("sequence is incomplete or already submitted".into())
    })?;
    finish_submit(state, pending).await
}

fn schedule_auto_submit(state: SharedState, generation: u64) -> JoinHandle<()> {
    let delay = state.settings().auto_submit_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match begin_claimed(&state, generation, SubmitTrigger::Auto).await {
            Ok(Some(pending)) => {
                if let Err(err) = finish_submit(&state, pending).await {
                    debug!(error = %err, "auto-submit failed");
                }
            }
            Ok(None) => debug!(generation, "auto-submit superseded"),
            Err(err) => warn!(generation, error = %err, "auto-submit refused"),
        }
    })
}

async fn begin_claimed(
    state: &SharedState,
    generation: u64,
    trigger: SubmitTrigger,
) -> Result<Option<PendingSubmit>, ServiceError> {
    let player = state.player().await;
    let mut slice = state.advanced().write().await;

    let Some((session_id, sequence_length)) = slice
        .game()
        .round()
        .map(|round| (round.session_id.clone(), round.sequence_length))
    else {
        return Ok(None);
    };
    let Some(chord_ids) = slice.claim(generation, trigger) else {
        return Ok(None);
    };

    let (plan_id, response_time_ms) = match slice.game_mut().begin_submit() {
        Ok(planned) => planned,
        Err(err) => {
            slice.release_claim();
            return Err(err);
        }
    };

    Ok(Some(PendingSubmit {
        plan_id,
        player,
        sequence_length,
        submission: SequenceSubmission {
            session_id,
            chord_ids,
            response_time_ms,
        },
    }))
}

async fn finish_submit(
    state: &SharedState,
    pending: PendingSubmit,
) -> Result<SequenceResult, ServiceError> {
    let PendingSubmit {
        plan_id,
        player,
        sequence_length,
        submission,
    } = pending;

    let result = match state
        .backend()
        .submit_sequence(player.clone(), submission)
        .await
    {
        Ok(result) => result,
        Err(err) => {
            let err = ServiceError::from(err);
            warn!(error = %err, "failed to submit sequence");
            let mut slice = state.advanced().write().await;
            slice.release_claim();
            slice.game_mut().submit_rejected(plan_id, &err);
            return Err(err);
        }
    };

    let stats = record_stats(state, &player, sequence_length, &result).await;

    let mut slice = state.advanced().write().await;
    let game = slice.game_mut();
    match stats {
        Ok(stats) => game.submit_fulfilled(plan_id, result.clone(), stats)?,
        Err(err) => {
            game.submit_fulfilled(plan_id, result.clone(), None)?;
            game.report_error(&err);
        }
    }

    info!(
        correct = result.is_correct,
        correct_chords = result.correct_chords(),
        sequence_length,
        "sequence submitted"
    );
    Ok(result)
}

async fn record_stats(
    state: &SharedState,
    player: &Player,
    sequence_length: usize,
    result: &SequenceResult,
) -> Result<Option<AggregateStats>, ServiceError> {
    if player.is_guest() {
        let stats = state
            .guest_stats()
            .update_sequence_stats(sequence_length, result.correct_chords(), today())
            .await?;
        return Ok(Some(stats));
    }
    Ok(result.stats.clone())
}

/// Seed the advanced screen's stats panel for guests.
pub async fn load_stats(state: &SharedState) -> Result<Option<AggregateStats>, ServiceError> {
    if !state.player().await.is_guest() {
        return Ok(None);
    }
    let stats = state
        .guest_stats()
        .get_game_mode_stats(GameMode::Advanced)
        .await?;
    state
        .advanced()
        .write()
        .await
        .game_mut()
        .set_stats(stats.clone());
    Ok(Some(stats))
}

/// Dismiss the error modal of the advanced screen.
pub async fn clear_error(state: &SharedState) {
    state.advanced().write().await.game_mut().clear_error();
}

/// Close the subscription upsell of the advanced screen.
pub async fn dismiss_subscription_modal(state: &SharedState) {
    state
        .advanced()
        .write()
        .await
        .game_mut()
        .dismiss_subscription_modal();
}

/// Leave the advanced screen; a response still in flight will be ignored.
pub async fn leave(state: &SharedState) {
    state.advanced().write().await.reset();
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use super::*;
    use crate::{
        error::CODE_SUBSCRIPTION_REQUIRED,
        services::testing::{FakeBackend, TARGET, app_state},
        state::state_machine::ViewPhase,
    };

    fn level(value: u8) -> Level {
        Level::new(value).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn full_sequence_is_submitted_once_after_quiet_period() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend.clone());
        start_advanced_game(&state, level(1)).await.unwrap();

        assert!(select_chord(&state, "c").await.unwrap().auto_submit.is_none());
        assert!(select_chord(&state, "g").await.unwrap().auto_submit.is_none());
        let outcome = select_chord(&state, "f").await.unwrap();
        assert_eq!((outcome.selected, outcome.capacity), (3, 3));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 0);

        outcome.auto_submit.unwrap().await.unwrap();
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 1);

        let slice = state.advanced().read().await;
        let result = slice.game().result().unwrap();
        assert_eq!(result.comparison, vec![true, true, false]);
        let stats = slice.game().stats().unwrap();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.correct_answers, 2);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.accuracy, 67);
        assert_eq!(stats.streak, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn editing_during_quiet_period_cancels_pending_submit() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend.clone());
        *backend.sequence_length.lock().unwrap() = 2;
        start_advanced_game(&state, level(1)).await.unwrap();

        select_chord(&state, "c").await.unwrap();
        let first = select_chord(&state, "f").await.unwrap().auto_submit.unwrap();
        assert_eq!(remove_chord(&state, 1).await.unwrap(), "f");
        let second = select_chord(&state, "g").await.unwrap().auto_submit.unwrap();

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 1);
        let submitted = backend.last_sequence.lock().unwrap().clone().unwrap();
        assert_eq!(submitted.chord_ids, vec!["c".to_string(), "g".to_string()]);
        assert!(state.advanced().read().await.game().result().unwrap().is_correct);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_is_refused_while_in_flight() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend.clone());
        *backend.sequence_length.lock().unwrap() = 1;
        *backend.submit_delay.lock().unwrap() = Duration::from_secs(5);
        start_advanced_game(&state, level(1)).await.unwrap();

        let auto = select_chord(&state, "c").await.unwrap().auto_submit.unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(state.advanced().read().await.game().view(), ViewPhase::Submitting);

        let err = submit_sequence(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        auto.await.unwrap();
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 1);
        assert_eq!(state.advanced().read().await.game().view(), ViewPhase::Resulted);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_preempts_auto_submit() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend.clone());
        *backend.sequence_length.lock().unwrap() = 2;
        start_advanced_game(&state, level(1)).await.unwrap();

        select_chord(&state, TARGET[0]).await.unwrap();
        let auto = select_chord(&state, TARGET[1]).await.unwrap().auto_submit.unwrap();
        let result = submit_sequence(&state).await.unwrap();
        assert!(result.is_correct);

        auto.await.unwrap();
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_manual_submit_is_not_retried_by_the_timer() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend.clone());
        *backend.sequence_length.lock().unwrap() = 2;
        *backend.fail_sequence_submits.lock().unwrap() = true;
        start_advanced_game(&state, level(1)).await.unwrap();

        select_chord(&state, TARGET[0]).await.unwrap();
        let auto = select_chord(&state, TARGET[1]).await.unwrap().auto_submit.unwrap();
        let err = submit_sequence(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::Network { .. }));

        auto.await.unwrap();
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 1);
        let slice = state.advanced().read().await;
        assert_eq!(slice.game().view(), ViewPhase::Ready);
        assert!(slice.game().error().is_some());
        drop(slice);

        *backend.fail_sequence_submits.lock().unwrap() = false;
        assert!(submit_sequence(&state).await.unwrap().is_correct);
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 2);

        clear_error(&state).await;
        assert!(state.advanced().read().await.game().error().is_none());
    }

    #[tokio::test]
    async fn subscription_refusal_keeps_current_level() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend.clone());
        *backend.subscription_from.lock().unwrap() = Some(3);

        start_advanced_game(&state, level(2)).await.unwrap();
        let err = start_advanced_game(&state, level(3)).await.unwrap_err();
        assert!(err.is_subscription_required());

        let slice = state.advanced().read().await;
        assert_eq!(slice.game().current_level(), level(2));
        assert!(slice.game().subscription_modal());
        assert_eq!(
            slice.game().error().and_then(|e| e.code.as_deref()),
            Some(CODE_SUBSCRIPTION_REQUIRED)
        );
        drop(slice);

        dismiss_subscription_modal(&state).await;
        assert!(!state.advanced().read().await.game().subscription_modal());
    }

    #[tokio::test]
    async fn chords_outside_the_pool_are_rejected() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend);
        start_advanced_game(&state, level(1)).await.unwrap();

        let err = select_chord(&state, "dim7").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(state.advanced().read().await.selection().chords().is_empty());
    }

    #[tokio::test]
    async fn incomplete_sequence_cannot_be_submitted() {
        let backend = FakeBackend::new();
        let (state, _) = app_state(backend.clone());
        start_advanced_game(&state, level(1)).await.unwrap();
        select_chord(&state, "c").await.unwrap();

        assert!(submit_sequence(&state).await.is_err());
        clear_sequence(&state).await.unwrap();
        assert!(state.advanced().read().await.selection().chords().is_empty());
        assert_eq!(backend.sequence_submits.load(Ordering::SeqCst), 0);
    }
}
