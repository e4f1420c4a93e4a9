use tracing::{info, warn};

use crate::{
    dao::backend::AnswerSubmission,
    error::ServiceError,
    services::{current_instrument_id, today},
    state::{
        SharedState,
        game::{AggregateStats, GameMode, GameResult, GameRound, Level, Player},
    },
};

/// Request a new single-chord round at `level`.
///
/// On failure the previous round and level stay on screen and the error is stored in the
/// slice; a `SUBSCRIPTION_REQUIRED` refusal also opens the upsell.
pub async fn start_game(state: &SharedState, level: Level) -> Result<GameRound, ServiceError> {
    let plan_id = state.regular().write().await.begin_start(level)?;
    let player = state.player().await;

    let outcome: Result<GameRound, ServiceError> = async {
        let instrument_id = current_instrument_id(state).await?;
        Ok(state
            .backend()
            .start_game(player, instrument_id, level)
            .await?)
    }
    .await;

    let mut slice = state.regular().write().await;
    match outcome {
        Ok(round) => {
            slice.start_fulfilled(plan_id, round.clone())?;
            info!(round_id = %round.round_id, %level, "regular round started");
            Ok(round)
        }
        Err(err) => {
            warn!(%level, error = %err, "failed to start regular round");
            slice.start_rejected(plan_id, &err);
            Err(err)
        }
    }
}

/// Submit `chord_id` as the answer of the current round.
///
/// Guests get their stats accumulated locally; signed-in players get the server's stats,
/// which are also mirrored per level.
pub async fn submit_answer(
    state: &SharedState,
    chord_id: &str,
) -> Result<GameResult, ServiceError> {
    let (plan_id, round_id, level, response_time_ms) = {
        let mut slice = state.regular().write().await;
        let round = slice
            .round()
            .ok_or_else(|| ServiceError::InvalidState("no round to answer".into()))?;
        if !round.options.iter().any(|option| option.id == chord_id) {
            return Err(ServiceError::Validation(format!(
                "chord `{chord_id}` is not an option of this round"
            )));
        }
        let round_id = round.round_id.clone();
        let level = round.level;
        let (plan_id, response_time_ms) = slice.begin_submit()?;
        (plan_id, round_id, level, response_time_ms)
    };

    let player = state.player().await;
    let submission = AnswerSubmission {
        round_id,
        chord_id: chord_id.to_string(),
        response_time_ms,
    };

    let result = match state
        .backend()
        .submit_answer(player.clone(), submission)
        .await
    {
        Ok(result) => result,
        Err(err) => {
            let err = ServiceError::from(err);
            warn!(error = %err, "failed to submit answer");
            state.regular().write().await.submit_rejected(plan_id, &err);
            return Err(err);
        }
    };

    let stats = record_stats(state, &player, level, &result).await;

    let mut slice = state.regular().write().await;
    match stats {
        Ok(stats) => slice.submit_fulfilled(plan_id, result.clone(), stats)?,
        Err(err) => {
            slice.submit_fulfilled(plan_id, result.clone(), None)?;
            slice.report_error(&err);
        }
    }

    info!(
        correct = result.is_correct,
        response_time_ms = result.response_time_ms,
        "answer submitted"
    );
    Ok(result)
}

async fn record_stats(
    state: &SharedState,
    player: &Player,
    level: Level,
    result: &GameResult,
) -> Result<Option<AggregateStats>, ServiceError> {
    if player.is_guest() {
        let stats = state
            .guest_stats()
            .update_game_stats(GameMode::Regular, result.is_correct, result.is_correct, today())
            .await?;
        return Ok(Some(stats));
    }

    if let Some(stats) = &result.stats {
        state.level_stats().record(level, stats).await?;
    }
    Ok(result.stats.clone())
}

/// Seed the regular screen's stats panel from local storage.
pub async fn load_stats(state: &SharedState) -> Result<Option<AggregateStats>, ServiceError> {
    let stats = if state.player().await.is_guest() {
        Some(
            state
                .guest_stats()
                .get_game_mode_stats(GameMode::Regular)
                .await?,
        )
    } else {
        let level = state.regular().read().await.current_level();
        state.level_stats().get(level).await?
    };

    if let Some(stats) = &stats {
        state.regular().write().await.set_stats(stats.clone());
    }
    Ok(stats)
}

/// Dismiss the error modal of the regular screen.
pub async fn clear_error(state: &SharedState) {
    state.regular().write().await.clear_error();
}

/// Close the subscription upsell of the regular screen.
pub async fn dismiss_subscription_modal(state: &SharedState) {
    state.regular().write().await.dismiss_subscription_modal();
}

/// Leave the regular screen; a response still in flight will be ignored.
pub async fn leave(state: &SharedState) {
    state.regular().write().await.reset();
}
