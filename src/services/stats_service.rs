use tracing::debug;

use crate::{
    dao::backend::ApiClient,
    dto::stats::{DailyProgress, LeaderboardEntry},
    error::ServiceError,
    services::current_instrument_id,
    state::{
        SharedState,
        game::{AggregateStats, ChordOption, GameMode, Level},
    },
};

/// Top players of `level`.
pub async fn leaderboard(
    api: &ApiClient,
    level: Level,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let entries = api.leaderboard(level).await?;
    debug!(%level, entries = entries.len(), "leaderboard fetched");
    Ok(entries)
}

/// Per-day progress of the signed-in player. Guests have no server history.
pub async fn daily_progress(
    state: &SharedState,
    api: &ApiClient,
) -> Result<Vec<DailyProgress>, ServiceError> {
    let player = state.player().await;
    let user_id = player
        .user_id()
        .ok_or_else(|| ServiceError::InvalidState("daily progress requires signing in".into()))?;
    Ok(api.daily_progress(user_id).await?)
}

/// Chord catalogue of the selected instrument.
pub async fn chords(
    state: &SharedState,
    api: &ApiClient,
) -> Result<Vec<ChordOption>, ServiceError> {
    let instrument_id = current_instrument_id(state).await?;
    let chords = api.chords(Some(&instrument_id)).await?;
    Ok(chords.into_iter().map(ChordOption::from).collect())
}

/// Locally accumulated guest stats of `mode`.
pub async fn guest_mode_stats(
    state: &SharedState,
    mode: GameMode,
) -> Result<AggregateStats, ServiceError> {
    Ok(state.guest_stats().get_game_mode_stats(mode).await?)
}
