/// Advanced (chord sequence) game orchestration.
pub mod advanced_service;
/// Sign-in, registration, password recovery and logout.
pub mod auth_service;
/// Feedback submission and history.
pub mod feedback_service;
/// Regular (single chord) game orchestration.
pub mod game_service;
/// Serialized playback of chord samples.
pub mod playback;
/// Leaderboards, progress and chord catalogue.
pub mod stats_service;

#[cfg(test)]
pub(crate) mod testing;

use time::{Date, OffsetDateTime};

use crate::{
    error::ServiceError,
    state::{SharedState, game::Instrument},
};

/// Calendar day on the device, falling back to UTC when the local offset is unknown.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Backend id of the selected instrument: the stored choice, else the configured default.
pub async fn current_instrument_id(state: &SharedState) -> Result<String, ServiceError> {
    let instrument = state.instrument().await;
    if let Some(id) = state.sessions().instrument_id(instrument).await? {
        return Ok(id);
    }

    let settings = state.settings();
    Ok(match instrument {
        Instrument::Guitar => settings.default_guitar_id.clone(),
        Instrument::Piano => settings.default_piano_id.clone(),
    })
}
