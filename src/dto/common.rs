use serde::Deserialize;

/// Success envelope wrapping every backend payload: `{success, data}`.
///
/// Error bodies (`{success: false, error: {message, code}}` and its variants) are not
/// decoded here; see [`crate::dao::backend::error::ApiFailure::from_body`].
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
}

/// Chord as exposed by the chord catalogue and the game endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChordDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub audio_url: Option<String>,
}
