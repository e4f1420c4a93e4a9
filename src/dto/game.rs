use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    dto::{common::ChordDto, validation::validate_not_blank},
    state::game::AggregateStats,
};

/// Body of `POST /simple-game/start` and `POST /advanced-game/start`.
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    /// Omitted for guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub instrument_id: String,
    #[validate(range(min = 1, max = 4))]
    pub level: u8,
}

/// Round payload returned by `POST /simple-game/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRoundDto {
    #[serde(alias = "sessionId")]
    pub round_id: String,
    pub level: u8,
    #[serde(default)]
    pub audio_urls: Vec<String>,
    pub options: Vec<ChordDto>,
}

/// Body of `POST /simple-game/submit-answer`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub round_id: String,
    pub selected_chord_id: String,
    pub response_time_ms: u64,
}

/// Result payload returned by `POST /simple-game/submit-answer`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResultDto {
    pub is_correct: bool,
    pub correct_chord: ChordDto,
    pub selected_chord_id: String,
    #[serde(default)]
    pub stats: Option<AggregateStats>,
}

/// Round payload returned by `POST /advanced-game/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRoundDto {
    pub session_id: String,
    pub level: u8,
    pub sequence_length: usize,
    pub audio_urls: Vec<String>,
    pub chord_pool: Vec<ChordDto>,
}

/// Body of `POST /advanced-game/submit-sequence`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSequenceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub session_id: String,
    pub submitted_sequence: Vec<String>,
    pub response_time_ms: u64,
}

/// Result payload returned by `POST /advanced-game/submit-sequence`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceResultDto {
    pub is_correct: bool,
    pub correct_sequence: Vec<ChordDto>,
    pub submitted_sequence: Vec<String>,
    /// Older backends omit the comparison; it is then derived from the two sequences.
    #[serde(default)]
    pub comparison: Vec<bool>,
    #[serde(default)]
    pub stats: Option<AggregateStats>,
}
