//! Remote REST backend: the game seam used by the services and its HTTP implementation.

pub mod client;
pub mod config;
pub mod error;
mod models;
pub mod retry;

use futures::future::BoxFuture;

use crate::state::game::{GameResult, GameRound, Level, Player, SequenceResult, SequenceRound};

pub use self::client::ApiClient;
use self::error::BackendResult;

/// Answer picked for a single-chord round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub round_id: String,
    pub chord_id: String,
    pub response_time_ms: u64,
}

/// Sequence assembled for an advanced round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSubmission {
    pub session_id: String,
    pub chord_ids: Vec<String>,
    pub response_time_ms: u64,
}

/// Game endpoints the slices depend on.
pub trait GameBackend: Send + Sync {
    /// `POST /simple-game/start`.
    fn start_game(
        &self,
        player: Player,
        instrument_id: String,
        level: Level,
    ) -> BoxFuture<'static, BackendResult<GameRound>>;

    /// `POST /simple-game/submit-answer`.
    fn submit_answer(
        &self,
        player: Player,
        answer: AnswerSubmission,
    ) -> BoxFuture<'static, BackendResult<GameResult>>;

    /// `POST /advanced-game/start`.
    fn start_advanced_game(
        &self,
        player: Player,
        instrument_id: String,
        level: Level,
    ) -> BoxFuture<'static, BackendResult<SequenceRound>>;

    /// `POST /advanced-game/submit-sequence`, retried while rate limited.
    fn submit_sequence(
        &self,
        player: Player,
        sequence: SequenceSubmission,
    ) -> BoxFuture<'static, BackendResult<SequenceResult>>;
}
