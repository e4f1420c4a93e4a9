//! Scripted [`GameBackend`] used by the service tests.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use reqwest::StatusCode;

use crate::{
    dao::{
        backend::{
            AnswerSubmission, GameBackend, SequenceSubmission,
            error::{ApiFailure, BackendError, BackendResult},
        },
        memory_store::MemoryStore,
    },
    error::CODE_SUBSCRIPTION_REQUIRED,
    state::{
        AppState, GameSettings, SharedState,
        game::{
            AggregateStats, ChordOption, GameResult, GameRound, Level, Player, SequenceResult,
            SequenceRound,
        },
    },
};

pub(crate) const TARGET: [&str; 4] = ["c", "g", "am", "f"];

pub(crate) fn chord(id: &str) -> ChordOption {
    ChordOption {
        id: id.into(),
        name: id.to_uppercase(),
        audio_url: Some(format!("{id}.mp3")),
    }
}

pub(crate) fn server_stats() -> AggregateStats {
    AggregateStats {
        streak: 9,
        accuracy: 88,
        total_attempts: 50,
        correct_answers: 44,
        wins: 44,
        last_played_date: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    /// Levels at or above this one are refused with `SUBSCRIPTION_REQUIRED`.
    pub subscription_from: Mutex<Option<u8>>,
    /// Next start call fails with a plain 500.
    pub fail_next_start: Mutex<bool>,
    /// Sequence submissions fail with a plain 500 while set.
    pub fail_sequence_submits: Mutex<bool>,
    pub sequence_length: Mutex<usize>,
    pub submit_delay: Mutex<Duration>,
    pub sequence_submits: AtomicU32,
    pub answer_submits: AtomicU32,
    pub last_sequence: Mutex<Option<SequenceSubmission>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        let backend = Self::default();
        *backend.sequence_length.lock().unwrap() = 3;
        Arc::new(backend)
    }

    fn refusal(&self, path: &str, level: Level) -> Option<BackendError> {
        if std::mem::take(&mut *self.fail_next_start.lock().unwrap()) {
            return Some(BackendError::Rejected(ApiFailure {
                path: path.into(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "backend down".into(),
                code: None,
            }));
        }
        let threshold = *self.subscription_from.lock().unwrap();
        threshold
            .filter(|min| level.get() >= *min)
            .map(|_| {
                BackendError::Rejected(ApiFailure {
                    path: path.into(),
                    status: StatusCode::FORBIDDEN,
                    message: "subscription required".into(),
                    code: Some(CODE_SUBSCRIPTION_REQUIRED.into()),
                })
            })
    }
}

fn stats_for(player: &Player) -> Option<AggregateStats> {
    match player {
        Player::Guest => None,
        Player::Authenticated { .. } => Some(server_stats()),
    }
}

impl GameBackend for FakeBackend {
    fn start_game(
        &self,
        _player: Player,
        _instrument_id: String,
        level: Level,
    ) -> BoxFuture<'static, BackendResult<GameRound>> {
        let outcome = match self.refusal("simple-game/start", level) {
            Some(err) => Err(err),
            None => Ok(GameRound {
                round_id: format!("round-{level}"),
                level,
                target_audio: vec!["c.mp3".into()],
                options: TARGET.iter().map(|id| chord(id)).collect(),
            }),
        };
        Box::pin(async move { outcome })
    }

    fn submit_answer(
        &self,
        player: Player,
        answer: AnswerSubmission,
    ) -> BoxFuture<'static, BackendResult<GameResult>> {
        self.answer_submits.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            Ok(GameResult {
                is_correct: answer.chord_id == TARGET[0],
                correct_chord: chord(TARGET[0]),
                selected_chord_id: answer.chord_id,
                stats: stats_for(&player),
                response_time_ms: answer.response_time_ms,
            })
        })
    }

    fn start_advanced_game(
        &self,
        _player: Player,
        _instrument_id: String,
        level: Level,
    ) -> BoxFuture<'static, BackendResult<SequenceRound>> {
        let length = *self.sequence_length.lock().unwrap();
        let outcome = match self.refusal("advanced-game/start", level) {
            Some(err) => Err(err),
            None => Ok(SequenceRound {
                session_id: format!("session-{level}"),
                level,
                sequence_length: length,
                target_audio: TARGET[..length].iter().map(|id| format!("{id}.mp3")).collect(),
                chord_pool: TARGET.iter().map(|id| chord(id)).collect(),
            }),
        };
        Box::pin(async move { outcome })
    }

    fn submit_sequence(
        &self,
        player: Player,
        sequence: SequenceSubmission,
    ) -> BoxFuture<'static, BackendResult<SequenceResult>> {
        self.sequence_submits.fetch_add(1, Ordering::SeqCst);
        *self.last_sequence.lock().unwrap() = Some(sequence.clone());
        let delay = *self.submit_delay.lock().unwrap();
        let failing = *self.fail_sequence_submits.lock().unwrap();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            if failing {
                return Err(BackendError::Rejected(ApiFailure {
                    path: "advanced-game/submit".into(),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "backend down".into(),
                    code: None,
                }));
            }
            let target = &TARGET[..sequence.chord_ids.len()];
            let comparison: Vec<bool> = sequence
                .chord_ids
                .iter()
                .zip(target)
                .map(|(submitted, expected)| submitted == expected)
                .collect();
            Ok(SequenceResult {
                is_correct: comparison.iter().all(|hit| *hit),
                correct_sequence: target.iter().map(|id| chord(id)).collect(),
                submitted_sequence: sequence.chord_ids,
                comparison,
                stats: stats_for(&player),
                response_time_ms: sequence.response_time_ms,
            })
        })
    }
}

pub(crate) fn app_state(backend: Arc<FakeBackend>) -> (SharedState, MemoryStore) {
    let store = MemoryStore::new();
    let state = AppState::new(backend, Arc::new(store.clone()), GameSettings::default());
    (state, store)
}
