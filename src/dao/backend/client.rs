use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use validator::Validate;

use crate::{
    dto::{
        auth::{
            AuthDataDto, ForgotPasswordRequest, LoginRequest, RegisterRequest,
            ResetPasswordRequest,
        },
        common::{ChordDto, Envelope},
        feedback::{FeedbackEntry, FeedbackRequest},
        game::{
            AnswerResultDto, SequenceResultDto, SequenceRoundDto, SimpleRoundDto,
            StartGameRequest, SubmitAnswerRequest, SubmitSequenceRequest,
        },
        stats::{DailyProgress, LeaderboardEntry},
    },
    state::game::{GameResult, GameRound, Level, Player, SequenceResult, SequenceRound},
};

use super::{
    AnswerSubmission, GameBackend, SequenceSubmission,
    config::BackendConfig,
    error::{ApiFailure, BackendError, BackendResult},
    models::{answer_result, sequence_result},
    retry::{RetryPolicy, retry_with_backoff},
};

const SIMPLE_START: &str = "simple-game/start";
const SIMPLE_SUBMIT: &str = "simple-game/submit-answer";
const ADVANCED_START: &str = "advanced-game/start";
const ADVANCED_SUBMIT: &str = "advanced-game/submit-sequence";

/// HTTP client for the chord trainer REST backend.
///
/// Every call goes through [`ApiClient::send`], which turns non-2xx responses and
/// `{success: false}` bodies into a single [`ApiFailure`] before anything else sees them.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Arc<RwLock<Option<String>>>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Build a client for the configured backend.
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| BackendError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            token: Arc::new(RwLock::new(None)),
            retry: config.retry,
        })
    }

    /// Install (or drop) the bearer token attached to every request.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T>(&self, path: &str, builder: RequestBuilder) -> BackendResult<T>
    where
        T: DeserializeOwned,
    {
        let body = self.send_raw(path, builder).await?;
        let envelope = serde_json::from_slice::<Envelope<T>>(&body).map_err(|source| {
            BackendError::DecodeResponse {
                path: path.to_string(),
                source,
            }
        })?;

        envelope.data.ok_or_else(|| BackendError::InvalidPayload {
            path: path.to_string(),
            reason: "response carries no data".into(),
        })
    }

    async fn send_raw(&self, path: &str, builder: RequestBuilder) -> BackendResult<Vec<u8>> {
        let response = builder
            .send()
            .await
            .map_err(|source| BackendError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| BackendError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        let flagged_failure = status.is_success()
            && serde_json::from_slice::<Envelope<Value>>(&body)
                .is_ok_and(|envelope| envelope.success == Some(false));

        if !status.is_success() || flagged_failure {
            let failure = ApiFailure::from_body(path, status, &body);
            debug!(
                path,
                status = %status,
                code = ?failure.code,
                "backend rejected request"
            );
            return Err(BackendError::Rejected(failure));
        }

        Ok(body.to_vec())
    }

    async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> BackendResult<T>
    where
        T: DeserializeOwned,
    {
        let builder = self.request(Method::GET, path).await.query(query);
        self.send(path, builder).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> BackendResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).await.json(body);
        self.send(path, builder).await
    }

    /// POST whose response only acknowledges; returns the backend message, if any.
    async fn post_ack<B>(&self, path: &str, body: &B) -> BackendResult<Option<String>>
    where
        B: ?Sized + Serialize,
    {
        let builder = self.request(Method::POST, path).await.json(body);
        let body = self.send_raw(path, builder).await?;
        let value = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
        let message = value
            .get("data")
            .and_then(|data| data.get("message"))
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(message)
    }

    fn start_request(
        path: &str,
        player: &Player,
        instrument_id: String,
        level: Level,
    ) -> BackendResult<StartGameRequest> {
        let request = StartGameRequest {
            user_id: player.user_id().map(str::to_string),
            instrument_id,
            level: level.get(),
        };
        request
            .validate()
            .map_err(|source| BackendError::InvalidRequest {
                path: path.to_string(),
                source,
            })?;
        Ok(request)
    }

    /// `GET /chords`, optionally filtered by instrument.
    pub async fn chords(&self, instrument_id: Option<&str>) -> BackendResult<Vec<ChordDto>> {
        match instrument_id {
            Some(id) => self.get("chords", &[("instrumentId", id)]).await,
            None => self.get("chords", &[]).await,
        }
    }

    /// `GET /stats/leaderboard/level/:id`.
    pub async fn leaderboard(&self, level: Level) -> BackendResult<Vec<LeaderboardEntry>> {
        self.get(&format!("stats/leaderboard/level/{level}"), &[])
            .await
    }

    /// `GET /stats/users/:id/daily-progress`.
    pub async fn daily_progress(&self, user_id: &str) -> BackendResult<Vec<DailyProgress>> {
        self.get(&format!("stats/users/{user_id}/daily-progress"), &[])
            .await
    }

    /// `POST /auth/login`.
    pub async fn login(&self, request: &LoginRequest) -> BackendResult<AuthDataDto> {
        self.post("auth/login", request).await
    }

    /// `POST /auth/register`.
    pub async fn register(&self, request: &RegisterRequest) -> BackendResult<AuthDataDto> {
        self.post("auth/register", request).await
    }

    /// `POST /auth/forgot-password`.
    pub async fn forgot_password(
        &self,
        request: &ForgotPasswordRequest,
    ) -> BackendResult<Option<String>> {
        self.post_ack("auth/forgot-password", request).await
    }

    /// `POST /auth/reset-password`.
    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> BackendResult<Option<String>> {
        self.post_ack("auth/reset-password", request).await
    }

    /// `POST /users/feedback`.
    pub async fn send_feedback(&self, request: &FeedbackRequest) -> BackendResult<FeedbackEntry> {
        self.post("users/feedback", request).await
    }

    /// `GET /users/feedback`.
    pub async fn list_feedback(&self) -> BackendResult<Vec<FeedbackEntry>> {
        self.get("users/feedback", &[]).await
    }
}

impl GameBackend for ApiClient {
    fn start_game(
        &self,
        player: Player,
        instrument_id: String,
        level: Level,
    ) -> BoxFuture<'static, BackendResult<GameRound>> {
        let api = self.clone();
        Box::pin(async move {
            let request = Self::start_request(SIMPLE_START, &player, instrument_id, level)?;
            let dto: SimpleRoundDto = api.post(SIMPLE_START, &request).await?;
            GameRound::try_from(dto).map_err(|reason| BackendError::InvalidPayload {
                path: SIMPLE_START.to_string(),
                reason,
            })
        })
    }

    fn submit_answer(
        &self,
        player: Player,
        answer: AnswerSubmission,
    ) -> BoxFuture<'static, BackendResult<GameResult>> {
        let api = self.clone();
        Box::pin(async move {
            let request = SubmitAnswerRequest {
                user_id: player.user_id().map(str::to_string),
                round_id: answer.round_id,
                selected_chord_id: answer.chord_id,
                response_time_ms: answer.response_time_ms,
            };
            let dto: AnswerResultDto = api.post(SIMPLE_SUBMIT, &request).await?;
            Ok(answer_result(dto, answer.response_time_ms))
        })
    }

    fn start_advanced_game(
        &self,
        player: Player,
        instrument_id: String,
        level: Level,
    ) -> BoxFuture<'static, BackendResult<SequenceRound>> {
        let api = self.clone();
        Box::pin(async move {
            let request = Self::start_request(ADVANCED_START, &player, instrument_id, level)?;
            let dto: SequenceRoundDto = api.post(ADVANCED_START, &request).await?;
            SequenceRound::try_from(dto).map_err(|reason| BackendError::InvalidPayload {
                path: ADVANCED_START.to_string(),
                reason,
            })
        })
    }

    fn submit_sequence(
        &self,
        player: Player,
        sequence: SequenceSubmission,
    ) -> BoxFuture<'static, BackendResult<SequenceResult>> {
        let api = self.clone();
        Box::pin(async move {
            let request = SubmitSequenceRequest {
                user_id: player.user_id().map(str::to_string),
                session_id: sequence.session_id,
                submitted_sequence: sequence.chord_ids,
                response_time_ms: sequence.response_time_ms,
            };

            let dto: SequenceResultDto = retry_with_backoff(
                api.retry,
                BackendError::is_rate_limited,
                || api.post(ADVANCED_SUBMIT, &request),
            )
            .await?;

            sequence_result(dto, sequence.response_time_ms).map_err(|reason| {
                BackendError::InvalidPayload {
                    path: ADVANCED_SUBMIT.to_string(),
                    reason,
                }
            })
        })
    }
}
