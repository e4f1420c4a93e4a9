use tracing::info;
use validator::Validate;

use crate::{
    dao::{
        backend::ApiClient,
        session::{StoredSession, UserProfile},
    },
    dto::auth::{
        AuthDataDto, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    },
    error::ServiceError,
    state::{SharedState, game::Player},
};

/// Sign in with email and password.
pub async fn login(
    state: &SharedState,
    api: &ApiClient,
    form: LoginRequest,
) -> Result<UserProfile, ServiceError> {
    form.validate()?;
    let auth = api.login(&form).await?;
    establish(state, api, auth).await
}

/// Create an account and sign in with it.
pub async fn register(
    state: &SharedState,
    api: &ApiClient,
    form: RegisterRequest,
) -> Result<UserProfile, ServiceError> {
    form.validate()?;
    let auth = api.register(&form).await?;
    establish(state, api, auth).await
}

/// Ask for a password reset email. Returns the backend's acknowledgement, if any.
pub async fn forgot_password(
    api: &ApiClient,
    form: ForgotPasswordRequest,
) -> Result<Option<String>, ServiceError> {
    form.validate()?;
    Ok(api.forgot_password(&form).await?)
}

/// Set a new password using the emailed token.
pub async fn reset_password(
    api: &ApiClient,
    form: ResetPasswordRequest,
) -> Result<Option<String>, ServiceError> {
    form.validate()?;
    Ok(api.reset_password(&form).await?)
}

/// Resume the session stored on the device, if any.
pub async fn restore_session(
    state: &SharedState,
    api: &ApiClient,
) -> Result<Option<UserProfile>, ServiceError> {
    let Some(session) = state.sessions().load().await? else {
        info!("no stored session, playing as guest");
        return Ok(None);
    };

    api.set_token(Some(session.token)).await;
    state
        .set_player(Player::Authenticated {
            user_id: session.user.id.clone(),
        })
        .await;
    info!(user_id = %session.user.id, "session restored");
    Ok(Some(session.user))
}

/// Drop the credentials and the mirrored server stats, then return to guest play.
///
/// Guest stats and instrument choices survive.
pub async fn logout(state: &SharedState, api: &ApiClient) -> Result<(), ServiceError> {
    state.sessions().clear().await?;
    state.level_stats().clear().await?;
    api.set_token(None).await;
    state.set_player(Player::Guest).await;
    state.reset_slices().await;
    info!("logged out");
    Ok(())
}

async fn establish(
    state: &SharedState,
    api: &ApiClient,
    auth: AuthDataDto,
) -> Result<UserProfile, ServiceError> {
    let session = StoredSession {
        token: auth.token,
        refresh_token: auth.refresh_token,
        user: auth.user,
    };
    state.sessions().save(&session).await?;

    api.set_token(Some(session.token)).await;
    state
        .set_player(Player::Authenticated {
            user_id: session.user.id.clone(),
        })
        .await;
    state.reset_slices().await;

    info!(user_id = %session.user.id, subscribed = session.user.is_subscribed, "signed in");
    Ok(session.user)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;

    use super::*;
    use crate::{
        dao::{
            backend::config::BackendConfig,
            storage::{KEY_TOKEN, KEY_USER_ID, KeyValueStore},
        },
        services::{
            testing::{FakeBackend, app_state},
            today,
        },
        state::{
            AppState, GameSettings,
            game::{GameMode, Instrument},
        },
    };

    async fn spawn_backend(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(BackendConfig::new(format!("http://{addr}"))).unwrap()
    }

    fn auth_router(calls: Arc<AtomicU32>) -> Router {
        Router::new()
            .route(
                "/auth/login",
                post(move |Json(body): Json<serde_json::Value>| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if body["password"] == "wrong" {
                            return (
                                StatusCode::UNAUTHORIZED,
                                Json(json!({
                                    "success": false,
                                    "error": {
                                        "message": "Invalid credentials",
                                        "code": "INVALID_CREDENTIALS"
                                    }
                                })),
                            );
                        }
                        (
                            StatusCode::OK,
                            Json(json!({
                                "success": true,
                                "data": {
                                    "token": "jwt-1",
                                    "refreshToken": "refresh-1",
                                    "user": {
                                        "id": "u-1",
                                        "email": "player@example.com",
                                        "isSubscribed": true
                                    }
                                }
                            })),
                        )
                    }
                }),
            )
            .route(
                "/auth/forgot-password",
                post(|| async { Json(json!({"success": true, "message": "Check your inbox"})) }),
            )
    }

    fn login_form(password: &str) -> LoginRequest {
        LoginRequest {
            email: "player@example.com".into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_persists_session_and_switches_player() {
        let calls = Arc::new(AtomicU32::new(0));
        let api = spawn_backend(auth_router(calls.clone())).await;
        let (state, store) = app_state(FakeBackend::new());

        let user = login(&state, &api, login_form("secret")).await.unwrap();
        assert_eq!(user.id, "u-1");
        assert!(user.is_subscribed);
        assert_eq!(state.player().await.user_id(), Some("u-1"));
        assert_eq!(store.get(KEY_TOKEN).await.unwrap().as_deref(), Some("jwt-1"));
        assert_eq!(store.get(KEY_USER_ID).await.unwrap().as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn rejected_login_keeps_guest_mode() {
        let calls = Arc::new(AtomicU32::new(0));
        let api = spawn_backend(auth_router(calls)).await;
        let (state, store) = app_state(FakeBackend::new());

        let err = login(&state, &api, login_form("wrong")).await.unwrap_err();
        match err {
            ServiceError::Network { message, code } => {
                assert_eq!(message, "Invalid credentials");
                assert_eq!(code.as_deref(), Some("INVALID_CREDENTIALS"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(state.player().await.is_guest());
        assert!(store.get(KEY_TOKEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_forms_never_reach_the_backend() {
        let calls = Arc::new(AtomicU32::new(0));
        let api = spawn_backend(auth_router(calls.clone())).await;
        let (state, _) = app_state(FakeBackend::new());

        let err = login(
            &state,
            &api,
            LoginRequest {
                email: "nope".into(),
                password: "secret".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = register(
            &state,
            &api,
            RegisterRequest {
                email: "player@example.com".into(),
                password: "chords42".into(),
                confirm_password: "chords24".into(),
                username: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn forgot_password_returns_acknowledgement() {
        let api = spawn_backend(auth_router(Arc::new(AtomicU32::new(0)))).await;
        let message = forgot_password(
            &api,
            ForgotPasswordRequest {
                email: "player@example.com".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(message.as_deref(), Some("Check your inbox"));
    }

    #[tokio::test]
    async fn logout_keeps_guest_data_and_restore_resumes() {
        let api = spawn_backend(auth_router(Arc::new(AtomicU32::new(0)))).await;
        let (state, store) = app_state(FakeBackend::new());
        state
            .sessions()
            .set_instrument_id(Instrument::Piano, "piano-7")
            .await
            .unwrap();
        state
            .guest_stats()
            .update_game_stats(GameMode::Regular, true, true, today())
            .await
            .unwrap();

        login(&state, &api, login_form("secret")).await.unwrap();

        let restored_state = AppState::new(
            FakeBackend::new(),
            Arc::new(store.clone()),
            GameSettings::default(),
        );
        let user = restore_session(&restored_state, &api).await.unwrap().unwrap();
        assert_eq!(user.id, "u-1");
        assert!(!restored_state.player().await.is_guest());

        logout(&state, &api).await.unwrap();
        assert!(state.player().await.is_guest());
        assert!(store.get(KEY_TOKEN).await.unwrap().is_none());
        assert!(restore_session(&state, &api).await.unwrap().is_none());
        assert_eq!(
            state
                .sessions()
                .instrument_id(Instrument::Piano)
                .await
                .unwrap()
                .as_deref(),
            Some("piano-7")
        );
        assert_eq!(
            state
                .guest_stats()
                .get_game_mode_stats(GameMode::Regular)
                .await
                .unwrap()
                .total_attempts,
            1
        );
    }
}
