use tracing::info;
use validator::Validate;

use crate::{
    dao::backend::ApiClient,
    dto::feedback::{FeedbackEntry, FeedbackRequest},
    error::ServiceError,
};

/// Send feedback after local validation.
pub async fn send_feedback(
    api: &ApiClient,
    form: FeedbackRequest,
) -> Result<FeedbackEntry, ServiceError> {
    form.validate()?;
    let entry = api.send_feedback(&form).await?;
    info!(feedback_id = %entry.id, "feedback sent");
    Ok(entry)
}

/// Feedback previously sent by the signed-in user.
pub async fn list_feedback(api: &ApiClient) -> Result<Vec<FeedbackEntry>, ServiceError> {
    Ok(api.list_feedback().await?)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};

    use super::*;
    use crate::dao::backend::config::BackendConfig;

    async fn spawn_backend(received: Arc<Mutex<Vec<Value>>>) -> ApiClient {
        let router = Router::new()
            .route(
                "/users/feedback",
                post(move |Json(body): Json<Value>| {
                    let received = received.clone();
                    async move {
                        received.lock().unwrap().push(body.clone());
                        Json(json!({
                            "success": true,
                            "data": {
                                "id": "fb-1",
                                "message": body["message"],
                                "rating": body["rating"]
                            }
                        }))
                    }
                })
                .get(|| async {
                    Json(json!({
                        "success": true,
                        "data": [{
                            "id": "fb-0",
                            "message": "more jazz chords",
                            "createdAt": "2026-10-01"
                        }]
                    }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(BackendConfig::new(format!("http://{addr}"))).unwrap()
    }

    #[tokio::test]
    async fn feedback_is_validated_then_sent() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let api = spawn_backend(received.clone()).await;

        let err = send_feedback(
            &api,
            FeedbackRequest {
                message: "   ".into(),
                category: None,
                rating: Some(9),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(received.lock().unwrap().is_empty());

        let entry = send_feedback(
            &api,
            FeedbackRequest {
                message: "love the piano samples".into(),
                category: Some("audio".into()),
                rating: Some(5),
            },
        )
        .await
        .unwrap();
        assert_eq!(entry.id, "fb-1");
        assert_eq!(entry.rating, Some(5));
        assert_eq!(received.lock().unwrap()[0]["category"], "audio");
    }

    #[tokio::test]
    async fn history_is_listed() {
        let api = spawn_backend(Arc::new(Mutex::new(Vec::new()))).await;
        let entries = list_feedback(&api).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].created_at.as_deref(), Some("2026-10-01"));
    }
}
