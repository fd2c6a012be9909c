//! HTTP API handlers
//!
//! Request handlers for the reply endpoint and health check.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::{debug, error};

use mb_email::{EmailError, ReplyRequest};

use crate::server::AppState;

/// Success response payload
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Generic API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Send a threaded reply through the configured account.
///
/// Missing fields map to 400, transport failures to 500; the underlying
/// error detail stays in the log, not the response.
pub async fn send_reply(
    State(state): State<AppState>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Reply request to: {}", req.to);

    match state.sender.send(&req).await {
        Ok(_ack) => Ok(Json(StatusResponse {
            status: "Reply sent with threading headers".to_string(),
        })),
        Err(EmailError::MissingFields) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing fields".to_string(),
            }),
        )),
        Err(e) => {
            error!("Send error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to send".to_string(),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use mb_email::{MailTransport, OutboundMessage, ReplySender};

    use crate::routes::routes;
    use crate::server::AppState;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, message: OutboundMessage) -> mb_email::Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl MailTransport for FailingTransport {
        async fn deliver(&self, _message: OutboundMessage) -> mb_email::Result<()> {
            Err(mb_email::EmailError::SmtpSend("550 rejected".to_string()))
        }
    }

    fn app(transport: Arc<dyn MailTransport>) -> Router {
        let sender = Arc::new(ReplySender::with_transport("bridge@example.com", transport));
        routes().with_state(AppState { sender })
    }

    async fn post_send_reply(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/send-reply")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(RecordingTransport::default()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_send_reply_without_threading_ids() {
        let transport = Arc::new(RecordingTransport::default());

        let (status, body) = post_send_reply(
            app(transport.clone()),
            serde_json::json!({"to": "a@x.com", "subject": "Hi", "message": "hello"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Reply sent with threading headers");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].headers.in_reply_to.is_none());
        assert!(sent[0].headers.references.is_none());
    }

    #[tokio::test]
    async fn test_send_reply_with_message_id() {
        let transport = Arc::new(RecordingTransport::default());

        let (status, _body) = post_send_reply(
            app(transport.clone()),
            serde_json::json!({
                "to": "a@x.com",
                "subject": "Hi",
                "message": "hello",
                "messageId": "<id1>"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].headers.in_reply_to.as_deref(), Some("<id1>"));
        assert_eq!(sent[0].headers.references.as_deref(), Some("<id1>"));
    }

    #[tokio::test]
    async fn test_missing_fields_maps_to_400() {
        let transport = Arc::new(RecordingTransport::default());

        let (status, body) = post_send_reply(
            app(transport.clone()),
            serde_json::json!({"to": "a@x.com", "message": "hello"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing fields");
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_500() {
        let (status, body) = post_send_reply(
            app(Arc::new(FailingTransport)),
            serde_json::json!({"to": "a@x.com", "subject": "Hi", "message": "hello"}),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to send");
    }
}
