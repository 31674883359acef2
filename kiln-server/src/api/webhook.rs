//! Webhook API Handler
//!
//! Receives GitHub deliveries. Headers and the raw body are handed to the
//! dispatcher untouched; this layer only maps its decision to HTTP.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use kiln_core::dto::api::MessageResponse;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::webhook_service::{Dispatch, EVENT_HEADER, WebhookError};

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidEventType(event) => {
                tracing::warn!("Rejected webhook event '{}'", event);
                ApiError::BadRequest("Invalid event type".to_string())
            }
            WebhookError::InvalidContentType(content_type) => {
                tracing::warn!("Rejected webhook content type '{}'", content_type);
                ApiError::BadRequest("Invalid content type".to_string())
            }
            WebhookError::InvalidPayload(err) => {
                tracing::warn!("Rejected webhook payload: {}", err);
                ApiError::BadRequest(format!("Invalid payload: {}", err))
            }
        }
    }
}

/// POST /webhook
/// Accept a GitHub delivery; push events start a pipeline run
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let event_type = header_str(&headers, EVENT_HEADER);
    let content_type = header_str(&headers, header::CONTENT_TYPE.as_str());

    let dispatch = state
        .dispatcher
        .dispatch(event_type, content_type, &body)
        .await?;

    match dispatch {
        Dispatch::Ping => Ok((StatusCode::OK, Json(MessageResponse::new("pong")))),
        // The run outlives the request; its handle is not awaited here
        Dispatch::Started(_) => Ok((
            StatusCode::ACCEPTED,
            Json(MessageResponse::new("Processing started")),
        )),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
