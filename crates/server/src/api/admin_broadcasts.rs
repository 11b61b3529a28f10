use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use nightwatch_core::{BroadcastAudience, DomainError, MessageType, NewAuditEvent, NewOutboxItem};
use nightwatch_store::NewBroadcast;

use crate::auth_middleware::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

use super::schemas::CreateBroadcastRequest;

/// `POST /api/admin/broadcasts` -- creates a broadcast row and enqueues the
/// `BROADCAST` outbox item that drives fan-out (§4.5 "Fan-out").
#[utoipa::path(
    post,
    path = "/api/admin/broadcasts",
    tag = "Admin/Broadcasts",
    request_body = CreateBroadcastRequest,
    responses((status = 201, description = "Broadcast created"))
)]
pub async fn create_broadcast(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Json(req): Json<CreateBroadcastRequest>,
) -> ApiResult<impl IntoResponse> {
    let audience = BroadcastAudience::from_str_loose(&req.audience)
        .ok_or_else(|| DomainError::BadRequest(format!("unknown audience {:?}", req.audience)))?;

    let broadcast = state
        .store
        .create_broadcast(NewBroadcast { title: req.title, message: req.message, audience })
        .await?;

    state
        .store
        .enqueue_outbox_item(NewOutboxItem::now(
            MessageType::Broadcast,
            // Fan-out resolves its own recipient list from `audience`; the
            // outbox row's `recipient` field is unused by this message type.
            "broadcast".to_owned(),
            serde_json::json!({
                "broadcast_id": broadcast.broadcast_id,
                "title": broadcast.title,
                "message": broadcast.message,
                "audience": broadcast.audience.as_str(),
            }),
        ))
        .await?;

    if let Err(err) = state
        .store
        .append_audit_event(
            NewAuditEvent::new("broadcast.create", format!("broadcast:{}", broadcast.broadcast_id)).by(admin.user_id),
        )
        .await
    {
        warn!(error = %err, "audit write failed for admin mutation");
    }

    Ok((StatusCode::CREATED, Json(broadcast)))
}
