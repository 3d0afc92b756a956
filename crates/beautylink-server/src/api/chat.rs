use axum::{extract::State, Extension, Json};
use beautylink_remote::{DirectChat, DirectChatRequest};

use crate::middleware::RequestId;

use super::{map_remote_error, ApiError, ApiResponse, AppState};

/// POST /api/v1/chat/direct: open (or reuse) a client/provider conversation.
pub(super) async fn open_direct_chat(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DirectChatRequest>,
) -> Result<Json<ApiResponse<DirectChat>>, ApiError> {
    let chat = state
        .api
        .open_direct_chat(&body)
        .await
        .map_err(|e| map_remote_error(req_id.0.clone(), e))?;

    tracing::info!(
        chat_id = %chat.id,
        client_id = %body.client_id,
        provider_id = %body.provider_id,
        "direct chat opened"
    );
    Ok(ApiResponse::new(req_id.0, chat))
}
