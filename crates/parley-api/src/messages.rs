use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use parley_types::api::SendMessageRequest;
use parley_types::models::{Message, PublicUser};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::relay::{self, MessageContent};

/// GET /messages/users: people to show in the conversation sidebar.
pub async fn get_sidebar_users(
    State(state): State<AppState>,
    Extension(me): Extension<PublicUser>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    Ok(Json(relay::sidebar_users(&state.db, me.id).await?))
}

/// GET /messages/{user_id}: the conversation between the caller and `user_id`.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(me): Extension<PublicUser>,
) -> ApiResult<Json<Vec<Message>>> {
    Ok(Json(relay::conversation(&state.db, me.id, user_id).await?))
}

/// POST /messages/send/{user_id}
pub async fn send_message(
    State(state): State<AppState>,
    Path(receiver_id): Path<Uuid>,
    Extension(me): Extension<PublicUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut content = MessageContent::new(req.text, req.image)?;

    if let Some(source) = content.image().map(str::to_owned) {
        // Nothing is written to the upload dir for a message that can't be sent
        relay::check_receiver(&state.db, receiver_id).await?;
        let url = state.media.store(&source).await?;
        content = content.with_image(url);
    }

    let message = relay::send(&state.db, &state.dispatcher, me.id, receiver_id, content).await?;

    Ok((StatusCode::CREATED, Json(message)))
}
