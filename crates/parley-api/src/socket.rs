use axum::{
    extract::{State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use parley_gateway::connection;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::Query;
use crate::middleware::authenticate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketQuery {
    user_id: Option<Uuid>,
}

/// GET /socket?userId=...: upgrade a signed-in client to the gateway.
pub async fn socket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
    jar: CookieJar,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let user = authenticate(&state, &jar, &headers).await?;

    if let Some(claimed) = query.user_id.filter(|id| *id != user.id) {
        warn!("Socket for {} claimed userId {}", user.id, claimed);
        return Err(ApiError::auth("Unauthorized - Session does not match userId"));
    }

    let dispatcher = state.dispatcher.clone();
    Ok(ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, user.id)))
}
