use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use parley_types::models::PublicUser;

use crate::auth::{AppState, SESSION_COOKIE, verify_token};
use crate::error::{ApiError, ApiResult};

/// Guard for protected routes. Attaches the signed-in [`PublicUser`] to the
/// request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let headers = req.headers().clone();
    let user = authenticate(&state, &jar, &headers).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Resolve the session on a request: token from the `jwt` cookie or an
/// `Authorization: Bearer` header, then the user it belongs to.
pub async fn authenticate(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> ApiResult<PublicUser> {
    let token = session_token(jar, headers)
        .ok_or_else(|| ApiError::auth("Unauthorized - No token provided"))?;

    let claims = verify_token(&state.jwt_secret, &token)?;

    let id = claims.sub.to_string();
    let row = state
        .db
        .run(move |db| db.get_user_by_id(&id))
        .await?
        .ok_or_else(|| {
            debug!("Valid token for deleted user {}", claims.sub);
            ApiError::not_found("User not found")
        })?;

    Ok(row.to_public()?)
}

fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
