pub mod auth;
pub mod error;
pub mod extract;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod relay;
pub mod socket;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Request bodies carry inline base64 images, so allow a bit over the
/// decoded image limit.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// REST routes, relative to the `/api` mount point.
pub fn routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signin", post(auth::signin))
        // Authenticates during the upgrade itself
        .route("/socket", get(socket::socket_upgrade));

    let protected_routes = Router::new()
        .route("/auth/signout", post(auth::signout))
        .route("/auth/update-profile", put(auth::update_profile))
        .route("/auth/update-profile-name", put(auth::update_profile_name))
        .route("/auth/check", get(auth::check_auth))
        .route("/messages/users", get(messages::get_sidebar_users))
        .route("/messages/{user_id}", get(messages::get_messages))
        .route("/messages/send/{user_id}", post(messages::send_message))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}
