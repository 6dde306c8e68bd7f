use std::sync::Arc;

use anyhow::{Context, anyhow};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use parley_db::{Database, models::timestamp};
use parley_gateway::Dispatcher;
use parley_types::api::{
    Claims, SigninRequest, SigninResponse, SignupRequest, StatusMessage, UpdateProfileNameRequest,
    UpdateProfileRequest,
};
use parley_types::models::PublicUser;

use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::media::MediaStore;

pub const SESSION_COOKIE: &str = "jwt";
const SESSION_DAYS: i64 = 7;
const MIN_PASSWORD_LEN: usize = 6;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub media: MediaStore,
    /// Mark the session cookie `Secure` (production only).
    pub secure_cookies: bool,
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let full_name = req.full_name.trim().to_string();
    let email = normalize_email(&req.email);

    if full_name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Provide all fields"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let lookup = email.clone();
    if state
        .db
        .run(move |db| db.get_user_by_email(&lookup))
        .await?
        .is_some()
    {
        return Err(email_taken());
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task failed")??;
    let user_id = Uuid::new_v4().to_string();
    let now = timestamp(Utc::now());

    // A concurrent signup can claim the email between the lookup and the insert
    let row = state
        .db
        .run(move |db| {
            if !db.create_user(&user_id, &full_name, &email, &password_hash, &now)? {
                return Ok(None);
            }
            db.get_user_by_id(&user_id)?
                .map(Some)
                .ok_or_else(|| anyhow!("user {} missing after insert", user_id))
        })
        .await?
        .ok_or_else(email_taken)?;
    let user = row.to_public()?;

    let token = create_token(&state.jwt_secret, user.id)?;
    info!("New user {} <{}>", user.id, user.email);

    Ok((with_session(jar, &state, token), Json(user)))
}

pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SigninRequest>,
) -> ApiResult<impl IntoResponse> {
    // Same answer for unknown email, wrong password and empty input
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(invalid_credentials());
    }

    let row = state
        .db
        .run(move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    let password = req.password;
    let stored = row.password.clone();
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .context("password verification task failed")??;

    let user = row.to_public()?;
    let token = create_token(&state.jwt_secret, user.id)?;
    info!("{} signed in", user.id);

    Ok((
        with_session(jar, &state, token.clone()),
        Json(SigninResponse { user, token }),
    ))
}

pub async fn signout(
    Extension(me): Extension<PublicUser>,
    jar: CookieJar,
) -> impl IntoResponse {
    info!("{} signed out", me.id);
    // Overwrite with an already-expired cookie. Unlike `CookieJar::remove` this
    // is emitted even when the request authenticated with a bearer token.
    let expired = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    (jar.add(expired), Json(StatusMessage::new("Logged out successfully")))
}

pub async fn check_auth(Extension(me): Extension<PublicUser>) -> Json<PublicUser> {
    Json(me)
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(me): Extension<PublicUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<PublicUser>> {
    let source = req
        .profile_pic
        .filter(|pic| !pic.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Profile pic is required"))?;

    let url = state.media.store(&source).await?;
    let id = me.id.to_string();
    let now = timestamp(Utc::now());

    let row = state
        .db
        .run(move |db| db.update_profile_pic(&id, &url, &now))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(row.to_public()?))
}

pub async fn update_profile_name(
    State(state): State<AppState>,
    Extension(me): Extension<PublicUser>,
    Json(req): Json<UpdateProfileNameRequest>,
) -> ApiResult<Json<PublicUser>> {
    let full_name = req
        .full_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::validation("Full name is required"))?;

    let id = me.id.to_string();
    let now = timestamp(Utc::now());

    let row = state
        .db
        .run(move |db| db.update_full_name(&id, &full_name, &now))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(row.to_public()?))
}

/// Decode and validate a session token (signature and expiry).
pub fn verify_token(secret: &str, token: &str) -> ApiResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::auth("Unauthorized - Invalid token"))
}

pub fn create_token(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn with_session(jar: CookieJar, state: &AppStateInner, token: String) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.secure_cookies)
        .path("/")
        .max_age(time::Duration::days(SESSION_DAYS))
        .build();
    jar.add(cookie)
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    // Argon2id with a fresh random salt
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored: &str) -> ApiResult<()> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow!("corrupt password hash: {}", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| invalid_credentials())
}

fn email_taken() -> ApiError {
    ApiError::Conflict("Email already exists".into())
}

fn invalid_credentials() -> ApiError {
    ApiError::auth("Invalid credentials")
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
