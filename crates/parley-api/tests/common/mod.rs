#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

use parley_api::auth::{AppState, AppStateInner};
use parley_api::media::MediaStore;
use parley_db::Database;
use parley_gateway::Dispatcher;

pub const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Router over an in-memory database and a throwaway upload dir.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    /// Raw `Set-Cookie` header for the session cookie.
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("jwt="))
            .map(str::to_string)
    }

    /// `jwt=<token>`, ready to send back in a `Cookie` header.
    pub fn session_cookie(&self) -> String {
        let raw = self.set_cookie().expect("no session cookie in response");
        raw.split(';').next().unwrap().to_string()
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            dispatcher: Dispatcher::new(),
            media: MediaStore::new(uploads.path()),
            secure_cookies: false,
        });
        let router = parley_api::routes(state.clone());
        Self {
            router,
            state,
            uploads,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Reply {
        let body = body.map(|json| json.to_string());
        self.call_raw(method, uri, body.as_deref(), cookie).await
    }

    /// Like [`TestApp::call`], with the JSON body sent verbatim.
    pub async fn call_raw(
        &self,
        method: &str,
        uri: &str,
        body: Option<&str>,
        cookie: Option<&str>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(raw) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(raw.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Reply {
            status,
            headers,
            body,
        }
    }

    /// Serve the router on an ephemeral local port, for clients that need a
    /// real connection (WebSocket upgrades).
    pub async fn serve(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// Sign up a user and return their id and session cookie.
    pub async fn signup(&self, full_name: &str, email: &str, password: &str) -> (Uuid, String) {
        let reply = self
            .call(
                "POST",
                "/auth/signup",
                Some(json!({ "fullName": full_name, "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "signup failed: {}", reply.body);

        let id = reply.body["_id"].as_str().unwrap().parse().unwrap();
        (id, reply.session_cookie())
    }
}
