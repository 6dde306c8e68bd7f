use std::path::PathBuf;

use anyhow::{Context, Result};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from `PARLEY_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Browser origin allowed to call the API with credentials.
    pub client_origin: String,
    pub upload_dir: PathBuf,
    /// Production mode: session cookies are marked `Secure`.
    pub production: bool,
    /// Built frontend to serve for every non-API path, if any.
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = var("PARLEY_PORT", "5001");
        let port = port
            .parse::<u16>()
            .with_context(|| format!("PARLEY_PORT is not a valid port: {}", port))?;

        Ok(Self {
            host: var("PARLEY_HOST", "0.0.0.0"),
            port,
            db_path: var("PARLEY_DB_PATH", "parley.db").into(),
            jwt_secret: var("PARLEY_JWT_SECRET", DEV_JWT_SECRET),
            client_origin: var("PARLEY_CLIENT_ORIGIN", "http://localhost:5173"),
            upload_dir: var("PARLEY_UPLOAD_DIR", "./uploads").into(),
            production: var("PARLEY_ENV", "development").eq_ignore_ascii_case("production"),
            static_dir: get("PARLEY_STATIC_DIR").filter(|d| !d.is_empty()).map(PathBuf::from),
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
