use std::path::PathBuf;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// 10 MB limit for a decoded image
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Public path prefix under which stored images are served.
pub const UPLOAD_ROUTE: &str = "/uploads";

/// Image storage for profile pictures and message attachments. Clients send
/// images inline as `data:` URLs; they are written to disk and replaced by a
/// public URL.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store an image and return the URL to save with the record.
    /// Already-hosted URLs are passed through untouched.
    pub async fn store(&self, source: &str) -> ApiResult<String> {
        let source = source.trim();
        if is_hosted(source) {
            return Ok(source.to_string());
        }

        let (ext, bytes) = decode_data_url(source)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create upload dir {}", self.dir.display()))?;

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!("Stored image {} ({} bytes)", name, bytes.len());
        Ok(format!("{}/{}", UPLOAD_ROUTE, name))
    }
}

fn is_hosted(source: &str) -> bool {
    source.starts_with("https://")
        || source.starts_with("http://")
        || source.starts_with(&format!("{}/", UPLOAD_ROUTE))
}

/// Split `data:image/png;base64,<payload>` into a file extension and bytes.
fn decode_data_url(source: &str) -> ApiResult<(&'static str, Vec<u8>)> {
    let invalid = || ApiError::validation("Image must be a base64 data URL");

    let (meta, payload) = source
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(invalid)?;
    let mime = meta.strip_suffix(";base64").ok_or_else(invalid)?;

    let ext = match mime.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => return Err(ApiError::validation("Unsupported image type")),
    };

    // Reject before decoding: base64 inflates by 4/3
    if payload.len() > MAX_IMAGE_SIZE / 3 * 4 + 4 {
        return Err(too_large());
    }

    let bytes = B64
        .decode(payload.trim())
        .map_err(|_| ApiError::validation("Image is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ApiError::validation("Image is empty"));
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(too_large());
    }

    Ok((ext, bytes))
}

fn too_large() -> ApiError {
    ApiError::validation("Image must be 10 MB or smaller")
}
