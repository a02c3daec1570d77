use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{error, warn};

use crate::stylist::StylistError;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

static DATA_URI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(?P<mime>[\w.+-]+/[\w.+-]+)?(?:;[\w=.+-]+)*;base64,")
        .expect("data URI pattern is valid")
});

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

/// Base64 image ready to be sent as `inlineData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    /// Accepts either a `data:<mime>;base64,<data>` URI or bare base64. The MIME
    /// type comes from the prefix when present, otherwise from the decoded bytes.
    pub fn parse(input: &str) -> Result<Self, StylistError> {
        let trimmed = input.trim();
        let (declared_mime, data) = match DATA_URI_PREFIX.captures(trimmed) {
            Some(captures) => {
                let prefix_len = captures.get(0).map(|m| m.end()).unwrap_or(0);
                let mime = captures.name("mime").map(|m| m.as_str().to_string());
                (mime, &trimmed[prefix_len..])
            }
            None => {
                if trimmed.starts_with("data:") {
                    return Err(StylistError::InvalidImage(
                        "data URI is not base64 encoded".to_string(),
                    ));
                }
                (None, trimmed)
            }
        };

        let data: String = data.chars().filter(|ch| !ch.is_whitespace()).collect();
        if data.is_empty() {
            return Err(StylistError::InvalidImage("image payload is empty".to_string()));
        }

        let bytes = general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|err| StylistError::InvalidImage(format!("invalid base64 data: {err}")))?;

        let mime_type = declared_mime
            .or_else(|| detect_mime_type(&bytes))
            .map(|mime| normalize_image_mime_type(&mime))
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

        Ok(Self { mime_type, data })
    }

    pub fn from_bytes(bytes: &[u8], mime_hint: Option<&str>) -> Result<Self, StylistError> {
        if bytes.is_empty() {
            return Err(StylistError::InvalidImage("image payload is empty".to_string()));
        }
        let mime_type = detect_mime_type(bytes)
            .or_else(|| mime_hint.map(|hint| hint.to_string()))
            .map(|mime| normalize_image_mime_type(&mime))
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
        if !mime_type.starts_with("image/") {
            return Err(StylistError::InvalidImage(format!(
                "unsupported media type {mime_type}"
            )));
        }

        Ok(Self {
            mime_type,
            data: general_purpose::STANDARD.encode(bytes),
        })
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// File extension for uploads; unknown types keep the PNG default.
    pub fn file_extension(&self) -> &'static str {
        match normalize_image_mime_type(&self.mime_type).as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => "png",
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, StylistError> {
        general_purpose::STANDARD
            .decode(self.data.as_bytes())
            .map_err(|err| StylistError::InvalidImage(format!("invalid base64 data: {err}")))
    }
}

const MEDIA_DOWNLOAD_MAX_ATTEMPTS: usize = 3;
const MEDIA_DOWNLOAD_BASE_DELAY_MS: u64 = 400;
const MEDIA_DOWNLOAD_ERROR_BODY_LIMIT: usize = 800;

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn should_retry_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Fetches a file, retrying transient failures. `url` may embed the bot token,
/// so callers pass a `log_label` for messages instead.
pub async fn download_media(
    client: &Client,
    url: &str,
    log_label: &str,
    max_bytes: usize,
) -> Option<Vec<u8>> {
    for attempt in 0..MEDIA_DOWNLOAD_MAX_ATTEMPTS {
        let response = match client.get(url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(
                    "Failed to fetch media {log_label} (timeout={}, connect={}, status={:?}, attempt={}/{})",
                    err.is_timeout(),
                    err.is_connect(),
                    err.status(),
                    attempt + 1,
                    MEDIA_DOWNLOAD_MAX_ATTEMPTS
                );
                if !should_retry_error(&err) || attempt + 1 == MEDIA_DOWNLOAD_MAX_ATTEMPTS {
                    return None;
                }
                let delay = Duration::from_millis(MEDIA_DOWNLOAD_BASE_DELAY_MS << attempt);
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Media download failed for {log_label} with status {}: {}",
                status,
                truncate_for_log(&body, MEDIA_DOWNLOAD_ERROR_BODY_LIMIT)
            );
            if !should_retry_status(status) || attempt + 1 == MEDIA_DOWNLOAD_MAX_ATTEMPTS {
                return None;
            }
            let delay = Duration::from_millis(MEDIA_DOWNLOAD_BASE_DELAY_MS << attempt);
            tokio::time::sleep(delay).await;
            continue;
        }

        if let Some(length) = response.content_length() {
            if length as usize > max_bytes {
                warn!(
                    "Media {log_label} is {} bytes, above the {} byte limit",
                    length, max_bytes
                );
                return None;
            }
        }

        return match response.bytes().await {
            Ok(bytes) if bytes.len() > max_bytes => {
                warn!(
                    "Media {log_label} is {} bytes, above the {} byte limit",
                    bytes.len(),
                    max_bytes
                );
                None
            }
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                error!(
                    "Failed to read media bytes {log_label}: {err} (attempt={}/{})",
                    attempt + 1,
                    MEDIA_DOWNLOAD_MAX_ATTEMPTS
                );
                if attempt + 1 == MEDIA_DOWNLOAD_MAX_ATTEMPTS {
                    None
                } else {
                    let delay = Duration::from_millis(MEDIA_DOWNLOAD_BASE_DELAY_MS << attempt);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
        };
    }

    None
}
