use teloxide::prelude::*;
use teloxide::types::FileId;
use teloxide::RequestError;

use crate::llm::media::{download_media, ImagePayload};
use crate::state::AppState;
use crate::stylist::StylistError;

/// The image a message carries: the largest photo size, or an image document.
#[derive(Debug, Clone)]
pub struct PhotoSource {
    pub file_id: FileId,
    pub size: u32,
    pub mime_hint: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PhotoDownloadError {
    #[error("That photo is too large ({size} bytes). Please send one under {limit} bytes.")]
    TooLarge { size: u64, limit: usize },
    #[error("I couldn't download that photo. Please try sending it again.")]
    Unavailable,
    #[error("Telegram refused the file request: {0}")]
    Telegram(#[from] RequestError),
    #[error(transparent)]
    Image(#[from] StylistError),
}

pub fn photo_source(message: &Message) -> Option<PhotoSource> {
    if let Some(photo) = message.photo().and_then(|sizes| sizes.last()) {
        return Some(PhotoSource {
            file_id: photo.file.id.clone(),
            size: photo.file.size,
            mime_hint: None,
        });
    }

    let document = message.document()?;
    let mime = document
        .mime_type
        .as_ref()
        .map(|mime| mime.essence_str().to_string())?;
    if !mime.starts_with("image/") {
        return None;
    }
    Some(PhotoSource {
        file_id: document.file.id.clone(),
        size: document.file.size,
        mime_hint: Some(mime),
    })
}

pub async fn get_file_url(bot: &Bot, bot_token: &str, file_id: &FileId) -> Result<String, RequestError> {
    let file = bot.get_file(file_id.clone()).await?;
    Ok(format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot_token, file.path
    ))
}

pub async fn download_photo(
    bot: &Bot,
    state: &AppState,
    source: &PhotoSource,
) -> Result<ImagePayload, PhotoDownloadError> {
    if source.size as usize > state.max_photo_bytes {
        return Err(PhotoDownloadError::TooLarge {
            size: u64::from(source.size),
            limit: state.max_photo_bytes,
        });
    }

    let url = get_file_url(bot, &state.bot_token, &source.file_id).await?;
    let bytes = download_media(&state.http, &url, "photo", state.max_photo_bytes)
        .await
        .ok_or(PhotoDownloadError::Unavailable)?;
    Ok(ImagePayload::from_bytes(&bytes, source.mime_hint.as_deref())?)
}
