use crate::error::AppError;
use crate::AppState;
use base64::Engine;

pub const BACKGROUND_KEY: &str = "background";
const DEFAULT_BACKGROUND: &str = "./background.jpg";

/// Binary value kept by the page's local database.
#[derive(Debug, Clone)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Key/value image storage owned by the hosting page.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Blob>, AppError>;
}

/// Source for the landing page background: the configured link, then the
/// image the user stored, then the bundled default. Stored images come back
/// as a data URI.
pub async fn background_image(state: &AppState, store: &dyn BlobStore) -> String {
    if let Some(link) = state.config.read().await.background_link.clone() {
        return link;
    }

    match store.get(BACKGROUND_KEY).await {
        Ok(Some(blob)) => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(&blob.bytes);
            format!("data:{};base64,{}", blob.content_type, b64)
        }
        Ok(None) => DEFAULT_BACKGROUND.to_string(),
        Err(e) => {
            log::warn!("Failed to read stored background: {}", e);
            DEFAULT_BACKGROUND.to_string()
        }
    }
}
