use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::info;

use crate::encoder::{decode_image, guess_image_extension};
use crate::gemini::InlineData;
use crate::utils::images_dir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: String,
    pub encoded_data: String,
    pub mime_type: String,
    pub created_at: String,
}

impl GeneratedImage {
    pub fn new(id: String, inline: InlineData) -> Self {
        Self {
            id,
            encoded_data: inline.data,
            mime_type: inline.mime_type,
            created_at: now_iso(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.encoded_data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub id: String,
    pub mime_type: String,
    pub created_at: String,
}

impl From<&GeneratedImage> for ImageSummary {
    fn from(image: &GeneratedImage) -> Self {
        Self {
            id: image.id.clone(),
            mime_type: image.mime_type.clone(),
            created_at: image.created_at.clone(),
        }
    }
}

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

pub async fn save_generated_image(data_dir: &Path, image: &GeneratedImage) -> Result<PathBuf> {
    let bytes = decode_image(&image.encoded_data)?;
    let dir = images_dir(data_dir);
    tokio::fs::create_dir_all(&dir)
        .await
        .context("create images dir")?;

    let ext = guess_image_extension(&bytes);
    let path = dir.join(format!("{}.{}", image.id, ext));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "saved generated image");
    Ok(path)
}
