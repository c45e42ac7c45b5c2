use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::EncodeError;

#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub source: FileSource,
}

impl RawFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_from_name(&path).unwrap_or("application/octet-stream");
        Self {
            name,
            mime_type: mime_type.to_string(),
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime_type = mime_from_name(Path::new(&name))
            .or_else(|| sniff_mime(&bytes))
            .unwrap_or("application/octet-stream");
        Self {
            name,
            mime_type: mime_type.to_string(),
            source: FileSource::Memory(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

pub async fn encode_file(file: &RawFile) -> Result<EncodedImage, EncodeError> {
    let (data, mime_type) = match &file.source {
        FileSource::Path(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|source| EncodeError::Read {
                name: file.name.clone(),
                source,
            })?;
            let mime_type = match mime_from_name(path) {
                Some(_) => file.mime_type.clone(),
                None => sniff_mime(&bytes)
                    .map(str::to_string)
                    .unwrap_or_else(|| file.mime_type.clone()),
            };
            (B64.encode(bytes), mime_type)
        }
        FileSource::Memory(bytes) => (B64.encode(bytes), file.mime_type.clone()),
    };
    Ok(EncodedImage { data, mime_type })
}

pub fn strip_data_uri(s: &str) -> &str {
    if s.starts_with("data:") {
        if let Some(idx) = s.find(',') {
            return &s[(idx + 1)..];
        }
    }
    s
}

pub fn decode_image(s: &str) -> Result<Vec<u8>> {
    B64.decode(strip_data_uri(s).trim())
        .map_err(|e| anyhow!("base64 decode: {e}"))
}

pub fn mime_from_name(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some("image/png");
    }
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        return Some("image/jpeg");
    }
    // RIFF....WEBP
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
        return Some("image/gif");
    }
    None
}

pub fn guess_image_extension(bytes: &[u8]) -> &'static str {
    match sniff_mime(bytes) {
        Some("image/jpeg") => "jpg",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => "png",
    }
}
