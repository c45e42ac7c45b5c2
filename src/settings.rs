use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_CHARACTER_SLOTS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub suggest_temperature: Option<f32>,
    pub enhance_temperature: Option<f32>,
    pub enhance_top_p: Option<f32>,
    pub character_slots: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub suggest_temperature: f32,
    pub enhance_temperature: f32,
    pub enhance_top_p: f32,
    pub character_slots: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            suggest_temperature: 0.9,
            enhance_temperature: 0.8,
            enhance_top_p: 0.95,
            character_slots: DEFAULT_CHARACTER_SLOTS,
        }
    }
}

impl Settings {
    pub fn models(&self) -> ModelSettings {
        let d = ModelSettings::default();
        ModelSettings {
            base_url: non_blank(&self.gemini_base_url).unwrap_or(d.base_url),
            text_model: non_blank(&self.text_model).unwrap_or(d.text_model),
            image_model: non_blank(&self.image_model).unwrap_or(d.image_model),
            suggest_temperature: self.suggest_temperature.unwrap_or(d.suggest_temperature),
            enhance_temperature: self.enhance_temperature.unwrap_or(d.enhance_temperature),
            enhance_top_p: self.enhance_top_p.unwrap_or(d.enhance_top_p),
            character_slots: self
                .character_slots
                .filter(|n| *n > 0)
                .unwrap_or(d.character_slots),
        }
    }

    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<String> {
        non_blank(&self.gemini_api_key)
            .or_else(|| non_blank(&env("GEMINI_API_KEY")))
            .or_else(|| non_blank(&env("API_KEY")))
            .context("Gemini API key not set")
    }
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub fn load_settings_from_dir(data_dir: &Path) -> Settings {
    let path = settings_path(data_dir);
    if let Ok(bytes) = fs::read(&path) {
        if let Ok(s) = serde_json::from_slice::<Settings>(&bytes) {
            return s;
        }
    }
    Settings::default()
}

pub fn save_settings_to_dir(data_dir: &Path, s: &Settings) -> Result<()> {
    let path = settings_path(data_dir);
    let json = serde_json::to_vec_pretty(s)?;
    fs::write(path, json).context("write settings")?;
    Ok(())
}
