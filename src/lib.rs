pub mod assist;
pub mod encoder;
pub mod error;
pub mod gallery;
pub mod gemini;
pub mod generate;
pub mod logging;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod slots;
pub mod utils;

#[cfg(feature = "desktop")]
mod commands;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::gemini::GeminiClient;
use crate::session::Session;
use crate::settings::Settings;

pub fn build_session(settings: &Settings) -> Result<Session> {
    let api_key = settings.resolve_api_key()?;
    let models = settings.models();
    info!(
        text_model = %models.text_model,
        image_model = %models.image_model,
        slots = models.character_slots,
        "session ready"
    );
    let client = GeminiClient::new(models.base_url.clone(), api_key);
    Ok(Session::new(Arc::new(client), models))
}

#[cfg(feature = "desktop")]
pub use commands::run;
