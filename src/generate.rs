use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{FailureCause, GenerateError, ValidationError};
use crate::gallery::GeneratedImage;
use crate::gemini::{ContentRequest, GenerativeService, Modality, Part};
use crate::prompt::compose_prompt;
use crate::settings::ModelSettings;
use crate::slots::{CharacterSlot, ContextSlot};

pub const GENERATION_CALLS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Validating,
    Requesting { call: usize },
    Collecting,
    Success,
    Failed,
}

pub fn validate(
    characters: &[CharacterSlot],
    context: &ContextSlot,
    user_prompt: &str,
) -> Result<(), ValidationError> {
    if !characters.iter().any(|c| c.encoded.is_some()) {
        return Err(ValidationError::NoCharacterSelected);
    }
    if user_prompt.is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }
    if context.use_context && context.encoded.is_none() {
        return Err(ValidationError::ContextNotLoaded);
    }
    Ok(())
}

pub fn build_parts(
    characters: &[CharacterSlot],
    context: &ContextSlot,
    user_prompt: &str,
) -> Vec<Part> {
    let mut parts: Vec<Part> = characters
        .iter()
        .filter_map(|c| c.encoded.as_ref())
        .map(Part::image)
        .collect();

    if context.use_context {
        if let Some(bg) = &context.encoded {
            parts.push(Part::image(bg));
        }
    }

    parts.push(Part::text(compose_prompt(user_prompt, context.use_context)));
    parts
}

// Any call error fails the whole run, discarding images already collected.
#[instrument(skip_all, fields(characters = characters.len(), use_context = context.use_context))]
pub async fn generate_images(
    service: &dyn GenerativeService,
    characters: &[CharacterSlot],
    context: &ContextSlot,
    user_prompt: &str,
    models: &ModelSettings,
) -> Result<Vec<GeneratedImage>, GenerateError> {
    debug!(stage = ?RunStage::Validating);
    validate(characters, context, user_prompt)?;

    let parts = build_parts(characters, context, user_prompt);
    let run_millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut images = Vec::new();

    for call in 0..GENERATION_CALLS {
        debug!(stage = ?RunStage::Requesting { call });
        let request = ContentRequest::new(&models.image_model, parts.clone())
            .with_modalities(&[Modality::Image, Modality::Text]);

        let resp = match service.generate_content(request).await {
            Ok(r) => r,
            Err(e) => {
                error!(call, error = %e, stage = ?RunStage::Failed, "image generation call failed");
                return Err(GenerateError::Failed(FailureCause::Service));
            }
        };

        debug!(stage = ?RunStage::Collecting, call, count = resp.images.len());
        for inline in resp.images {
            let id = format!("gen_{}_{}_{}", run_millis, call, images.len());
            images.push(GeneratedImage::new(id, inline));
        }
    }

    if images.is_empty() {
        warn!(stage = ?RunStage::Failed, "model returned no images");
        return Err(GenerateError::Failed(FailureCause::NoImages));
    }

    info!(stage = ?RunStage::Success, count = images.len(), "images generated");
    Ok(images)
}
