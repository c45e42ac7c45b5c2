use tracing::{info, instrument, warn};

use crate::gemini::{ContentRequest, GenerativeService, Part};
use crate::settings::ModelSettings;
use crate::slots::CharacterSlot;

pub const SUGGEST_INSTRUCTION: &str = "You are a creative prompt-writing assistant. Analyse the character image(s) provided. Based on the character's appearance, attire and mood, write a prompt that describes a new scenario or action for the character in detail. The prompt should include the action, the setting and optionally an art style. Reply with the prompt only.";

pub const ENHANCE_INSTRUCTION: &str = "You are a creative assistant for an AI image tool. Your job is to take the user's base prompt and enrich it with vivid detail. Study the reference image(s) to understand the character's appearance and style, then combine those details with the user's prompt into a new, more detailed prompt. Describe action, emotion and setting that suit the character in the image. Keep the core idea of the base prompt. Reply with the enhanced prompt only.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutcome {
    Produced(String),
    NoInput,
    Degraded { fallback: String },
}

impl AssistOutcome {
    pub fn into_text(self) -> String {
        match self {
            AssistOutcome::Produced(s) => s,
            AssistOutcome::NoInput => String::new(),
            AssistOutcome::Degraded { fallback } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AssistOutcome::Degraded { .. })
    }
}

fn image_parts(characters: &[CharacterSlot]) -> Vec<Part> {
    characters
        .iter()
        .filter(|c| c.file.is_some())
        .filter_map(|c| c.encoded.as_ref())
        .map(Part::image)
        .collect()
}

#[instrument(skip_all, fields(characters = characters.len()))]
pub async fn suggest_prompt(
    service: &dyn GenerativeService,
    characters: &[CharacterSlot],
    models: &ModelSettings,
) -> AssistOutcome {
    let parts = image_parts(characters);
    if parts.is_empty() {
        return AssistOutcome::NoInput;
    }

    let request = ContentRequest::new(&models.text_model, parts)
        .with_system_instruction(SUGGEST_INSTRUCTION)
        .with_temperature(models.suggest_temperature);

    match service.generate_content(request).await {
        Ok(resp) => match resp.text {
            Some(t) => {
                info!("prompt suggested");
                AssistOutcome::Produced(t.trim().to_string())
            }
            None => {
                warn!("suggestion response carried no text");
                AssistOutcome::Degraded {
                    fallback: String::new(),
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "prompt suggestion failed");
            AssistOutcome::Degraded {
                fallback: String::new(),
            }
        }
    }
}

#[instrument(skip_all, fields(characters = characters.len()))]
pub async fn enhance_prompt(
    service: &dyn GenerativeService,
    base_prompt: &str,
    characters: &[CharacterSlot],
    models: &ModelSettings,
) -> AssistOutcome {
    if base_prompt.trim().is_empty() {
        return AssistOutcome::NoInput;
    }

    let mut parts = image_parts(characters);
    parts.push(Part::text(base_prompt));

    let request = ContentRequest::new(&models.text_model, parts)
        .with_system_instruction(ENHANCE_INSTRUCTION)
        .with_temperature(models.enhance_temperature)
        .with_top_p(models.enhance_top_p);

    match service.generate_content(request).await {
        Ok(resp) => match resp.text {
            Some(t) => {
                info!("prompt enhanced");
                AssistOutcome::Produced(t.trim().to_string())
            }
            None => {
                warn!("enhancement response carried no text");
                AssistOutcome::Degraded {
                    fallback: base_prompt.to_string(),
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "prompt enhancement failed");
            AssistOutcome::Degraded {
                fallback: base_prompt.to_string(),
            }
        }
    }
}
