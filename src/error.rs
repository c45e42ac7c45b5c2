pub const GENERATION_FAILED: &str =
    "Could not generate images. Please check your inputs and your API key.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please upload and select at least one character image.")]
    NoCharacterSelected,

    #[error("Please enter a prompt.")]
    EmptyPrompt,

    #[error("Please upload a context image or turn off \"Use this context\".")]
    ContextNotLoaded,

    #[error("character slot {0} does not exist")]
    SlotOutOfRange(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    NoImages,
    Service,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("{}", GENERATION_FAILED)]
    Failed(FailureCause),
}

impl GenerateError {
    pub fn is_validation(&self) -> bool {
        matches!(self, GenerateError::Invalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_causes_share_one_message() {
        let a = GenerateError::Failed(FailureCause::NoImages).to_string();
        let b = GenerateError::Failed(FailureCause::Service).to_string();
        assert_eq!(a, b);
        assert_eq!(a, GENERATION_FAILED);
    }

    #[test]
    fn validation_message_passes_through() {
        let e: GenerateError = ValidationError::EmptyPrompt.into();
        assert!(e.is_validation());
        assert_eq!(e.to_string(), "Please enter a prompt.");
    }
}
