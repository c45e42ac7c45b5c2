use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::assist::{enhance_prompt, suggest_prompt};
use crate::encoder::RawFile;
use crate::error::{GenerateError, ValidationError};
use crate::gallery::{GeneratedImage, ImageSummary};
use crate::generate::generate_images;
use crate::gemini::GenerativeService;
use crate::prompt::append_fragment;
use crate::settings::ModelSettings;
use crate::slots::{EncodeTicket, SlotKey, SlotStore, SlotView};

#[derive(Debug, Default)]
struct Results {
    images: Vec<GeneratedImage>,
    is_loading: bool,
    error: Option<String>,
}

// Image payloads stay out of the snapshot; fetch them one at a time by id.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub images: Vec<ImageSummary>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl From<&Results> for ResultsView {
    fn from(r: &Results) -> Self {
        Self {
            images: r.images.iter().map(ImageSummary::from).collect(),
            is_loading: r.is_loading,
            error: r.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub characters: Vec<SlotView>,
    pub context: SlotView,
    pub prompt: String,
    pub results: ResultsView,
}

#[derive(Clone)]
pub struct Session {
    slots: SlotStore,
    prompt: Arc<Mutex<String>>,
    results: Arc<Mutex<Results>>,
    service: Arc<dyn GenerativeService>,
    models: ModelSettings,
}

// A poisoned lock only means a panic mid-update of plain data; keep going.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Session {
    pub fn new(service: Arc<dyn GenerativeService>, models: ModelSettings) -> Self {
        Self {
            slots: SlotStore::new(models.character_slots),
            prompt: Arc::new(Mutex::new(String::new())),
            results: Arc::new(Mutex::new(Results::default())),
            service,
            models,
        }
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn set_character_file(
        &self,
        index: usize,
        file: Option<RawFile>,
    ) -> Result<EncodeTicket, ValidationError> {
        self.slots.set_file(SlotKey::Character(index), file)
    }

    pub fn set_context_file(&self, file: Option<RawFile>) -> Result<EncodeTicket, ValidationError> {
        self.slots.set_file(SlotKey::Context, file)
    }

    pub fn toggle_character(&self, index: usize) -> Result<bool, ValidationError> {
        self.slots.toggle_selected(index)
    }

    pub fn set_use_context(&self, use_context: bool) {
        self.slots.set_use_context(use_context);
    }

    pub fn prompt(&self) -> String {
        lock(&self.prompt).clone()
    }

    pub fn set_prompt(&self, text: impl Into<String>) {
        *lock(&self.prompt) = text.into();
    }

    pub fn append_prompt(&self, fragment: &str) -> String {
        let mut p = lock(&self.prompt);
        *p = append_fragment(&p, fragment);
        p.clone()
    }

    pub async fn suggest_prompt(&self) -> String {
        let characters = self.slots.selected_ready();
        let suggested = suggest_prompt(self.service.as_ref(), &characters, &self.models)
            .await
            .into_text();
        if !suggested.is_empty() {
            self.set_prompt(suggested);
        }
        self.prompt()
    }

    pub async fn enhance_prompt(&self) -> String {
        let current = self.prompt();
        if current.is_empty() {
            return current;
        }
        let characters = self.slots.selected_ready();
        let enhanced = enhance_prompt(self.service.as_ref(), &current, &characters, &self.models)
            .await
            .into_text();
        self.set_prompt(enhanced);
        self.prompt()
    }

    pub async fn generate(&self) -> Result<Vec<GeneratedImage>, GenerateError> {
        let characters = self.slots.selected_ready();
        let context = self.slots.context();
        let prompt = self.prompt();

        if let Err(e) = crate::generate::validate(&characters, &context, &prompt) {
            warn!(error = %e, "generation rejected");
            lock(&self.results).error = Some(e.to_string());
            return Err(e.into());
        }

        {
            let mut view = lock(&self.results);
            view.is_loading = true;
            view.error = None;
            view.images.clear();
        }

        let outcome =
            generate_images(self.service.as_ref(), &characters, &context, &prompt, &self.models)
                .await;

        let mut view = lock(&self.results);
        view.is_loading = false;
        match &outcome {
            Ok(images) => {
                info!(count = images.len(), "results updated");
                view.images = images.clone();
            }
            Err(e) => {
                view.images.clear();
                view.error = Some(e.to_string());
            }
        }
        outcome
    }

    pub fn image(&self, id: &str) -> Option<GeneratedImage> {
        lock(&self.results)
            .images
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (characters, context) = self.slots.views();
        SessionSnapshot {
            characters,
            context,
            prompt: self.prompt(),
            results: ResultsView::from(&*lock(&self.results)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureCause, ServiceError, GENERATION_FAILED};
    use crate::gemini::{ContentResponse, InlineData, MockGenerativeService};

    fn session(svc: MockGenerativeService) -> Session {
        Session::new(Arc::new(svc), ModelSettings::default())
    }

    async fn with_character(s: &Session) {
        s.set_character_file(0, Some(RawFile::from_bytes("hero.png", b"hero".to_vec())))
            .unwrap();
        s.slots().settle().await;
    }

    #[tokio::test]
    async fn validation_error_lands_in_view_without_calls() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().never();
        let s = session(svc);
        s.set_prompt("a knight");

        let err = s.generate().await.unwrap_err();
        assert!(err.is_validation());
        let snap = s.snapshot();
        assert_eq!(
            snap.results.error.as_deref(),
            Some("Please upload and select at least one character image.")
        );
        assert!(!snap.results.is_loading);
    }

    #[tokio::test]
    async fn unselected_character_does_not_count() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().never();
        let s = session(svc);
        with_character(&s).await;
        s.toggle_character(0).unwrap();
        s.set_prompt("p");

        assert!(s.generate().await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn context_flag_without_image_is_rejected() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().never();
        let s = session(svc);
        with_character(&s).await;
        s.set_prompt("p");
        s.set_use_context(true);

        let err = s.generate().await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Invalid(ValidationError::ContextNotLoaded)
        ));
    }

    #[tokio::test]
    async fn successful_run_fills_results() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().times(2).returning(|_| {
            Ok(ContentResponse::from_images(vec![InlineData {
                mime_type: "image/png".into(),
                data: "iVBO".into(),
            }]))
        });
        let s = session(svc);
        with_character(&s).await;
        s.set_prompt("a knight");

        let images = s.generate().await.unwrap();
        let snap = s.snapshot();
        let ids: Vec<_> = snap.results.images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, [images[0].id.as_str(), images[1].id.as_str()]);
        assert!(snap.results.error.is_none());
        assert_eq!(s.image(&images[1].id), Some(images[1].clone()));
        assert!(s.image("gen_missing").is_none());
    }

    #[tokio::test]
    async fn snapshot_omits_image_payloads() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().times(2).returning(|_| {
            Ok(ContentResponse::from_images(vec![InlineData {
                mime_type: "image/png".into(),
                data: "cGl4ZWxzLXBpeGVscy1waXhlbHM=".into(),
            }]))
        });
        let s = session(svc);
        with_character(&s).await;
        s.set_prompt("a knight");
        s.generate().await.unwrap();

        let json = serde_json::to_string(&s.snapshot()).unwrap();
        assert!(!json.contains("cGl4ZWxz"));
        assert!(!json.contains("encoded_data"));
        assert!(json.contains("gen_"));
    }

    #[tokio::test]
    async fn failed_run_clears_results_and_shows_generic_error() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().returning(|_| {
            Err(ServiceError::Http {
                status: 403,
                message: "API key invalid".into(),
            })
        });
        let s = session(svc);
        with_character(&s).await;
        s.set_prompt("p");

        let err = s.generate().await.unwrap_err();
        assert!(matches!(err, GenerateError::Failed(FailureCause::Service)));
        let snap = s.snapshot();
        assert!(snap.results.images.is_empty());
        assert_eq!(snap.results.error.as_deref(), Some(GENERATION_FAILED));
    }

    #[tokio::test]
    async fn empty_suggestion_keeps_prompt() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().returning(|_| {
            Err(ServiceError::Decode("bad".into()))
        });
        let s = session(svc);
        with_character(&s).await;
        s.set_prompt("keep me");

        assert_eq!(s.suggest_prompt().await, "keep me");
    }

    #[tokio::test]
    async fn suggestion_replaces_prompt() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content()
            .times(1)
            .returning(|_| Ok(ContentResponse::from_text("a hero surfing")));
        let s = session(svc);
        with_character(&s).await;
        s.set_prompt("old");

        assert_eq!(s.suggest_prompt().await, "a hero surfing");
    }

    #[tokio::test]
    async fn enhance_skips_empty_prompt() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content().never();
        let s = session(svc);

        assert_eq!(s.enhance_prompt().await, "");
    }

    #[tokio::test]
    async fn enhance_failure_keeps_prompt() {
        let mut svc = MockGenerativeService::new();
        svc.expect_generate_content()
            .returning(|_| Err(ServiceError::Decode("bad".into())));
        let s = session(svc);
        s.set_prompt("x");

        assert_eq!(s.enhance_prompt().await, "x");
    }

    #[test]
    fn chips_append_to_prompt() {
        let s = session(MockGenerativeService::new());
        assert_eq!(s.append_prompt("surfing"), "surfing");
        assert_eq!(s.append_prompt("anime style"), "surfing, anime style");
    }
}
