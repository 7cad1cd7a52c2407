//! The try-on studio: two image slots, one request at a time.
//!
//! [`Studio`] owns the session state a front-end renders. It moves through
//! `Idle → Processing → {Completed, Failed}` and back to `Idle` on
//! [`Studio::reset`]. It is also the only place that turns errors into
//! user-facing text and logs failure diagnostics.

use crate::error::{FailureKind, LuxeFitError, Result};
use crate::image::{read_image, EncodedImage, IntakeLimits};
use crate::swap::{SwapProvider, SwapRequest, SwapResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Semaphore};

/// One of the two image slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// The person to dress.
    Model,
    /// The clothing to put on them.
    Garment,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Garment => write!(f, "garment"),
        }
    }
}

/// Where the session is in its request lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for images or a submit.
    #[default]
    Idle,
    /// A swap request is in flight.
    Processing,
    /// The last request produced an image.
    Completed,
    /// The last request failed.
    Failed,
}

/// What a call to [`Studio::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A result was stored.
    Completed,
    /// The request failed; the message is stored.
    Failed(FailureKind),
    /// Another request was already in flight. Nothing happened.
    Busy,
    /// A slot is empty. Nothing happened.
    NotReady,
    /// The session was reset while the request was in flight; its outcome was dropped.
    Superseded,
}

/// A failure as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Failure category.
    pub kind: FailureKind,
    /// User-facing message.
    pub message: &'static str,
}

impl From<FailureKind> for Failure {
    fn from(kind: FailureKind) -> Self {
        Self {
            kind,
            message: kind.user_message(),
        }
    }
}

/// Display summary of a loaded slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    /// Source file name, if known.
    pub file_name: Option<String>,
    /// MIME type of the upload.
    pub media_type: String,
    /// Decoded size in bytes.
    pub size_bytes: usize,
}

impl From<&EncodedImage> for SlotView {
    fn from(image: &EncodedImage) -> Self {
        Self {
            file_name: image.file_name().map(str::to_string),
            media_type: image.media_type.clone(),
            size_bytes: image.decoded_len(),
        }
    }
}

/// Snapshot of everything a front-end needs to render the studio.
#[derive(Debug, Clone, Serialize)]
pub struct StudioView {
    /// Request lifecycle state.
    pub status: RequestStatus,
    /// Model slot, if loaded.
    pub model: Option<SlotView>,
    /// Garment slot, if loaded.
    pub garment: Option<SlotView>,
    /// Whether the submit action should be enabled.
    pub can_submit: bool,
    /// Why the last request failed. Set only while `status` is `Failed`.
    pub error: Option<Failure>,
    /// Why the last upload was rejected. Independent of `status`.
    pub upload_error: Option<Failure>,
    /// Generated image, if any.
    pub result: Option<SwapResult>,
}

#[derive(Debug, Default)]
struct SessionState {
    model: Option<EncodedImage>,
    garment: Option<EncodedImage>,
    status: RequestStatus,
    result: Option<SwapResult>,
    failure: Option<Failure>,
    upload_error: Option<Failure>,
}

impl SessionState {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<EncodedImage> {
        match slot {
            Slot::Model => &mut self.model,
            Slot::Garment => &mut self.garment,
        }
    }

    fn ready_request(&self) -> Option<SwapRequest> {
        let model = self.model.clone()?;
        let garment = self.garment.clone()?;
        SwapRequest::new(model, garment).ok()
    }
}

/// A single user's try-on session.
pub struct Studio {
    provider: Arc<dyn SwapProvider>,
    limits: IntakeLimits,
    state: Mutex<SessionState>,
    in_flight: Semaphore,
    // Bumped on reset; an in-flight submit watches it to cancel itself.
    epoch: watch::Sender<u64>,
}

impl Studio {
    /// Creates an idle studio that sends requests through `provider`.
    pub fn new(provider: Arc<dyn SwapProvider>) -> Self {
        Self {
            provider,
            limits: IntakeLimits::default(),
            state: Mutex::new(SessionState::default()),
            in_flight: Semaphore::new(1),
            epoch: watch::channel(0).0,
        }
    }

    /// Sets the upload limits used by [`Studio::load_file`].
    pub fn with_limits(mut self, limits: IntakeLimits) -> Self {
        self.limits = limits;
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts an encoded image into a slot, replacing what was there.
    pub fn load(&self, slot: Slot, image: EncodedImage) {
        let mut state = self.state();
        *state.slot_mut(slot) = Some(image);
        state.upload_error = None;
    }

    /// Reads a file into a slot.
    ///
    /// An unusable file leaves the slot and the request status untouched,
    /// records a visible upload error, and returns the error.
    pub async fn load_file(&self, slot: Slot, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match read_image(path, &self.limits).await {
            Ok(image) => {
                self.load(slot, image);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%slot, path = %path.display(), "rejected upload: {e}");
                self.state().upload_error = Some(Failure::from(e.kind()));
                Err(e)
            }
        }
    }

    /// Empties one slot.
    pub fn clear(&self, slot: Slot) {
        *self.state().slot_mut(slot) = None;
    }

    /// Returns true if both slots hold usable images.
    pub fn can_submit(&self) -> bool {
        let state = self.state();
        state.status != RequestStatus::Processing && state.ready_request().is_some()
    }

    /// Sends both images to the provider and records the outcome.
    ///
    /// At most one request runs at a time: a call made while another is in
    /// flight returns [`SubmitOutcome::Busy`] without contacting the provider.
    /// A [`Studio::reset`] cancels the running call and the pending submit
    /// returns [`SubmitOutcome::Superseded`]. If the returned future is
    /// dropped before it finishes, the session goes back to `Idle`.
    pub async fn submit(&self) -> SubmitOutcome {
        let Ok(_permit) = self.in_flight.try_acquire() else {
            tracing::debug!("submit ignored, a request is already in flight");
            return SubmitOutcome::Busy;
        };

        let (request, mut resets, epoch) = {
            let mut state = self.state();
            let Some(request) = state.ready_request() else {
                return SubmitOutcome::NotReady;
            };
            state.status = RequestStatus::Processing;
            state.failure = None;
            state.result = None;
            let resets = self.epoch.subscribe();
            let epoch = *resets.borrow();
            (request, resets, epoch)
        };
        let mut guard = ProcessingGuard {
            studio: self,
            epoch,
            armed: true,
        };

        tracing::info!(provider = self.provider.name(), "starting outfit swap");
        let outcome = tokio::select! {
            outcome = self.provider.swap(&request) => outcome,
            _ = resets.changed() => {
                tracing::debug!("outfit swap cancelled by reset");
                return SubmitOutcome::Superseded;
            }
        };
        guard.armed = false;

        let mut state = self.state();
        if *self.epoch.borrow() != epoch {
            tracing::debug!("dropping response for a reset session");
            return SubmitOutcome::Superseded;
        }

        match outcome {
            Ok(result) => {
                tracing::info!(
                    duration_ms = result.metadata.duration_ms,
                    "outfit swap completed"
                );
                state.result = Some(result);
                state.failure = None;
                state.status = RequestStatus::Completed;
                SubmitOutcome::Completed
            }
            Err(e) => {
                let kind = e.kind();
                log_failure(&e, kind);
                state.failure = Some(Failure::from(kind));
                state.status = RequestStatus::Failed;
                SubmitOutcome::Failed(kind)
            }
        }
    }

    /// Clears both slots, the result and the errors, and returns to `Idle`.
    ///
    /// A request still in flight is cancelled and frees the submit guard.
    pub fn reset(&self) {
        let mut state = self.state();
        *state = SessionState::default();
        self.epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
        tracing::debug!("studio reset");
    }

    /// Current lifecycle state.
    pub fn status(&self) -> RequestStatus {
        self.state().status
    }

    /// The generated image, if the last request succeeded.
    pub fn result(&self) -> Option<SwapResult> {
        self.state().result.clone()
    }

    /// The user-facing message for a failed request, if any.
    pub fn failure_message(&self) -> Option<&'static str> {
        self.state().failure.as_ref().map(|f| f.message)
    }

    /// Writes the generated image to `path`.
    ///
    /// If `path` is a directory the default file name is used inside it.
    pub fn save_result(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let result = self.result().ok_or_else(|| {
            LuxeFitError::MissingInput("there is no generated image to save".into())
        })?;

        let path = path.as_ref();
        let target = if path.is_dir() {
            path.join(crate::swap::DEFAULT_RESULT_FILENAME)
        } else {
            path.to_path_buf()
        };
        result.save(&target)?;
        tracing::info!(path = %target.display(), "saved generated image");
        Ok(target)
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> StudioView {
        let state = self.state();
        StudioView {
            status: state.status,
            model: state.model.as_ref().map(SlotView::from),
            garment: state.garment.as_ref().map(SlotView::from),
            can_submit: state.status != RequestStatus::Processing
                && state.ready_request().is_some(),
            error: state.failure.clone(),
            upload_error: state.upload_error.clone(),
            result: state.result.clone(),
        }
    }
}

/// Returns a dropped submit's session to `Idle` so it can be submitted again.
struct ProcessingGuard<'a> {
    studio: &'a Studio,
    epoch: u64,
    armed: bool,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.studio.state();
        if *self.studio.epoch.borrow() == self.epoch && state.status == RequestStatus::Processing
        {
            tracing::debug!("submit abandoned before the response arrived");
            state.status = RequestStatus::Idle;
        }
    }
}

fn log_failure(error: &LuxeFitError, kind: FailureKind) {
    match kind {
        FailureKind::EmptyResponse | FailureKind::ServiceUnavailable => {
            tracing::warn!(?kind, "outfit swap failed: {error}")
        }
        _ => tracing::error!(?kind, "outfit swap failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap::providers::result_from_json;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    enum Reply {
        Body(&'static str),
        Error(fn() -> LuxeFitError),
    }

    /// Provider that answers from a canned service body, optionally after
    /// being released by the test.
    struct ScriptedProvider {
        reply: Reply,
        calls: AtomicUsize,
        started: Notify,
        release: Option<Notify>,
    }

    impl ScriptedProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                started: Notify::new(),
                release: None,
            })
        }

        fn gated(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                started: Notify::new(),
                release: Some(Notify::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SwapProvider for ScriptedProvider {
        async fn swap(&self, request: &SwapRequest) -> Result<SwapResult> {
            request.validate()?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            if let Some(release) = &self.release {
                release.notified().await;
            }
            match &self.reply {
                Reply::Body(body) => result_from_json(body),
                Reply::Error(make) => Err(make()),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    const ONE_IMAGE: &str =
        r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/webp", "data": "ABC123"}}]}}]}"#;
    const ZERO_PARTS: &str = r#"{"candidates": [{"content": {"parts": []}}]}"#;

    fn image(payload: &str) -> EncodedImage {
        EncodedImage::from_data_uri(format!("data:image/png;base64,{payload}")).unwrap()
    }

    fn loaded_studio(provider: Arc<ScriptedProvider>) -> Studio {
        let studio = Studio::new(provider);
        studio.load(Slot::Model, image("TU9ERUw="));
        studio.load(Slot::Garment, image("R0FSTUVOVA=="));
        studio
    }

    #[tokio::test]
    async fn test_successful_swap_stores_png_data_uri() {
        let provider = ScriptedProvider::new(Reply::Body(ONE_IMAGE));
        let studio = loaded_studio(provider.clone());

        assert!(studio.can_submit());
        assert_eq!(studio.submit().await, SubmitOutcome::Completed);
        assert_eq!(studio.status(), RequestStatus::Completed);
        assert_eq!(provider.calls(), 1);

        let result = studio.result().unwrap();
        assert_eq!(result.data_uri(), "data:image/png;base64,ABC123");
        assert_eq!(result.reported_media_type.as_deref(), Some("image/webp"));
        assert!(studio.failure_message().is_none());
    }

    #[tokio::test]
    async fn test_empty_slot_never_reaches_provider() {
        let provider = ScriptedProvider::new(Reply::Body(ONE_IMAGE));
        let studio = Studio::new(provider.clone());
        studio.load(Slot::Model, image("TU9ERUw="));

        assert!(!studio.can_submit());
        assert_eq!(studio.submit().await, SubmitOutcome::NotReady);
        assert_eq!(studio.status(), RequestStatus::Idle);
        assert_eq!(provider.calls(), 0);

        studio.load(
            Slot::Garment,
            EncodedImage {
                source: None,
                preview_uri: String::new(),
                payload: String::new(),
                media_type: "image/png".into(),
            },
        );
        assert!(!studio.can_submit());
        assert_eq!(studio.submit().await, SubmitOutcome::NotReady);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_parts_fails_with_safety_message() {
        let provider = ScriptedProvider::new(Reply::Body(ZERO_PARTS));
        let studio = loaded_studio(provider);

        assert_eq!(
            studio.submit().await,
            SubmitOutcome::Failed(FailureKind::EmptyResponse)
        );
        assert_eq!(studio.status(), RequestStatus::Failed);
        assert!(studio.result().is_none());
        assert_eq!(
            studio.failure_message(),
            Some(FailureKind::EmptyResponse.user_message())
        );
    }

    #[tokio::test]
    async fn test_412_rejection_shows_region_message() {
        let provider = ScriptedProvider::new(Reply::Error(|| LuxeFitError::Api {
            status: 400,
            message: "safety blocked; upstream status 412; quota exceeded".into(),
        }));
        let studio = loaded_studio(provider);

        studio.submit().await;
        assert_eq!(
            studio.failure_message(),
            Some("Image generation is currently unavailable in your region.")
        );
    }

    #[tokio::test]
    async fn test_second_submit_while_processing_is_ignored() {
        let provider = ScriptedProvider::gated(Reply::Body(ONE_IMAGE));
        let studio = Arc::new(loaded_studio(provider.clone()));

        let first = tokio::spawn({
            let studio = studio.clone();
            async move { studio.submit().await }
        });
        provider.started.notified().await;

        assert_eq!(studio.status(), RequestStatus::Processing);
        assert!(!studio.can_submit());
        assert_eq!(studio.submit().await, SubmitOutcome::Busy);
        assert_eq!(provider.calls(), 1);

        provider.release.as_ref().unwrap().notify_one();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Completed);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        for reply in [Reply::Body(ONE_IMAGE), Reply::Body(ZERO_PARTS)] {
            let studio = loaded_studio(ScriptedProvider::new(reply));
            studio.submit().await;
            assert_ne!(studio.status(), RequestStatus::Idle);

            studio.reset();
            let view = studio.view();
            assert_eq!(view.status, RequestStatus::Idle);
            assert!(view.model.is_none());
            assert!(view.garment.is_none());
            assert!(view.result.is_none());
            assert!(view.error.is_none());
            assert!(!view.can_submit);
        }
    }

    #[tokio::test]
    async fn test_reset_during_request_discards_response() {
        let provider = ScriptedProvider::gated(Reply::Body(ONE_IMAGE));
        let studio = Arc::new(loaded_studio(provider.clone()));

        let first = tokio::spawn({
            let studio = studio.clone();
            async move { studio.submit().await }
        });
        provider.started.notified().await;

        studio.reset();
        provider.release.as_ref().unwrap().notify_one();

        assert_eq!(first.await.unwrap(), SubmitOutcome::Superseded);
        assert_eq!(studio.status(), RequestStatus::Idle);
        assert!(studio.result().is_none());
    }

    #[tokio::test]
    async fn test_reset_cancels_request_and_allows_new_submit() {
        let provider = ScriptedProvider::gated(Reply::Body(ONE_IMAGE));
        let studio = Arc::new(loaded_studio(provider.clone()));

        let first = tokio::spawn({
            let studio = studio.clone();
            async move { studio.submit().await }
        });
        provider.started.notified().await;

        // The gated call is never released; reset alone ends it.
        studio.reset();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Superseded);

        studio.load(Slot::Model, image("TU9ERUw="));
        studio.load(Slot::Garment, image("R0FSTUVOVA=="));
        assert!(studio.view().can_submit);

        provider.release.as_ref().unwrap().notify_one();
        assert_eq!(studio.submit().await, SubmitOutcome::Completed);
        assert_eq!(provider.calls(), 2);
        assert_eq!(studio.status(), RequestStatus::Completed);
    }

    #[tokio::test]
    async fn test_dropped_submit_returns_to_idle() {
        let provider = ScriptedProvider::gated(Reply::Body(ONE_IMAGE));
        let studio = loaded_studio(provider.clone());

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), studio.submit()).await;
        assert!(timed_out.is_err());
        assert_eq!(studio.status(), RequestStatus::Idle);
        assert!(studio.can_submit());
        assert!(studio.failure_message().is_none());

        provider.release.as_ref().unwrap().notify_one();
        assert_eq!(studio.submit().await, SubmitOutcome::Completed);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_resubmit_after_failure() {
        let provider = ScriptedProvider::new(Reply::Error(|| {
            LuxeFitError::Timeout(std::time::Duration::from_secs(60))
        }));
        let studio = loaded_studio(provider.clone());

        assert_eq!(
            studio.submit().await,
            SubmitOutcome::Failed(FailureKind::Timeout)
        );
        assert!(studio.can_submit());
        studio.submit().await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_visible() {
        let studio = Studio::new(ScriptedProvider::new(Reply::Body(ONE_IMAGE)));
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"not an image at all").unwrap();

        let err = studio.load_file(Slot::Model, file.path()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedFile);

        let view = studio.view();
        assert!(view.model.is_none());
        assert_eq!(view.status, RequestStatus::Idle);
        assert!(view.error.is_none());
        assert_eq!(view.upload_error.unwrap().kind, FailureKind::UnsupportedFile);
        assert!(studio.failure_message().is_none());

        studio.load(Slot::Model, image("TU9ERUw="));
        assert!(studio.view().upload_error.is_none());
    }

    #[tokio::test]
    async fn test_save_result() {
        let studio = loaded_studio(ScriptedProvider::new(Reply::Body(
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {"data": "iVBORw0KGgo="}}]}}]}"#,
        )));
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            studio.save_result(dir.path()),
            Err(LuxeFitError::MissingInput(_))
        ));

        studio.submit().await;
        let saved = studio.save_result(dir.path()).unwrap();
        assert_eq!(saved, dir.path().join("luxefit-generated.png"));
        assert_eq!(std::fs::read(saved).unwrap().len(), 8);
    }

    #[test]
    fn test_view_serializes_for_front_ends() {
        let studio = loaded_studio(ScriptedProvider::new(Reply::Body(ONE_IMAGE)));
        let json = serde_json::to_value(studio.view()).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["can_submit"], true);
        assert_eq!(json["model"]["media_type"], "image/png");
        assert!(json["error"].is_null());
        assert!(json["upload_error"].is_null());
    }
}
