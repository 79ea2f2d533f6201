//! Scripted collaborator stubs for tests
//!
//! Mirrors the shape of the real collaborators with queued responses and
//! call counters, so tests can assert not just on outcomes but on whether
//! the model was consulted at all.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::notifications::PaymentNotification;
use crate::traits::*;
use crate::types::*;

#[derive(Default)]
struct ScriptedInner {
    classify_responses: Mutex<VecDeque<IngestResult<ClassificationVerdict>>>,
    extract_responses: Mutex<VecDeque<IngestResult<ExtractionOutcome>>>,
    classify_calls: AtomicUsize,
    extract_calls: AtomicUsize,
}

/// Extraction service with scripted responses. Calls beyond the script fail
/// as `Processing`, which keeps "the model was called unexpectedly" loud in
/// tests. Cloning shares the script and counters.
#[derive(Clone, Default)]
pub struct ScriptedExtractionService {
    inner: Arc<ScriptedInner>,
}

impl ScriptedExtractionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a classification verdict (builder form)
    pub fn with_classification(self, verdict: ClassificationVerdict) -> Self {
        self.push_classification(Ok(verdict));
        self
    }

    /// Queue a classification failure (builder form)
    pub fn with_classification_error(self, error: IngestError) -> Self {
        self.push_classification(Err(error));
        self
    }

    /// Queue an extraction outcome (builder form)
    pub fn with_extraction(self, outcome: ExtractionOutcome) -> Self {
        self.push_extraction(Ok(outcome));
        self
    }

    /// Queue an extraction failure (builder form)
    pub fn with_extraction_error(self, error: IngestError) -> Self {
        self.push_extraction(Err(error));
        self
    }

    /// Queue a classification response on the shared script
    pub fn push_classification(&self, response: IngestResult<ClassificationVerdict>) {
        self.inner
            .classify_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    /// Queue an extraction response on the shared script
    pub fn push_extraction(&self, response: IngestResult<ExtractionOutcome>) {
        self.inner
            .extract_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn classify_calls(&self) -> usize {
        self.inner.classify_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.inner.extract_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionService for ScriptedExtractionService {
    async fn classify(&self, _prompt: &str) -> IngestResult<ClassificationVerdict> {
        self.inner.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .classify_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(IngestError::Processing(
                    "unexpected classify call".to_string(),
                ))
            })
    }

    async fn extract(&self, _prompt: &str) -> IngestResult<ExtractionOutcome> {
        self.inner.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .extract_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(IngestError::Processing(
                    "unexpected extract call".to_string(),
                ))
            })
    }
}

/// PDF text extractor returning a fixed string regardless of input bytes
#[derive(Debug, Clone, Default)]
pub struct StaticPdfText {
    text: String,
}

impl StaticPdfText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl PdfTextExtractor for StaticPdfText {
    fn extract_text(&self, _bytes: &[u8]) -> IngestResult<String> {
        Ok(self.text.clone())
    }
}

#[derive(Default)]
struct RecordingNotifierInner {
    sent: Mutex<Vec<PaymentNotification>>,
    fail_sends: AtomicBool,
}

/// Notification sender that records everything it is asked to dispatch
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<RecordingNotifierInner>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send, for notification-tolerance scenarios
    pub fn fail_sends(&self) {
        self.inner.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<PaymentNotification> {
        self.inner.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &PaymentNotification) -> IngestResult<()> {
        if self.inner.fail_sends.load(Ordering::SeqCst) {
            return Err(IngestError::Processing(
                "notification channel unavailable".to_string(),
            ));
        }
        self.inner.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
