use async_trait::async_trait;
use parking_lot::Mutex;
use solace_core::{CompletionBackend, CompletionError, CompletionTurn};

/// Backend that always answers with fixed text and records every call.
pub struct FixedCompletion {
    reply: String,
    image_label: String,
    chat_calls: Mutex<Vec<(String, Vec<CompletionTurn>)>>,
    image_calls: Mutex<Vec<String>>,
}

impl FixedCompletion {
    /// Create a backend answering `reply` for chat and "neutral" for
    /// image classification.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            image_label: "neutral".to_string(),
            chat_calls: Mutex::new(Vec::new()),
            image_calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the image classification answer.
    pub fn with_image_label(mut self, label: impl Into<String>) -> Self {
        self.image_label = label.into();
        self
    }

    /// Every chat call observed so far: (system, turns).
    pub fn chat_calls(&self) -> Vec<(String, Vec<CompletionTurn>)> {
        self.chat_calls.lock().clone()
    }

    /// Every image payload observed so far.
    pub fn image_calls(&self) -> Vec<String> {
        self.image_calls.lock().clone()
    }
}

#[async_trait]
impl CompletionBackend for FixedCompletion {
    async fn chat(
        &self,
        system: &str,
        turns: &[CompletionTurn],
    ) -> Result<String, CompletionError> {
        self.chat_calls
            .lock()
            .push((system.to_string(), turns.to_vec()));
        Ok(self.reply.clone())
    }

    async fn classify_image(
        &self,
        image_base64: &str,
        _prompt: &str,
    ) -> Result<String, CompletionError> {
        self.image_calls.lock().push(image_base64.to_string());
        Ok(self.image_label.clone())
    }
}

/// Backend where every call fails, for fallback-path tests.
pub struct FailingCompletion;

#[async_trait]
impl CompletionBackend for FailingCompletion {
    async fn chat(
        &self,
        _system: &str,
        _turns: &[CompletionTurn],
    ) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable)
    }

    async fn classify_image(
        &self,
        _image_base64: &str,
        _prompt: &str,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable)
    }
}
