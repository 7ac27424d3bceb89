//! Shared conversation state read by the UI and written by the pipeline.
//!
//! One [`SharedSession`] is injected into every component that touches the
//! chat log or the displayed message. Each setter publishes a matching
//! [`RuntimeEvent`] when a runtime channel is attached.

use crate::pipeline::messages::Message;
use crate::runtime::RuntimeEvent;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Snapshot of the conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Committed chat log.
    pub chat_log: Vec<Message>,
    /// Whether a chat turn is in progress.
    pub chat_processing: bool,
    /// Currently displayed assistant message.
    pub assistant_message: String,
    /// Sentences currently being voiced, oldest first.
    pub slide_messages: Vec<String>,
    /// Popup content for the last reply, when open.
    pub popup: Option<String>,
}

/// Thread-safe handle to [`SessionState`].
#[derive(Debug, Default)]
pub struct SharedSession {
    state: Mutex<SessionState>,
    runtime_tx: Option<broadcast::Sender<RuntimeEvent>>,
}

impl SharedSession {
    /// Session without event publishing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish every change on `runtime_tx`.
    pub fn with_runtime_events(mut self, runtime_tx: broadcast::Sender<RuntimeEvent>) -> Self {
        self.runtime_tx = Some(runtime_tx);
        self
    }

    /// Clone of the full state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    /// Clone of the chat log.
    pub fn chat_log(&self) -> Vec<Message> {
        self.lock().chat_log.clone()
    }

    /// Replace the chat log.
    pub fn set_chat_log(&self, chat_log: Vec<Message>) {
        let len = chat_log.len();
        self.lock().chat_log = chat_log;
        self.emit(RuntimeEvent::ChatLogUpdated { len });
    }

    /// Append entries to the chat log.
    pub fn extend_chat_log(&self, entries: impl IntoIterator<Item = Message>) {
        let len = {
            let mut state = self.lock();
            state.chat_log.extend(entries);
            state.chat_log.len()
        };
        self.emit(RuntimeEvent::ChatLogUpdated { len });
    }

    /// Whether a chat turn is in progress.
    pub fn is_chat_processing(&self) -> bool {
        self.lock().chat_processing
    }

    /// Set the chat-processing flag.
    pub fn set_chat_processing(&self, active: bool) {
        self.lock().chat_processing = active;
        self.emit(RuntimeEvent::ChatProcessing { active });
    }

    /// Currently displayed assistant message.
    pub fn assistant_message(&self) -> String {
        self.lock().assistant_message.clone()
    }

    /// Replace the displayed assistant message.
    pub fn set_assistant_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.lock().assistant_message = message.clone();
        self.emit(RuntimeEvent::AssistantMessage(message));
    }

    /// Sentences currently being voiced.
    pub fn slide_messages(&self) -> Vec<String> {
        self.lock().slide_messages.clone()
    }

    /// Replace the slide messages.
    pub fn set_slide_messages(&self, messages: Vec<String>) {
        self.lock().slide_messages = messages.clone();
        self.emit(RuntimeEvent::SlideMessages(messages));
    }

    /// Popup content, if open.
    pub fn popup(&self) -> Option<String> {
        self.lock().popup.clone()
    }

    /// Open the popup with `content`.
    pub fn open_popup(&self, content: String) {
        self.lock().popup = Some(content.clone());
        self.emit(RuntimeEvent::Popup { content });
    }

    /// Close the popup.
    pub fn close_popup(&self) {
        self.lock().popup = None;
    }

    /// Publish an event that has no state of its own here.
    pub fn emit(&self, event: RuntimeEvent) {
        if let Some(tx) = &self.runtime_tx {
            let _ = tx.send(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
