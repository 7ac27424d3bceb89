//! Chat-turn coordination: from a user message to a committed reply.

use crate::agent::{AgentClassifier, select_agent};
use crate::config::{ChatConfig, SpeechConfig};
use crate::error::Result;
use crate::pipeline::messages::{Message, MessageContent, Role};
use crate::pipeline::playback::PlaybackOrderer;
use crate::pipeline::session::SharedSession;
use crate::pipeline::stream::{ChunkReader, StaticChunks, StreamProcessor};
use crate::runtime::RuntimeEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Chat model able to stream a reply.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Start streaming a reply to `messages`.
    async fn open_stream(&self, messages: &[Message]) -> Result<Box<dyn ChunkReader>>;
}

/// Runs chat turns against a shared session.
pub struct ConversationCoordinator {
    config: ChatConfig,
    session: Arc<SharedSession>,
    model: Arc<dyn ModelClient>,
    classifier: Option<Arc<dyn AgentClassifier>>,
    processor: StreamProcessor,
}

impl ConversationCoordinator {
    /// Coordinator sharing `session` with the stream processor it builds
    /// around `orderer`.
    pub fn new(
        config: &SpeechConfig,
        session: Arc<SharedSession>,
        model: Arc<dyn ModelClient>,
        orderer: PlaybackOrderer,
    ) -> Self {
        let processor = StreamProcessor::new(&config.stream, orderer, Arc::clone(&session));
        Self {
            config: config.chat.clone(),
            session,
            model,
            classifier: None,
            processor,
        }
    }

    /// Route turns through `classifier` before answering.
    pub fn with_classifier(mut self, classifier: Arc<dyn AgentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Session this coordinator reads and commits to.
    pub fn session(&self) -> &Arc<SharedSession> {
        &self.session
    }

    /// Stream processor used for every reply.
    pub fn processor(&self) -> &StreamProcessor {
        &self.processor
    }

    /// Build the model request: system prompt followed by the most recent
    /// history entries.
    ///
    /// Roles the model does not understand become `assistant`. Image parts
    /// are dropped unless vision is enabled.
    pub fn build_request(&self, chat_log: &[Message]) -> Vec<Message> {
        let keep = self.config.max_history_messages;
        let start = chat_log.len().saturating_sub(keep);

        let mut request = Vec::with_capacity(keep.min(chat_log.len()) + 1);
        request.push(Message::system(self.config.system_prompt.clone()));
        request.extend(chat_log[start..].iter().map(|m| Message {
            role: m.role.for_model(),
            content: if self.config.vision_enabled {
                m.content.clone()
            } else {
                MessageContent::text(m.content.text.clone())
            },
        }));
        request
    }

    /// Handle one user message end to end.
    ///
    /// Returns the compacted reply entries appended to the chat log. Empty
    /// input is ignored.
    pub async fn send_chat(&self, text: &str, image_url: Option<String>) -> Vec<Message> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty chat message");
            return Vec::new();
        }

        let user = match image_url {
            Some(url) if self.config.vision_enabled => Message::with_image(Role::User, text, url),
            Some(_) => {
                debug!("vision disabled, dropping attached image");
                Message::user(text)
            }
            None => Message::user(text),
        };

        let mut chat_log = self.session.chat_log();
        chat_log.push(user);
        self.session.set_chat_log(chat_log.clone());
        self.session.set_chat_processing(true);

        let request = self.build_request(&chat_log);
        let reply = self.process_ai_response(chat_log, &request).await;

        self.session.set_chat_processing(false);
        reply
    }

    /// Pick a handler, stream its reply and commit it to the chat log.
    ///
    /// A model that fails to open ends the turn with nothing committed.
    pub async fn process_ai_response(
        &self,
        chat_log: Vec<Message>,
        request: &[Message],
    ) -> Vec<Message> {
        let selector = select_agent(self.classifier.as_deref(), request.last()).await;
        self.session.emit(RuntimeEvent::AgentSelected {
            agent: selector.to_string(),
        });

        let mut reader: Box<dyn ChunkReader> = match selector.canned_reply() {
            Some(reply) => Box::new(StaticChunks::from_text(reply)),
            None => match self.model.open_stream(request).await {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("model stream failed to open: {e}");
                    return Vec::new();
                }
            },
        };

        let reply = self.processor.process_stream_response(reader.as_mut()).await;

        let mut committed = chat_log;
        committed.extend(reply.iter().cloned());
        self.session.set_chat_log(committed);
        info!(agent = %selector, entries = reply.len(), "turn complete");
        reply
    }
}
