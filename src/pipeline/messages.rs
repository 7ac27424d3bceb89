//! Message types passed between pipeline stages.

use serde::{Deserialize, Serialize};

/// Author role of a chat-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant (model) output.
    Assistant,
    /// A fenced code block captured from an assistant reply.
    Code,
}

impl Role {
    /// Role used when sending this entry to a chat model.
    ///
    /// Models only understand system/user/assistant, so code entries are
    /// presented as assistant output.
    pub fn for_model(self) -> Self {
        match self {
            Self::Code => Self::Assistant,
            other => other,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Code => write!(f, "code"),
        }
    }
}

/// Text content with at most one attached image reference.
///
/// Serializes as a bare string when there is no image, and as the
/// `[{"type":"text",...},{"type":"image_url",...}]` parts array otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContentRepr", into = "ContentRepr")]
pub struct MessageContent {
    /// Textual part.
    pub text: String,
    /// Optional image reference (URL or data URI).
    pub image_url: Option<String>,
}

impl MessageContent {
    /// Plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }

    /// Text with an attached image reference.
    pub fn with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: Some(image_url.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentRepr {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageRef {
    url: String,
}

impl From<ContentRepr> for MessageContent {
    fn from(repr: ContentRepr) -> Self {
        match repr {
            ContentRepr::Text(text) => Self::text(text),
            ContentRepr::Parts(parts) => {
                let mut content = Self::text(String::new());
                for part in parts {
                    match part {
                        ContentPart::Text { text } => content.text.push_str(&text),
                        ContentPart::ImageUrl { image_url } => {
                            content.image_url = Some(image_url.url);
                        }
                    }
                }
                content
            }
        }
    }
}

impl From<MessageContent> for ContentRepr {
    fn from(content: MessageContent) -> Self {
        match content.image_url {
            None => Self::Text(content.text),
            Some(url) => Self::Parts(vec![
                ContentPart::Text { text: content.text },
                ContentPart::ImageUrl {
                    image_url: ImageRef { url },
                },
            ]),
        }
    }
}

/// One chat-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Entry content.
    pub content: MessageContent,
}

impl Message {
    /// Create a plain-text message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::text(text),
        }
    }

    /// Create a text message with an attached image reference.
    pub fn with_image(role: Role, text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::with_image(text, image_url),
        }
    }

    /// Shorthand for a user text message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Shorthand for an assistant text message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Shorthand for a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    /// Shorthand for a captured code block.
    pub fn code(text: impl Into<String>) -> Self {
        Self::text(Role::Code, text)
    }

    /// Textual part of the content.
    pub fn text_content(&self) -> &str {
        &self.content.text
    }
}

/// A single utterance handed to the speech-playback collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Leading bracket tag of the reply (e.g. `[happy]`), or empty.
    pub tag: String,
    /// Sentence text with fence markers removed.
    pub text: String,
}

impl Utterance {
    /// Default delivery when the reply carried no usable tag.
    pub const NEUTRAL: &'static str = "neutral";

    /// Create an utterance.
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
        }
    }

    /// Delivery hint from the tag, lowercased, without brackets.
    pub fn emotion(&self) -> String {
        let inner = self
            .tag
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .map(str::trim)
            .unwrap_or_default();
        if inner.is_empty() {
            Self::NEUTRAL.to_owned()
        } else {
            inner.to_lowercase()
        }
    }

    /// Tag-prefixed text as sent to speech synthesis.
    pub fn spoken_text(&self) -> String {
        if self.tag.is_empty() {
            self.text.clone()
        } else {
            format!("{} {}", self.tag, self.text)
        }
    }
}
