//! Runtime events emitted by the pipeline for UI and observability.
//!
//! Payloads stay small so emitting never blocks the stream or playback paths.

/// Events that describe what the front-end is doing "right now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Displayed assistant message changed (links already rewritten).
    AssistantMessage(String),
    /// Sentences currently being voiced, oldest first.
    SlideMessages(Vec<String>),
    /// Number of utterances started but not yet finished.
    ProcessingCount(usize),
    /// Whether a chat turn is in progress.
    ChatProcessing { active: bool },
    /// Chat log was replaced or extended.
    ChatLogUpdated { len: usize },
    /// Agent selected for the current turn.
    AgentSelected { agent: String },
    /// A finished reply contained links; the popup should open.
    Popup { content: String },
    /// Corrected transcription text changed.
    CorrectedTextUpdated,
}
