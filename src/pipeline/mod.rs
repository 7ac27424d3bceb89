//! Streaming reply pipeline.
//!
//! Model stream → segmenter/tracker → playback orderer → log reducer → chat
//! log. [`coordinator::ConversationCoordinator`] runs a whole chat turn.

pub mod coordinator;
pub mod links;
pub mod log_reducer;
pub mod messages;
pub mod playback;
pub mod segmenter;
pub mod session;
pub mod stream;
pub mod tracker;

pub use coordinator::{ConversationCoordinator, ModelClient};
pub use playback::{PlaybackOrderer, QueuedPlayback, SpeechPlayback, UtteranceSink};
pub use session::SharedSession;
pub use stream::{ChunkReader, StaticChunks, StreamProcessor};
