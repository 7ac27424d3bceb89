//! Agent routing for a chat turn.
//!
//! An external classifier looks at the latest request message and answers
//! with `{"agent": "AgentN"}`. The answer picks which handler produces the
//! reply; anything unusable falls back to the baseline model stream.

use crate::error::Result;
use crate::pipeline::messages::Message;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Handler chosen for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentSelector {
    /// Ordinary model reply (`Agent1`).
    #[default]
    Baseline,
    /// Meeting minutes (`Agent2`).
    Minutes,
    /// Proposal drafting (`Agent3`).
    Proposal,
    /// Email drafting (`Agent4`).
    Email,
}

impl AgentSelector {
    /// Wire name used by the classifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "Agent1",
            Self::Minutes => "Agent2",
            Self::Proposal => "Agent3",
            Self::Email => "Agent4",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Agent1" => Some(Self::Baseline),
            "Agent2" => Some(Self::Minutes),
            "Agent3" => Some(Self::Proposal),
            "Agent4" => Some(Self::Email),
            _ => None,
        }
    }

    /// Fixed reply replayed through the stream pipeline for non-baseline
    /// handlers. `None` for the baseline, which streams from the model.
    pub fn canned_reply(self) -> Option<&'static str> {
        match self {
            Self::Baseline => None,
            other => Some(other.as_str()),
        }
    }
}

impl std::fmt::Display for AgentSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct ClassifierAnswer {
    agent: String,
}

/// Parse a raw classifier answer. Malformed or unknown answers select the
/// baseline handler.
pub fn parse_selector(raw: &str) -> AgentSelector {
    let answer = match serde_json::from_str::<ClassifierAnswer>(raw.trim()) {
        Ok(answer) => answer,
        Err(e) => {
            warn!("unparseable classifier answer, using baseline: {e}");
            return AgentSelector::Baseline;
        }
    };
    AgentSelector::from_name(&answer.agent).unwrap_or_else(|| {
        warn!(agent = %answer.agent, "unknown agent, using baseline");
        AgentSelector::Baseline
    })
}

/// Black-box classifier returning the raw selector answer.
#[async_trait]
pub trait AgentClassifier: Send + Sync {
    /// Classify the turn from its latest request message.
    async fn classify(&self, latest: &Message) -> Result<String>;
}

/// Ask `classifier` (if any) which handler should answer `latest`.
///
/// Classifier errors select the baseline handler.
pub async fn select_agent(
    classifier: Option<&dyn AgentClassifier>,
    latest: Option<&Message>,
) -> AgentSelector {
    let (Some(classifier), Some(latest)) = (classifier, latest) else {
        return AgentSelector::Baseline;
    };
    match classifier.classify(latest).await {
        Ok(raw) => {
            let selector = parse_selector(&raw);
            debug!(agent = %selector, "agent selected");
            selector
        }
        Err(e) => {
            warn!("agent classifier failed, using baseline: {e}");
            AgentSelector::Baseline
        }
    }
}
