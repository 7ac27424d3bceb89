//! Reply-level state carried across stream chunks: the leading delivery tag
//! and fenced code blocks that span several sentence units.

use crate::pipeline::segmenter::{CODE_FENCE, SentenceUnit, is_inert};

/// Where the tracker is within the current reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// No text seen yet; a leading `[tag]` may still arrive.
    #[default]
    AwaitingTag,
    /// Ordinary speakable text.
    InText,
    /// Between an opening and a closing fence.
    InCodeBlock,
}

/// What a sentence unit turned into after fence handling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tracked {
    /// Code blocks closed by this unit, each with its full body.
    pub code_blocks: Vec<String>,
    /// Fence-free text worth speaking, if any.
    pub speech: Option<String>,
}

/// Extracts the reply tag once and toggles code-block capture on fences.
#[derive(Debug, Default)]
pub struct TagCodeBlockTracker {
    state: TrackerState,
    tag: String,
    code_block_text: String,
}

impl TagCodeBlockTracker {
    /// Fresh tracker for a new reply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Captured tag including brackets (e.g. `[happy]`), or empty.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether a code block is open.
    pub fn in_code_block(&self) -> bool {
        self.state == TrackerState::InCodeBlock
    }

    /// Code accumulated since the opening fence.
    pub fn code_block_text(&self) -> &str {
        &self.code_block_text
    }

    /// Strip a leading `[tag]` from the start of the reply buffer.
    ///
    /// Runs at most once per reply. Returns `false` while the buffer could
    /// still be an incomplete tag (e.g. `"[hap"`); callers should hold the
    /// buffer back from segmentation until more input arrives.
    pub fn capture_tag(&mut self, buffer: &mut String) -> bool {
        if self.state != TrackerState::AwaitingTag {
            return true;
        }
        if buffer.is_empty() {
            return false;
        }
        if !buffer.starts_with('[') {
            self.state = TrackerState::InText;
            return true;
        }

        for (i, c) in buffer.char_indices().skip(1) {
            if c == ']' {
                self.tag = buffer[..=i].to_owned();
                buffer.drain(..=i);
                let leading = buffer.len() - buffer.trim_start().len();
                buffer.drain(..leading);
                self.state = TrackerState::InText;
                return true;
            }
            if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
                self.state = TrackerState::InText;
                return true;
            }
        }
        false
    }

    /// Stop waiting for a tag (stream ended before one could complete).
    pub fn abandon_tag(&mut self) {
        if self.state == TrackerState::AwaitingTag {
            self.state = TrackerState::InText;
        }
    }

    /// Route one sentence unit through fence handling.
    ///
    /// Text outside fences becomes speech unless it is inert; text inside
    /// fences accumulates verbatim until the closing fence emits the whole
    /// block.
    pub fn track(&mut self, unit: &SentenceUnit) -> Tracked {
        self.abandon_tag();

        let mut tracked = Tracked::default();
        let mut speech = String::new();

        let mut parts = unit.raw().split(CODE_FENCE);
        if let Some(first) = parts.next() {
            self.append_part(first, &mut speech);
        }
        for part in parts {
            if self.in_code_block() {
                tracked
                    .code_blocks
                    .push(std::mem::take(&mut self.code_block_text));
                self.state = TrackerState::InText;
            } else {
                self.code_block_text.clear();
                self.state = TrackerState::InCodeBlock;
            }
            self.append_part(part, &mut speech);
        }

        if !speech.is_empty() && !is_inert(&speech) {
            tracked.speech = Some(speech);
        }
        tracked
    }

    /// Take an unterminated code block at the end of the reply.
    pub fn finish(&mut self) -> Option<String> {
        if !self.in_code_block() {
            return None;
        }
        self.state = TrackerState::InText;
        let code = std::mem::take(&mut self.code_block_text);
        (!code.is_empty()).then_some(code)
    }

    fn append_part(&mut self, part: &str, speech: &mut String) {
        if self.in_code_block() {
            self.code_block_text.push_str(part);
        } else {
            speech.push_str(part);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::pipeline::segmenter::SentenceSegmenter;

    fn unit(text: &str) -> SentenceUnit {
        SentenceUnit::new(text)
    }

    #[test]
    fn captures_leading_tag_once() {
        let mut tracker = TagCodeBlockTracker::new();
        let mut buffer = "[happy] Hello there.".to_owned();
        assert!(tracker.capture_tag(&mut buffer));
        assert_eq!(tracker.tag(), "[happy]");
        assert_eq!(buffer, "Hello there.");

        let mut later = "[not a tag] text".to_owned();
        assert!(tracker.capture_tag(&mut later));
        assert_eq!(later, "[not a tag] text");
        assert_eq!(tracker.tag(), "[happy]");
    }

    #[test]
    fn incomplete_tag_waits_for_more_input() {
        let mut tracker = TagCodeBlockTracker::new();
        let mut buffer = "[ha".to_owned();
        assert!(!tracker.capture_tag(&mut buffer));
        assert_eq!(tracker.state(), TrackerState::AwaitingTag);

        buffer.push_str("ppy]Hi.");
        assert!(tracker.capture_tag(&mut buffer));
        assert_eq!(tracker.tag(), "[happy]");
        assert_eq!(buffer, "Hi.");
    }

    #[test]
    fn untagged_reply_leaves_tag_empty() {
        let mut tracker = TagCodeBlockTracker::new();
        let mut buffer = "Plain reply.".to_owned();
        assert!(tracker.capture_tag(&mut buffer));
        assert_eq!(tracker.tag(), "");
        assert_eq!(buffer, "Plain reply.");
    }

    #[test]
    fn bracket_without_close_on_first_line_is_not_a_tag() {
        let mut tracker = TagCodeBlockTracker::new();
        let mut buffer = "[1\n2]".to_owned();
        assert!(tracker.capture_tag(&mut buffer));
        assert_eq!(tracker.tag(), "");
        assert_eq!(buffer, "[1\n2]");
    }

    #[test]
    fn plain_sentence_is_speech() {
        let mut tracker = TagCodeBlockTracker::new();
        let tracked = tracker.track(&unit("Hello."));
        assert_eq!(tracked.speech.as_deref(), Some("Hello."));
        assert!(tracked.code_blocks.is_empty());
    }

    #[test]
    fn inert_sentence_is_not_speech() {
        let mut tracker = TagCodeBlockTracker::new();
        let tracked = tracker.track(&unit("」。"));
        assert_eq!(tracked, Tracked::default());
    }

    #[test]
    fn opening_fence_splits_speech_from_code() {
        let mut tracker = TagCodeBlockTracker::new();
        let tracked = tracker.track(&unit("Here: ```rust\n"));
        assert_eq!(tracked.speech.as_deref(), Some("Here: "));
        assert!(tracker.in_code_block());
        assert_eq!(tracker.code_block_text(), "rust\n");
    }

    #[test]
    fn inert_lines_inside_code_are_kept() {
        let mut tracker = TagCodeBlockTracker::new();
        tracker.track(&unit("```\n"));
        let tracked = tracker.track(&unit("}\n"));
        assert_eq!(tracked, Tracked::default());
        assert_eq!(tracker.code_block_text(), "}\n");
    }

    #[test]
    fn closing_fence_emits_block_and_trailing_speech() {
        let mut tracker = TagCodeBlockTracker::new();
        tracker.track(&unit("```\n"));
        tracker.track(&unit("let x = 1;\n"));
        let tracked = tracker.track(&unit("``` That is all."));
        assert_eq!(tracked.code_blocks, vec!["let x = 1;\n".to_owned()]);
        assert_eq!(tracked.speech.as_deref(), Some(" That is all."));
        assert_eq!(tracker.state(), TrackerState::InText);
        assert_eq!(tracker.code_block_text(), "");
    }

    #[test]
    fn inline_open_and_close_in_one_unit() {
        let mut tracker = TagCodeBlockTracker::new();
        let tracked = tracker.track(&unit("Run ```ls``` now."));
        assert_eq!(tracked.code_blocks, vec!["ls".to_owned()]);
        assert_eq!(tracked.speech.as_deref(), Some("Run  now."));
        assert!(!tracker.in_code_block());
    }

    #[test]
    fn unterminated_block_is_flushed_on_finish() {
        let mut tracker = TagCodeBlockTracker::new();
        tracker.track(&unit("```\n"));
        tracker.track(&unit("echo hi\n"));
        assert_eq!(tracker.finish().as_deref(), Some("echo hi\n"));
        assert!(tracker.finish().is_none());
    }

    #[test]
    fn full_reply_reconstructs_fenced_body() {
        let body = "python\nprint(1)\nx = 2\n";
        let reply = format!("Look at this.\n```{body}```\nDone.");

        let mut tracker = TagCodeBlockTracker::new();
        let mut buffer = reply;
        assert!(tracker.capture_tag(&mut buffer));
        let seg = SentenceSegmenter::new().segment(&buffer);

        let mut blocks = Vec::new();
        let mut spoken = Vec::new();
        for unit in &seg.sentences {
            let tracked = tracker.track(unit);
            blocks.extend(tracked.code_blocks);
            spoken.extend(tracked.speech);
        }
        if !seg.remainder.is_empty() {
            let tracked = tracker.track(&SentenceUnit::new(seg.remainder.clone()));
            spoken.extend(tracked.speech);
        }

        assert_eq!(blocks, vec![body.to_owned()]);
        assert_eq!(spoken, vec!["Look at this.".to_owned(), "Done.".to_owned()]);
    }

    #[test]
    fn indentation_and_blank_lines_survive_in_code() {
        let mut tracker = TagCodeBlockTracker::new();
        tracker.track(&unit("```python\n"));
        tracker.track(&unit("def f():\n"));
        tracker.track(&unit("    return 1\n"));
        tracker.track(&unit("\n"));
        let tracked = tracker.track(&unit("```"));
        assert_eq!(
            tracked.code_blocks,
            vec!["python\ndef f():\n    return 1\n\n".to_owned()]
        );
    }
}
