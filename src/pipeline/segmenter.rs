//! Sentence segmentation for streamed model replies.
//!
//! A growing text buffer is cut into speakable units as soon as a unit is
//! complete, so speech can start long before the reply finishes. A unit ends
//! at the first sentence terminator (`。．.!?！？` or newline), or, for long
//! runs without one, at the last comma-class break (`、,`) preceded by at least
//! [`DEFAULT_CLAUSE_MIN_CHARS`] characters. Units never span a line break.
//!
//! Units are cut verbatim: whitespace between units stays attached to the
//! unit that follows it, so concatenating every unit and the remainder gives
//! back the input. [`SentenceUnit::text`] is the trimmed view.

/// Triple-backtick code fence marker.
pub const CODE_FENCE: &str = "```";

/// Minimum characters before a comma-class break may end a unit.
pub const DEFAULT_CLAUSE_MIN_CHARS: usize = 20;

const SENTENCE_TERMINATORS: [char; 8] = ['。', '．', '.', '!', '?', '！', '？', '\n'];

/// Punctuation, brackets and quotes (ASCII and full-width) that carry nothing
/// worth speaking on their own.
const UNSPEAKABLE: &str = "[({「［（【『〈《〔｛«‹〘〚〛〙›»〕》〉』】）］」})]'\"‘’“”・、。,.!?！？:：;；-_=+~～*＊@＠#＃$＄%％^＾&＆|｜\\＼/／`｀";

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_clause_break(c: char) -> bool {
    matches!(c, '、' | ',')
}

fn is_unspeakable(c: char) -> bool {
    c.is_whitespace() || UNSPEAKABLE.contains(c)
}

/// True when `text` has nothing worth speaking.
///
/// Text containing a code fence is never inert: the fence drives code-block
/// capture even when the surrounding characters are all punctuation.
pub fn is_inert(text: &str) -> bool {
    !text.contains(CODE_FENCE) && text.chars().all(is_unspeakable)
}

/// One completed sentence cut from the stream buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceUnit {
    raw: String,
    inert: bool,
}

impl SentenceUnit {
    /// Wrap `raw`, classifying it as inert or speakable.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let inert = is_inert(&raw);
        Self { raw, inert }
    }

    /// Sentence text with leading whitespace trimmed.
    pub fn text(&self) -> &str {
        self.raw.trim_start()
    }

    /// Sentence text exactly as cut from the buffer.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the unit is pure whitespace/punctuation.
    pub fn is_inert(&self) -> bool {
        self.inert
    }
}

/// Result of segmenting a buffer: completed units plus the undelivered tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmented {
    /// Completed units in stream order.
    pub sentences: Vec<SentenceUnit>,
    /// Text still awaiting more input.
    pub remainder: String,
}

/// Stateless sentence splitter.
#[derive(Debug, Clone, Copy)]
pub struct SentenceSegmenter {
    clause_min_chars: usize,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self {
            clause_min_chars: DEFAULT_CLAUSE_MIN_CHARS,
        }
    }
}

impl SentenceSegmenter {
    /// Segmenter with the default clause threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the comma-class threshold.
    pub fn with_clause_min_chars(mut self, clause_min_chars: usize) -> Self {
        self.clause_min_chars = clause_min_chars;
        self
    }

    /// Lazily iterate over the completed units of `buffer`.
    ///
    /// After the iterator is exhausted, [`Sentences::remainder`] holds the
    /// unconsumed tail.
    pub fn iter<'a>(&self, buffer: &'a str) -> Sentences<'a> {
        Sentences {
            segmenter: *self,
            rest: buffer,
        }
    }

    /// Cut every completed unit out of `buffer`.
    ///
    /// When nothing is complete the whole buffer comes back as the remainder.
    pub fn segment(&self, buffer: &str) -> Segmented {
        let mut iter = self.iter(buffer);
        let sentences = iter.by_ref().collect();
        Segmented {
            sentences,
            remainder: iter.remainder().to_owned(),
        }
    }

    /// Byte length of the first complete unit at the start of `text`.
    ///
    /// Leading whitespace belongs to the unit. A line break right after it
    /// ends the unit on its own. Otherwise prefers the shortest prefix ending
    /// in a sentence terminator (at least one character before it), falling
    /// back to the longest prefix ending in a comma-class break with enough
    /// characters before it.
    fn find_unit_end(&self, text: &str) -> Option<usize> {
        let (start, first) = text
            .char_indices()
            .find(|&(_, c)| is_line_terminator(c) || !c.is_whitespace())?;
        if is_line_terminator(first) {
            return Some(start + first.len_utf8());
        }

        let body = &text[start..];
        for (i, c) in body.char_indices().skip(1) {
            if SENTENCE_TERMINATORS.contains(&c) {
                return Some(start + i + c.len_utf8());
            }
            if is_line_terminator(c) {
                break;
            }
        }

        let mut last_clause = None;
        for (n, (i, c)) in body.char_indices().enumerate() {
            if is_line_terminator(c) {
                break;
            }
            if n >= self.clause_min_chars && is_clause_break(c) {
                last_clause = Some(start + i + c.len_utf8());
            }
        }
        last_clause
    }
}

/// Lazy iterator over completed units. See [`SentenceSegmenter::iter`].
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    segmenter: SentenceSegmenter,
    rest: &'a str,
}

impl<'a> Sentences<'a> {
    /// Text not yet consumed by the iterator.
    pub fn remainder(&self) -> &'a str {
        self.rest
    }
}

impl Iterator for Sentences<'_> {
    type Item = SentenceUnit;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.segmenter.find_unit_end(self.rest)?;
        let (sentence, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(SentenceUnit::new(sentence))
    }
}
