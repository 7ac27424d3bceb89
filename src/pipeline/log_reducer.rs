//! Compaction of the per-sentence reply log into chat-log entries.

use crate::pipeline::messages::{Message, MessageContent};

/// Fold `entries` into a compacted log.
///
/// Entries with blank text and no image are dropped first, then consecutive
/// entries with the same role are merged with a single separating space.
/// Text is otherwise kept verbatim so code bodies survive intact.
/// Each merged entry carries the most recent image reference seen in its
/// run. The output never has two neighbours with the same role, so
/// reducing it again returns it unchanged.
pub fn reduce(entries: &[Message]) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::new();

    for entry in entries {
        let text = entry.content.text.as_str();
        let blank = text.trim().is_empty();
        let image = entry.content.image_url.as_deref();
        if blank && image.is_none() {
            continue;
        }

        match out.last_mut() {
            Some(last) if last.role == entry.role => {
                if !blank {
                    if !last.content.text.is_empty() {
                        last.content.text.push(' ');
                    }
                    last.content.text.push_str(text);
                }
                if let Some(url) = image {
                    last.content.image_url = Some(url.to_owned());
                }
            }
            _ => out.push(Message {
                role: entry.role,
                content: MessageContent {
                    text: if blank { String::new() } else { text.to_owned() },
                    image_url: image.map(str::to_owned),
                },
            }),
        }
    }

    out
}
