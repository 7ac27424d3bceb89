//! URL rewriting for displayed assistant text.

use regex::Regex;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"https?://[^\s<>]+").expect("static URL regex")
});

/// Whether `text` contains an `http(s)://` URL.
pub fn contains_url(text: &str) -> bool {
    URL_RE.is_match(text)
}

/// Rewrite every URL into a clickable reference opening in a new tab.
pub fn linkify(text: &str) -> String {
    URL_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let url = &caps[0];
            format!(r#"<a href="{url}" target="_blank">{url}</a>"#)
        })
        .into_owned()
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Popup body for a finished reply, or `None` when it has no URL.
pub fn popup_content(full_response: &str) -> Option<String> {
    let collapsed = collapse_whitespace(full_response);
    contains_url(&collapsed).then(|| linkify(&collapsed))
}
