//! Content transform pipeline
//!
//! Turns a remote status's HTML into a local entry body and title:
//! markup sanitizing, boost attribution, and title derivation, plus the
//! typed extension points collaborators can inject at construction.

use std::collections::{HashMap, HashSet};

use crate::data::NewEntry;
use crate::mastodon::Status;

/// Extension points applied while a status becomes an entry.
///
/// Invocation order per status: `rewrite_body`, `rewrite_title`,
/// `rewrite_entry` (immediately before the store insert), then after a
/// successful insert and the orchestrator's own cursor update,
/// `after_import`. `feature_first_image` is consulted once per entry
/// when the first attachment ingests successfully.
///
/// Implementations must be pure with respect to pipeline state: nothing
/// they do may change how later statuses in the same batch are handled.
pub trait ImportHooks: Send + Sync {
    /// Reshape the sanitized (and possibly attributed) body.
    fn rewrite_body(&self, body: String, _status: &Status) -> String {
        body
    }

    /// Reshape the derived title.
    fn rewrite_title(&self, title: String, _status: &Status) -> String {
        title
    }

    /// Reshape the fully assembled entry right before insertion.
    fn rewrite_entry(&self, entry: NewEntry, _status: &Status) -> NewEntry {
        entry
    }

    /// Whether the first successfully ingested attachment becomes the
    /// entry's featured image.
    fn feature_first_image(&self, _status: &Status) -> bool {
        true
    }

    /// Post-import notification, invoked synchronously after the cursor
    /// update.
    fn after_import(&self, _entry_id: &str, _status: &Status) {}
}

/// The no-op hook set.
pub struct DefaultHooks;

impl ImportHooks for DefaultHooks {}

/// Sanitize remote HTML down to the minimal allow-list.
///
/// Only `<a href class>` and `<br>` survive; everything else is dropped
/// (not escaped). This is a safety boundary: remote instances render
/// arbitrary markup and none of it is trusted here.
pub fn sanitize(html: &str) -> String {
    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", HashSet::from(["href", "class"]));

    ammonia::Builder::default()
        .tags(HashSet::from(["a", "br"]))
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .link_rel(None)
        .clean(html)
        .to_string()
        .trim()
        .to_string()
}

/// Wrap a boost's body in a blockquote with an attribution link to the
/// original author.
///
/// Only applies when the sanitized body is non-empty: a media-only boost
/// gets no attribution wrapper, so the empty-content rule downstream
/// still sees an empty body.
pub fn apply_boost_attribution(body: String, status: &Status) -> String {
    if body.is_empty() {
        return body;
    }

    let Some(reblog) = &status.reblog else {
        return body;
    };
    let (Some(url), Some(account)) = (reblog.url.as_deref(), reblog.account.as_ref()) else {
        return body;
    };
    if url.is_empty() || account.username.is_empty() {
        return body;
    }

    format!(
        "<blockquote>{}\n\n&mdash;<a href=\"{}\" rel=\"nofollow\">{}</a></blockquote>",
        body,
        html_escape::encode_double_quoted_attribute(url),
        html_escape::encode_text(&account.username),
    )
}

/// Derive an entry title from the first words of the body.
///
/// Tags are stripped, entities decoded, whitespace collapsed; an
/// ellipsis marks truncation. May return an empty string, in which case
/// the caller falls back to the canonical URL.
pub fn derive_title(body: &str, max_words: usize) -> String {
    let text = ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(body)
        .to_string();
    let text = html_escape::decode_html_entities(&text).to_string();

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut title = words
        .iter()
        .take(max_words)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > max_words {
        title.push('…');
    }

    title
}
