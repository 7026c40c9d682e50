//! Duplicate Resolver
//!
//! Decides whether a candidate describes a file that is already recorded.
//! Signals are tried strongest first and the first hit wins:
//!
//! 1. `(etag, content_length)` - server-asserted content identity
//! 2. origin URL
//! 3. exact file name (first record in insertion order)
//! 4. file name without a " (N)" copy suffix, when enabled
//!
//! Content hash identity is checked separately by the registration
//! workflow once a hash is known. The resolver itself is read-only.

use std::borrow::Cow;
use std::sync::Arc;

use super::store::RecordStore;
use super::types::{DedupError, DuplicateCandidate, DuplicateMatch, MatchSignal};

/// Runs the matching cascade against a record store
#[derive(Clone)]
pub struct DuplicateResolver {
    store: Arc<dyn RecordStore>,
    smart_name_match: bool,
}

impl DuplicateResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            smart_name_match: false,
        }
    }

    /// Enable the copy-suffix name strategy
    pub fn with_smart_name_match(mut self, enabled: bool) -> Self {
        self.smart_name_match = enabled;
        self
    }

    /// Find the record this candidate duplicates, if any
    pub async fn resolve(
        &self,
        candidate: &DuplicateCandidate,
    ) -> Result<Option<DuplicateMatch>, DedupError> {
        if let (Some(etag), Some(length)) = (present(&candidate.etag), candidate.content_length) {
            if let Some(record) = self.store.find_by_etag_and_length(etag, length).await? {
                return Ok(Some(hit(record, MatchSignal::TransportIdentity)));
            }
        }

        if let Some(url) = present(&candidate.original_url) {
            if let Some(record) = self.store.find_by_original_url(url).await? {
                return Ok(Some(hit(record, MatchSignal::OriginUrl)));
            }
        }

        if let Some(name) = present(&candidate.file_name) {
            if let Some(record) = self.store.find_first_by_file_name(name).await? {
                return Ok(Some(hit(record, MatchSignal::FileName)));
            }

            if self.smart_name_match {
                if let Cow::Owned(clean) = strip_copy_suffix(name) {
                    tracing::debug!(file_name = %name, clean_name = %clean, "Trying name without copy suffix");
                    if let Some(record) = self.store.find_first_by_file_name(&clean).await? {
                        return Ok(Some(hit(record, MatchSignal::CopySuffixName)));
                    }
                }
            }
        }

        tracing::debug!(
            etag = ?candidate.etag,
            content_length = ?candidate.content_length,
            original_url = ?candidate.original_url,
            file_name = ?candidate.file_name,
            "No duplicate found"
        );
        Ok(None)
    }

    /// Look up a record by content hash, the strongest identity signal
    pub async fn resolve_by_hash(
        &self,
        content_hash: &str,
    ) -> Result<Option<DuplicateMatch>, DedupError> {
        let found = self.store.find_by_content_hash(content_hash).await?;
        Ok(found.map(|record| hit(record, MatchSignal::ContentHash)))
    }
}

fn hit(record: crate::db::FileRecord, signal: MatchSignal) -> DuplicateMatch {
    tracing::info!(
        file_id = %record.id,
        file_name = %record.file_name,
        signal = signal.as_str(),
        "Duplicate found"
    );
    DuplicateMatch { record, signal }
}

/// An empty string carries no identity
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Remove browser copy suffixes such as `report (1).docx -> report.docx`.
///
/// A suffix is a space, parenthesised ASCII digits, and a closing paren,
/// sitting at the end of the name or directly before the final extension.
/// Returns `Cow::Borrowed` when nothing was removed.
pub fn strip_copy_suffix(name: &str) -> Cow<'_, str> {
    let bytes = name.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b' ' && bytes[i + 1] == b'(' {
            let digits_start = i + 2;
            let mut j = digits_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > digits_start && j < bytes.len() && bytes[j] == b')' {
                let end = j + 1;
                if is_extension_or_end(&name[end..]) {
                    out.push_str(&name[copied..i]);
                    copied = end;
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }

    if copied == 0 {
        return Cow::Borrowed(name);
    }
    out.push_str(&name[copied..]);
    Cow::Owned(out)
}

/// `""` or a single final extension like `.pdf`
fn is_extension_or_end(rest: &str) -> bool {
    match rest.strip_prefix('.') {
        Some(ext) => !ext.is_empty() && !ext.contains('.'),
        None => rest.is_empty(),
    }
}

// ============================================================================
// Tests
// ============================================================================
