//! Picks the attachment most likely to be the invoice.
//!
//! Filenames are matched against a fixed list of patterns in priority order:
//! commercial invoice, invoice, proforma, then "pi". Within a pattern the
//! earliest candidate wins. When nothing matches, the first candidate is used.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::attachments::AttachmentRef;

static INVOICE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)commercial\s*invoice").unwrap(),
            "commercial_invoice",
        ),
        (Regex::new(r"(?i)\binvoice\b").unwrap(), "invoice"),
        (
            Regex::new(r"(?i)proforma\s*invoice|\bproforma\b").unwrap(),
            "proforma",
        ),
        (Regex::new(r"(?i)^pi\b|\bpi\b").unwrap(), "pi"),
    ]
});

/// Anything the selector can rank.
pub trait InvoiceCandidate {
    /// Filename, falling back to a title when the filename is empty.
    fn label(&self) -> &str;
}

impl InvoiceCandidate for AttachmentRef {
    fn label(&self) -> &str {
        &self.filename
    }
}

/// Loosely shaped attachment records, as returned by some listing helpers.
impl InvoiceCandidate for Value {
    fn label(&self) -> &str {
        ["filename", "title"]
            .iter()
            .filter_map(|key| self.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    Pattern(&'static str),
    /// Nothing matched; the first candidate was taken.
    FirstCandidate,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Selection<'a, T> {
    /// 1-based position in the input
    pub position: usize,
    pub candidate: &'a T,
    pub reason: MatchReason,
}

/// Choose the invoice attachment. Returns `None` only for an empty input.
pub fn choose_invoice_attachment<T: InvoiceCandidate>(candidates: &[T]) -> Option<Selection<'_, T>> {
    for (pattern, name) in INVOICE_PATTERNS.iter() {
        let hit = candidates
            .iter()
            .enumerate()
            .find(|(_, candidate)| pattern.is_match(candidate.label()));
        if let Some((index, candidate)) = hit {
            return Some(Selection {
                position: index + 1,
                candidate,
                reason: MatchReason::Pattern(*name),
            });
        }
    }

    candidates.first().map(|candidate| Selection {
        position: 1,
        candidate,
        reason: MatchReason::FirstCandidate,
    })
}
