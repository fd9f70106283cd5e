//! Patch IR: spans, edits and the single-file edit applier.
//!
//! This module implements the edit model shared by every rewrite rule:
//! - Half-open byte spans in original source coordinates
//! - Insert / Delete / Replace edits
//! - Conflict detection (overlapping spans, out-of-bounds spans)
//! - Deterministic application of a batch of edits to one source text
//!
//! ## Ordering Contract
//!
//! Edits are always expressed against the *original* text. The applier sorts
//! them by start offset; at equal offsets pure insertions are placed before a
//! replacement or deletion that starts there, and edits with identical keys
//! keep the order in which they were produced. Rules rely on this to emit
//! e.g. `.pipe(` at the end of a receiver and replace the `.map` that follows
//! it in the same batch.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use crate::output::Finding;

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        ContentHash(hex::encode(result))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Zero-width span at `offset`.
    pub fn at(offset: usize) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Two spans overlap if they share any byte positions, or if one is a
    /// zero-width span strictly inside the other. Adjacent spans (one ends
    /// where another starts) do NOT overlap, and neither do two insertions at
    /// the same offset.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Edit Operations
// ============================================================================

/// The kind of edit operation, derived from the span and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    /// Insert text at `span.start` (empty span).
    Insert,
    /// Delete the bytes in `span` (empty text).
    Delete,
    /// Replace the bytes in `span` with new text.
    Replace,
}

/// A single text change in original source coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// The byte range being replaced.
    pub span: Span,
    /// The new text (empty for Delete).
    pub text: String,
}

impl Edit {
    /// Insert `text` at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Edit {
            span: Span::at(offset),
            text: text.into(),
        }
    }

    /// Delete the bytes in `span`.
    pub fn delete(span: Span) -> Self {
        Edit {
            span,
            text: String::new(),
        }
    }

    /// Replace the bytes in `span` with `text`.
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Edit {
            span,
            text: text.into(),
        }
    }

    /// The kind of this edit.
    pub fn kind(&self) -> EditKind {
        if self.span.is_empty() {
            EditKind::Insert
        } else if self.text.is_empty() {
            EditKind::Delete
        } else {
            EditKind::Replace
        }
    }

    /// Returns true for pure insertions.
    pub fn is_insertion(&self) -> bool {
        self.kind() == EditKind::Insert
    }
}

// ============================================================================
// Conflict Detection
// ============================================================================

/// A detected overlap or invalid span that prevents apply.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Conflict {
    /// Two edits have overlapping spans.
    #[error("overlapping edits: {edit1_span} and {edit2_span}")]
    OverlappingSpans { edit1_span: Span, edit2_span: Span },

    /// Span is out of bounds for the source.
    #[error("span {span} is out of bounds for source of length {source_len}")]
    SpanOutOfBounds { span: Span, source_len: usize },

    /// Span boundary falls inside a multi-byte character.
    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

/// Return the edits in application order (see the module docs).
pub fn sort_edits(edits: &[Edit]) -> Vec<&Edit> {
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    // `sort_by_key` is stable, so equal keys keep production order.
    sorted.sort_by_key(|e| (e.span.start, !e.is_insertion()));
    sorted
}

/// Detect conflicts within a batch of edits for one source text.
///
/// Returns a list of all detected conflicts. An empty list means no conflicts.
#[must_use]
pub fn detect_conflicts(source: &str, edits: &[Edit]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for edit in edits {
        if edit.span.end > source.len() {
            conflicts.push(Conflict::SpanOutOfBounds {
                span: edit.span,
                source_len: source.len(),
            });
            continue;
        }
        for offset in [edit.span.start, edit.span.end] {
            if !source.is_char_boundary(offset) {
                conflicts.push(Conflict::NotCharBoundary { offset });
            }
        }
    }

    for i in 0..edits.len() {
        for j in (i + 1)..edits.len() {
            let span_i = edits[i].span;
            let span_j = edits[j].span;
            if span_i.overlaps(&span_j) {
                conflicts.push(Conflict::OverlappingSpans {
                    edit1_span: span_i,
                    edit2_span: span_j,
                });
            }
        }
    }

    conflicts
}

/// Apply a batch of edits to `source`.
///
/// Either all edits apply, or none do: the first conflict found is returned
/// and the source is left untouched.
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, Conflict> {
    if let Some(conflict) = detect_conflicts(source, edits).into_iter().next() {
        return Err(conflict);
    }

    let extra: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut result = String::with_capacity(source.len() + extra);
    let mut cursor = 0;
    for edit in sort_edits(edits) {
        result.push_str(&source[cursor..edit.span.start]);
        result.push_str(&edit.text);
        cursor = edit.span.end;
    }
    result.push_str(&source[cursor..]);
    Ok(result)
}

/// Outcome of applying a list of findings to one source text.
#[derive(Debug, Clone)]
pub struct FindingsApplied {
    /// The rewritten source.
    pub text: String,
    /// Number of findings whose edits were applied.
    pub applied: usize,
    /// Number of findings deferred because they conflicted with an earlier one.
    pub deferred: usize,
}

/// Apply whole findings greedily, in order.
///
/// A finding is accepted only if none of its edits conflict with the edits
/// already accepted; otherwise it is deferred, to be rediscovered by the
/// next pass of the fixed-point driver.
pub fn apply_findings(source: &str, findings: &[Finding]) -> Result<FindingsApplied, Conflict> {
    let mut accepted: Vec<Edit> = Vec::new();
    let mut applied = 0;
    let mut deferred = 0;

    for finding in findings {
        let clashes = finding.edits.iter().any(|edit| {
            accepted.iter().any(|prev| prev.span.overlaps(&edit.span))
        });
        if clashes || !detect_conflicts(source, &finding.edits).is_empty() {
            tracing::debug!(
                rule = %finding.rule,
                span = %finding.span,
                "deferring finding that conflicts with an earlier edit"
            );
            deferred += 1;
            continue;
        }
        accepted.extend(finding.edits.iter().cloned());
        applied += 1;
    }

    let text = apply_edits(source, &accepted)?;
    Ok(FindingsApplied {
        text,
        applied,
        deferred,
    })
}
