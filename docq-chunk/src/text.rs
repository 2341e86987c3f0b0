//! Text chunking for retrieval pipelines.
//!
//! This module splits raw document text into overlapping, boundary-aware
//! segments suitable for embedding. Chunks are produced by a sliding window:
//! each window proposes an end offset `start + chunk_size`, then searches
//! backward through the tail of the window for a natural boundary (sentence
//! end, paragraph break, line break, word break) so chunks tend to end at
//! readable positions instead of mid-sentence.
//!
//! The module defines:
//! - [`TextSplitter`]: configures window size and overlap and performs the split.
//! - [`Chunk`]: a segment of a source document paired with the source's
//!   relative path, the unit of embedding and retrieval downstream.
//!
//! Consecutive chunks share `overlap` characters at their boundary (boundary
//! shifting can reduce the effective overlap but never increase it), so
//! concatenating the first chunk with each later chunk's non-overlapping tail
//! reconstructs the original text.
//!
//! Discarding chunks that are too short to be informative is deliberately the
//! caller's responsibility; [`is_informative`] is the predicate callers use.

use serde::{Deserialize, Serialize};

/// Boundary separators searched backward through the window tail, in priority
/// order: sentence ends first, then paragraph breaks, lines, and words.
const SEPARATORS: &[&str] = &[". ", "! ", "? ", "\n\n", "\n", " "];

/// How far back from the proposed window end to search for a separator.
const SEPARATOR_SEARCH_WINDOW: usize = 100;

/// Minimum chunk length (after trimming whitespace) considered informative
/// enough to embed.
pub const MIN_CHUNK_CHARS: usize = 100;

/// Returns true if a chunk carries enough text to be worth embedding.
///
/// Very short fragments (page numbers, stray headings, table scraps) add
/// noise to a vector index without adding recall.
pub fn is_informative(chunk: &str) -> bool {
    chunk.trim().len() > MIN_CHUNK_CHARS
}

/// A bounded segment of a source document.
///
/// The chunk's position in the metadata store is its implicit identifier and
/// must equal its vector's position in the vector index; the struct itself is
/// immutable once created. Serialized as one JSON object per line in the
/// metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Path of the source document, relative to the sources root.
    pub filename: String,
    /// The chunk's text content.
    pub text: String,
}

impl Chunk {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
        }
    }
}

/// Splits text into overlapping, boundary-aware segments.
///
/// `overlap` must be strictly less than `chunk_size`; otherwise the window
/// cannot make forward progress. [`TextSplitter::new`] asserts this.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

impl TextSplitter {
    /// Create a splitter with the given window size and overlap (both in bytes;
    /// offsets are snapped to UTF-8 character boundaries during the split).
    ///
    /// # Panics
    /// Panics if `overlap >= chunk_size` or `chunk_size` is zero.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        assert!(
            overlap < chunk_size,
            "overlap ({overlap}) must be strictly less than chunk_size ({chunk_size})"
        );
        Self {
            chunk_size,
            overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into overlapping segments.
    ///
    /// Starting at offset 0, each window proposes an end at
    /// `start + chunk_size`. If that end falls before the end of the text, the
    /// last [`SEPARATOR_SEARCH_WINDOW`] bytes of the window are searched
    /// backward for the highest-priority separator, and the end moves to just
    /// after it. If no separator is found the unmodified end is used, so a
    /// mid-word split is possible but rare in prose. The next window starts
    /// `overlap` bytes before the previous end, snapped forward to the next
    /// character boundary so the window always advances.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let len = text.len();
        let mut start = 0usize;

        while start < len {
            // Proposed end may run past the text; the emitted slice clamps it
            // but the advance uses the unclamped value so a short tail does
            // not produce a trailing overlap-sized sliver.
            let mut end = start + self.chunk_size;

            if end < len {
                let search_start = floor_char_boundary(
                    text,
                    end.saturating_sub(SEPARATOR_SEARCH_WINDOW).max(start),
                );
                let search_end = floor_char_boundary(text, end);
                for sep in SEPARATORS {
                    if let Some(pos) = text[search_start..search_end].rfind(sep) {
                        end = search_start + pos + sep.len();
                        break;
                    }
                }
                // A separator inside the overlap region would stall the
                // window; fall back to the unmodified end.
                if end <= start + self.overlap {
                    end = start + self.chunk_size;
                }
            }

            let slice_end = floor_char_boundary(text, end.min(len));
            chunks.push(text[start..slice_end].to_string());

            // Snap the next start forward, never backward: rounding
            // down could land on the previous start when a multibyte
            // character straddles it, and the window would never
            // advance. Rounding up also keeps the effective overlap
            // at or below the configured one.
            start = ceil_char_boundary(text, end - self.overlap);
        }

        chunks
    }
}

/// Largest index `<= idx` that lies on a UTF-8 character boundary.
fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest index `>= idx` that lies on a UTF-8 character boundary.
fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
