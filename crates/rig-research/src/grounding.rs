//! Grounding metadata and citation resolution
//!
//! A search-grounded generation returns text plus metadata describing which
//! retrieved documents (chunks) support which character spans (supports).
//! The functions here turn that metadata into short references, citation
//! records and citation-annotated text:
//!
//! ```text
//! chunks ──resolve_short_references──► uri → short reference
//!    │                                        │
//! supports ─────────build_citations───────────┘──► Vec<Citation>
//!                                                      │
//! text ────────────────insert_markers──────────────────┘──► annotated text
//! ```
//!
//! Offsets are byte offsets into the generated UTF-8 text, as reported by the
//! service. The wire types follow the Gemini `groundingMetadata` JSON shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Prefix of every short reference handed to the model in annotated text.
pub const SHORT_REFERENCE_PREFIX: &str = "https://vertexaisearch.cloud.google.com/id/";

/// Grounding metadata attached to the first response candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    pub grounding_supports: Vec<GroundingSupport>,
}

impl GroundingMetadata {
    pub fn new(chunks: Vec<GroundingChunk>, supports: Vec<GroundingSupport>) -> Self {
        Self {
            grounding_chunks: chunks,
            grounding_supports: supports,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grounding_chunks.is_empty() && self.grounding_supports.is_empty()
    }
}

/// One retrieved document reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: WebSource,
}

impl GroundingChunk {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            web: WebSource {
                uri: uri.into(),
                title: title.into(),
            },
        }
    }

    pub fn uri(&self) -> &str {
        &self.web.uri
    }

    pub fn title(&self) -> &str {
        &self.web.title
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

/// A span of generated text and the chunks that support it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    #[serde(default)]
    pub segment: TextSegment,
    #[serde(default)]
    pub grounding_chunk_indices: Vec<i64>,
}

impl GroundingSupport {
    pub fn new(start_index: usize, end_index: usize, chunk_indices: Vec<i64>) -> Self {
        Self {
            segment: TextSegment {
                start_index,
                end_index,
            },
            grounding_chunk_indices: chunk_indices,
        }
    }

    /// The service reports `0..0` for supports it could not place.
    fn is_degenerate(&self) -> bool {
        self.segment.start_index == 0 && self.segment.end_index == 0
    }
}

/// The service omits `startIndex` when it is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub end_index: usize,
}

/// A citation to splice into generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub start_index: usize,
    pub end_index: usize,
    pub segments: Vec<CitationSegment>,
}

/// One cited document within a citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSegment {
    /// Chunk title without its extension suffix
    pub label: String,
    /// Short reference substituted into the text
    pub short_url: String,
    /// Canonical URI of the chunk
    pub value: String,
}

impl CitationSegment {
    /// Markdown link marker inserted after the cited span.
    pub fn marker(&self) -> String {
        format!(" [{}]({})", self.label, self.short_url)
    }
}

/// Build the short reference for the `position`-th distinct URI of `round`.
pub fn short_reference(round: usize, position: usize) -> String {
    format!("{SHORT_REFERENCE_PREFIX}{round}-{position}")
}

/// Assign each distinct chunk URI a deterministic short reference.
///
/// The first occurrence of a URI wins; later duplicates share its reference.
/// Positions count distinct URIs in input order, so calling this twice on the
/// same chunks and round yields the same map.
pub fn resolve_short_references(chunks: &[GroundingChunk], round: usize) -> HashMap<String, String> {
    let mut resolved = HashMap::new();

    for chunk in chunks {
        if !resolved.contains_key(chunk.uri()) {
            let reference = short_reference(round, resolved.len());
            resolved.insert(chunk.uri().to_string(), reference);
        }
    }

    resolved
}

/// Title up to the first `.`, or the whole title when it has none.
fn chunk_label(title: &str) -> &str {
    title.split_once('.').map_or(title, |(head, _)| head)
}

/// Turn grounding supports into citation records.
///
/// Degenerate `0..0` supports are dropped. Chunk indices that are negative,
/// out of range, or whose URI has no short reference are skipped silently.
pub fn build_citations(
    supports: &[GroundingSupport],
    chunks: &[GroundingChunk],
    short_references: &HashMap<String, String>,
) -> Vec<Citation> {
    supports
        .iter()
        .filter(|support| !support.is_degenerate())
        .map(|support| {
            let segments = support
                .grounding_chunk_indices
                .iter()
                .filter_map(|&index| usize::try_from(index).ok())
                .filter_map(|index| chunks.get(index))
                .filter_map(|chunk| {
                    short_references.get(chunk.uri()).map(|short_url| CitationSegment {
                        label: chunk_label(chunk.title()).to_string(),
                        short_url: short_url.clone(),
                        value: chunk.uri().to_string(),
                    })
                })
                .collect();

            Citation {
                start_index: support.segment.start_index,
                end_index: support.segment.end_index,
                segments,
            }
        })
        .collect()
}

/// Clamp `index` to the text and move it back onto a char boundary.
fn splice_point(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Insert citation markers into `text`.
///
/// Citations are applied highest end offset first (ties: highest start first)
/// so an insertion never shifts an offset that is still to be processed.
pub fn insert_markers(text: &str, citations: &[Citation]) -> String {
    let mut ordered: Vec<&Citation> = citations.iter().collect();
    ordered.sort_by(|a, b| {
        b.end_index
            .cmp(&a.end_index)
            .then_with(|| b.start_index.cmp(&a.start_index))
    });

    let mut annotated = text.to_string();
    for citation in ordered {
        let markers: String = citation.segments.iter().map(CitationSegment::marker).collect();
        let at = splice_point(&annotated, citation.end_index);
        annotated.insert_str(at, &markers);
    }

    annotated
}
