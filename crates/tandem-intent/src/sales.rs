//! Day splitting for sales conversations.
//!
//! A conversation is a block of text where each day opens with a
//! `Day <N>:` marker at the start of a line. Everything up to the next
//! marker belongs to that day; text before the first marker is ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Marker that opens a day. Case-sensitive, line starts only.
pub const DAY_MARKER_PATTERN: &str = r"(?m)^Day \d+:";

/// Characters of a chunk kept in its report preview.
pub const PREVIEW_CHARS: usize = 100;

/// One day of a sales conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayChunk {
    /// The marker itself, e.g. `"Day 2:"`.
    pub day: String,
    /// Trimmed text between this marker and the next.
    pub content: String,
}

impl DayChunk {
    /// The first [`PREVIEW_CHARS`] characters of the content followed by
    /// `"..."`.
    pub fn preview(&self) -> String {
        let head: String = self.content.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

/// Splits conversations on [`DAY_MARKER_PATTERN`].
#[derive(Debug, Clone)]
pub struct DaySplitter {
    marker: Regex,
}

impl DaySplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            marker: Regex::new(DAY_MARKER_PATTERN)?,
        })
    }

    /// Split `text` into day chunks, in order. No markers, no chunks.
    pub fn split(&self, text: &str) -> Vec<DayChunk> {
        let markers: Vec<_> = self.marker.find_iter(text).collect();

        markers
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
                DayChunk {
                    day: m.as_str().to_owned(),
                    content: text[m.end()..end].trim().to_owned(),
                }
            })
            .collect()
    }
}
