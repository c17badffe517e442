// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Segment extraction from generated text.
//!
//! The generation service is asked to produce a short teaching step that ends
//! in a question, but it often keeps going. The extractor cuts the text after
//! the sentence holding the first embedded question so the student sees one
//! question at a time:
//!
//! ```text
//! "Fractions split a whole. What is half of 8? Think it over. What is ..."
//!  └──────────────── segment ────────────────────────────────┘
//! ```
//!
//! Question detection is driven by the phrase table in [`patterns`].

pub mod patterns;

use once_cell::sync::Lazy;
use regex::Regex;

pub use patterns::{PatternScript, QuestionPattern, QUESTION_PATTERNS};

/// Characters that end the sentence fragment following a question.
pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '\n'];

static DEFAULT_EXTRACTOR: Lazy<SegmentExtractor> = Lazy::new(|| {
    SegmentExtractor::with_patterns(QUESTION_PATTERNS)
        .expect("built-in question patterns are valid regexes")
});

/// Result of extracting the leading segment of generated text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    /// Leading text up to and including the sentence with the first question.
    pub segment: String,
    /// Whether a question was found.
    pub has_question: bool,
}

/// Extracts the first question-bearing segment using a phrase table.
#[derive(Debug, Clone)]
pub struct SegmentExtractor {
    patterns: Vec<Regex>,
}

impl SegmentExtractor {
    /// Build an extractor from a custom phrase table.
    pub fn with_patterns(patterns: &[QuestionPattern]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&p.regex_source()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Number of compiled patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Extract the leading segment of `text`.
    ///
    /// The returned segment is always a prefix of the trimmed input.
    pub fn extract(&self, text: &str) -> Segment {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Segment::default();
        }

        // Leftmost match across all patterns.
        let first = self
            .patterns
            .iter()
            .filter_map(|re| re.find(trimmed))
            .min_by_key(|m| m.start());

        let Some(found) = first else {
            return Segment {
                segment: trimmed.to_string(),
                has_question: false,
            };
        };

        let mut end = found.end();
        if let Some(pos) = trimmed[end..].find(SENTENCE_TERMINATORS) {
            // All terminators are single-byte.
            end += pos + 1;
        }

        Segment {
            segment: trimmed[..end].trim_end().to_string(),
            has_question: true,
        }
    }
}

impl Default for SegmentExtractor {
    fn default() -> Self {
        DEFAULT_EXTRACTOR.clone()
    }
}

/// Extract the first segment using the built-in phrase table.
pub fn extract_first_segment(text: &str) -> Segment {
    DEFAULT_EXTRACTOR.extract(text)
}
