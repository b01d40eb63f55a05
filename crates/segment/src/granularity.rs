use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SegmentError;

/// Unit size at which two revisions are tokenized before alignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One token per Unicode scalar value.
    Character,
    /// Words and individual punctuation marks.
    #[default]
    Word,
    /// Sentences, split on terminal punctuation.
    Sentence,
    /// Paragraphs, split on blank-line runs.
    Paragraph,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Character,
        Granularity::Word,
        Granularity::Sentence,
        Granularity::Paragraph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Character => "character",
            Granularity::Word => "word",
            Granularity::Sentence => "sentence",
            Granularity::Paragraph => "paragraph",
        }
    }

    /// Whether units at this size are long enough for embedding similarity.
    pub fn supports_semantic(self) -> bool {
        matches!(self, Granularity::Sentence | Granularity::Paragraph)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = SegmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str() == value)
            .ok_or_else(|| SegmentError::UnknownGranularity(value.to_string()))
    }
}
