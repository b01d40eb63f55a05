use serde::{Deserialize, Serialize};

/// What a token represents in the source text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Char,
    Word,
    Punct,
    Sentence,
    Paragraph,
}

/// A contiguous span of a revision plus its UTF-8 byte offsets.
///
/// Tokens produced by [`segment`](crate::segment) tile the source exactly:
/// concatenating every `text` in order yields the original input. Whitespace
/// between units is carried by the preceding token (leading whitespace by the
/// first one), so only [`Token::key`] takes part in comparisons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    /// Exact source text, separators included.
    pub text: String,
    /// Byte offset (inclusive) in the source text.
    pub start: usize,
    /// Byte offset (exclusive) in the source text.
    pub end: usize,
    pub kind: TokenKind,
}

impl Token {
    pub(crate) fn from_span(source: &str, start: usize, end: usize, kind: TokenKind) -> Self {
        Self {
            text: source[start..end].to_string(),
            start,
            end,
            kind,
        }
    }

    /// Comparison key. Characters compare verbatim; coarser units ignore
    /// surrounding whitespace.
    pub fn key(&self) -> &str {
        match self.kind {
            TokenKind::Char => &self.text,
            _ => self.text.trim(),
        }
    }

    /// Length used by every similarity formula: Unicode scalars in the key.
    pub fn weight(&self) -> usize {
        self.key().chars().count()
    }

    pub(crate) fn extend(&mut self, source: &str, end: usize) {
        self.text.push_str(&source[self.end..end]);
        self.end = end;
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.text.as_str()
    }
}

/// Concatenate token texts back into source text.
pub fn reconstruct<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a Token>,
{
    tokens.into_iter().map(|t| t.text.as_str()).collect()
}

/// Sum of [`Token::weight`] over a slice.
pub fn total_weight(tokens: &[Token]) -> usize {
    tokens.iter().map(Token::weight).sum()
}
