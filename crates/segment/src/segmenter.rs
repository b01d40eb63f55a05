use unicode_categories::UnicodeCategories;
use unicode_segmentation::UnicodeSegmentation;

use crate::token::{Token, TokenKind};
use crate::Granularity;

/// Abbreviations whose trailing period never closes a sentence.
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "inc", "ltd", "etc", "vs", "i.e", "e.g",
];

/// Split `text` into an ordered, offset-preserving token sequence.
///
/// The output is deterministic and reversible: concatenating the token texts
/// reproduces `text` byte for byte. Empty input yields no tokens.
pub fn segment(text: &str, granularity: Granularity) -> Vec<Token> {
    match granularity {
        Granularity::Character => segment_chars(text),
        Granularity::Word => segment_words(text),
        Granularity::Sentence => segment_sentences(text),
        Granularity::Paragraph => segment_paragraphs(text),
    }
}

fn segment_chars(text: &str) -> Vec<Token> {
    text.char_indices()
        .map(|(idx, ch)| Token::from_span(text, idx, idx + ch.len_utf8(), TokenKind::Char))
        .collect()
}

fn segment_words(text: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut leading: Option<usize> = None;

    for (offset, piece) in text.split_word_bound_indices() {
        let end = offset + piece.len();
        if piece.chars().all(char::is_whitespace) {
            match tokens.last_mut() {
                Some(last) => last.extend(text, end),
                None => {
                    leading.get_or_insert(offset);
                }
            }
            continue;
        }

        let start = leading.take().unwrap_or(offset);
        let kind = if piece.chars().any(char::is_alphanumeric) {
            TokenKind::Word
        } else {
            TokenKind::Punct
        };
        tokens.push(Token::from_span(text, start, end, kind));
    }

    // Whitespace-only input still has to round-trip.
    if let Some(start) = leading {
        tokens.push(Token::from_span(text, start, text.len(), TokenKind::Word));
    }
    tokens
}

fn segment_paragraphs(text: &str) -> Vec<Token> {
    paragraph_spans(text)
        .into_iter()
        .map(|(start, end)| Token::from_span(text, start, end, TokenKind::Paragraph))
        .collect()
}

fn segment_sentences(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (para_start, para_end) in paragraph_spans(text) {
        let paragraph = &text[para_start..para_end];
        let mut start = 0;
        for boundary in sentence_boundaries(paragraph) {
            tokens.push(Token::from_span(
                text,
                para_start + start,
                para_start + boundary,
                TokenKind::Sentence,
            ));
            start = boundary;
        }
        tokens.push(Token::from_span(
            text,
            para_start + start,
            para_end,
            TokenKind::Sentence,
        ));
    }
    tokens
}

/// Byte spans of paragraphs. A paragraph owns the blank lines that follow it;
/// blank lines before the first paragraph belong to that paragraph.
pub(crate) fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    let mut has_content = false;
    let mut trailing_blank = false;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            trailing_blank |= has_content;
        } else {
            if trailing_blank {
                spans.push((start, offset));
                start = offset;
                trailing_blank = false;
            }
            has_content = true;
        }
        offset += line.len();
    }

    if start < text.len() {
        spans.push((start, text.len()));
    }
    spans
}

/// Byte offsets (relative to `paragraph`) at which a new sentence starts.
///
/// A boundary is a run of terminal punctuation, optional closing quotes or
/// brackets, at least one whitespace character, and then an uppercase letter
/// or an opening quote/bracket. A paragraph without boundaries is one sentence.
fn sentence_boundaries(paragraph: &str) -> Vec<usize> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut boundaries = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if !is_terminal(chars[i].1) {
            i += 1;
            continue;
        }

        let terminal_start = chars[i].0;
        let mut j = i;
        while j < chars.len() && is_terminal(chars[j].1) {
            j += 1;
        }
        while j < chars.len() && is_closing(chars[j].1) {
            j += 1;
        }
        let whitespace_start = j;
        while j < chars.len() && chars[j].1.is_whitespace() {
            j += 1;
        }

        let has_gap = j > whitespace_start;
        if has_gap
            && j < chars.len()
            && opens_sentence(chars[j].1)
            && !ends_with_abbreviation(&paragraph[..terminal_start], chars[i].1)
        {
            boundaries.push(chars[j].0);
        }
        i = j.max(i + 1);
    }
    boundaries
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']')
        || ch.is_punctuation_final_quote()
        || ch.is_punctuation_close()
}

fn opens_sentence(ch: char) -> bool {
    ch.is_uppercase()
        || matches!(ch, '"' | '\'' | '(' | '[')
        || ch.is_punctuation_initial_quote()
        || ch.is_punctuation_open()
}

fn ends_with_abbreviation(before: &str, terminal: char) -> bool {
    if terminal != '.' {
        return false;
    }
    let word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    ABBREVIATIONS
        .iter()
        .any(|abbr| word.eq_ignore_ascii_case(abbr))
}
