//! Revision segmentation.
//!
//! Splits raw revision text into an ordered token sequence at a requested
//! [`Granularity`]. This is the first stage of every comparison and the only
//! place that touches raw text offsets.
//!
//! ## Guarantees
//!
//! - **Reversible**: concatenating token texts reproduces the input exactly.
//!   Separators are never dropped; whitespace rides on the preceding token.
//! - **Offset-preserving**: every token records its UTF-8 byte span.
//! - **Deterministic**: no locale, clock or I/O dependence.
//!
//! ## Granularities
//!
//! - `character`: one token per Unicode scalar value
//! - `word`: Unicode word boundaries, punctuation kept as separate tokens
//! - `sentence`: terminal punctuation followed by whitespace and an uppercase
//!   letter or opening quote; a paragraph with no boundary is one sentence
//! - `paragraph`: runs of blank lines
//!
//! Alignment compares [`Token::key`], which trims surrounding whitespace for
//! everything coarser than characters.

mod error;
mod granularity;
mod intern;
mod segmenter;
mod skeleton;
mod token;

pub use crate::error::SegmentError;
pub use crate::granularity::Granularity;
pub use crate::intern::KeyInterner;
pub use crate::segmenter::segment;
pub use crate::skeleton::{is_heading_line, skeleton, SkeletonElement};
pub use crate::token::{reconstruct, total_weight, Token, TokenKind};
