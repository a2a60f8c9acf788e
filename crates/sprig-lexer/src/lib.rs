//! sprig lexer: turns source text into a token stream.
//!
//! The stream is always bracketed by [`TokenKind::Initial`] and
//! [`TokenKind::Final`] sentinels so downstream cursors never need
//! bounds special-cases.

mod lexer;
mod token;

pub use lexer::{tokenize, LexOptions, LexResult};
pub use token::{Token, TokenKind, KEYWORDS};
