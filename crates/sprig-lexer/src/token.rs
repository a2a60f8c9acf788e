//! Token types for the sprig lexer.
//!
//! Defines [`TokenKind`] covering every lexeme in the language and
//! [`Token`], which pairs a kind with a source [`Span`].

use sprig_types::Span;
use std::fmt;

/// Reserved words. These cannot be used as user-defined names.
///
/// Type names (`num`, `bol`, `chr`, `str`, `none`) are deliberately not
/// reserved; they lex as symbols and the parser interprets them.
pub const KEYWORDS: &[&str] = &[
    "if", "else", "for", "in", "return", "fun", "and", "or", "not", "true", "false",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the sprig lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the sprig language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Stream start sentinel.
    Initial,
    /// Stream end sentinel.
    Final,

    // ── Literals & Names ─────────────────────────────────────

    /// Identifier or type name: `total`, `num`
    Symbol(String),
    /// Numeric literal: `42`, `3.14`
    Number(f64),
    /// `true` / `false`
    Boolean(bool),
    /// Double-quoted string literal, escapes resolved.
    String(String),
    /// Single-quoted char literal.
    Char(char),

    // ── Keywords ─────────────────────────────────────────────

    /// `if`
    KwIf,
    /// `else`
    KwElse,
    /// `for`
    KwFor,
    /// `in`
    KwIn,
    /// `return`
    KwReturn,
    /// `fun` (reserved, unused by the current grammar)
    KwFun,
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,

    // ── Operators ────────────────────────────────────────────

    /// `=`
    Assign,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,

    // ── Punctuation ──────────────────────────────────────────

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `;`
    StatementEnd,
    /// `#` (introduces extern declarations)
    HashSign,

    // ── Trivia (only with the matching LexOptions flag) ──────

    /// A run of whitespace.
    Space,
    /// A `//` comment, text without the marker.
    Comment(String),

    /// An unrecognized character; the scan continues after it.
    Error(char),
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for user symbols.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "for" => TokenKind::KwFor,
            "in" => TokenKind::KwIn,
            "return" => TokenKind::KwReturn,
            "fun" => TokenKind::KwFun,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Initial => f.write_str("start of input"),
            TokenKind::Final => f.write_str("end of input"),
            TokenKind::Symbol(s) => f.write_str(s),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Boolean(b) => write!(f, "{b}"),
            TokenKind::String(s) => write!(f, "\"{s}\""),
            TokenKind::Char(c) => write!(f, "'{c}'"),
            TokenKind::KwIf => f.write_str("if"),
            TokenKind::KwElse => f.write_str("else"),
            TokenKind::KwFor => f.write_str("for"),
            TokenKind::KwIn => f.write_str("in"),
            TokenKind::KwReturn => f.write_str("return"),
            TokenKind::KwFun => f.write_str("fun"),
            TokenKind::And => f.write_str("and"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Not => f.write_str("not"),
            TokenKind::Assign => f.write_str("="),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Lt => f.write_str("<"),
            TokenKind::Gt => f.write_str(">"),
            TokenKind::LtEq => f.write_str("<="),
            TokenKind::GtEq => f.write_str(">="),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::StatementEnd => f.write_str(";"),
            TokenKind::HashSign => f.write_str("#"),
            TokenKind::Space => f.write_str("space"),
            TokenKind::Comment(_) => f.write_str("comment"),
            TokenKind::Error(c) => write!(f, "unrecognized character '{c}'"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keyword_recognises_all() {
        for &kw in KEYWORDS {
            assert!(
                TokenKind::from_keyword(kw).is_some(),
                "from_keyword should recognise '{kw}'"
            );
        }
    }

    #[test]
    fn test_from_keyword_returns_none_for_symbols() {
        for name in ["foo", "iff", "num", "str", "Return", "IF", "fortune"] {
            assert!(
                TokenKind::from_keyword(name).is_none(),
                "from_keyword should not recognise '{name}'"
            );
        }
    }

    #[test]
    fn test_booleans_classified_by_exact_match() {
        assert_eq!(
            TokenKind::from_keyword("true"),
            Some(TokenKind::Boolean(true))
        );
        assert_eq!(
            TokenKind::from_keyword("false"),
            Some(TokenKind::Boolean(false))
        );
        assert_eq!(TokenKind::from_keyword("True"), None);
        assert_eq!(TokenKind::from_keyword("truex"), None);
    }

    #[test]
    fn test_display_matches_source_text() {
        assert_eq!(TokenKind::KwIf.to_string(), "if");
        assert_eq!(TokenKind::EqEq.to_string(), "==");
        assert_eq!(TokenKind::StatementEnd.to_string(), ";");
        assert_eq!(TokenKind::HashSign.to_string(), "#");
        assert_eq!(TokenKind::Symbol("x".into()).to_string(), "x");
    }
}
