//! The sprig lexer.
//!
//! A single forward sweep over the source bytes. Unrecognized
//! characters produce [`TokenKind::Error`] tokens plus a diagnostic and
//! the scan continues, so one bad character never hides the rest of the
//! file. Whitespace and comments are dropped unless the matching
//! [`LexOptions`] flag retains them.

use crate::token::{Token, TokenKind};
use sprig_types::{Span, Trace};

/// Lexer configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexOptions {
    /// Emit [`TokenKind::Space`] tokens for whitespace runs.
    pub include_spaces: bool,
    /// Emit [`TokenKind::Comment`] tokens for `//` comments.
    pub include_comments: bool,
}

/// The outcome of lexing one source buffer.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub trace: Trace,
}

/// Tokenize a source buffer.
///
/// The returned stream always starts with [`TokenKind::Initial`] and
/// ends with [`TokenKind::Final`], even for empty input.
pub fn tokenize(source: &str, options: LexOptions) -> LexResult {
    let mut lexer = Lexer::new(source, options);
    lexer.run();
    LexResult {
        tokens: lexer.tokens,
        trace: lexer.trace,
    }
}

// ─────────────────────────────────────────────────────────────────────
// Lexer
// ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    source: &'a str,
    options: LexOptions,
    pos: usize,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
    trace: Trace,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, options: LexOptions) -> Self {
        Self {
            source,
            options,
            pos: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
            trace: Trace::new(),
        }
    }

    fn run(&mut self) {
        self.push(TokenKind::Initial, self.point_span());
        while let Some(c) = self.peek() {
            let start = self.mark();
            match c {
                c if c.is_whitespace() => self.scan_space(start),
                '/' if self.peek_at(1) == Some('/') => self.scan_comment(start),
                c if c.is_ascii_digit() => self.scan_number(start),
                c if c.is_alphabetic() || c == '_' => self.scan_symbol(start),
                '"' => self.scan_string(start),
                '\'' => self.scan_char(start),
                _ => self.scan_operator(start),
            }
        }
        self.push(TokenKind::Final, self.point_span());
    }

    // ── Cursor ───────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Consume the next char when it matches.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            return true;
        }
        false
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    fn span_from(&self, start: Mark) -> Span {
        Span::new(
            start.pos as u32,
            (self.pos - start.pos) as u32,
            start.line,
            start.col,
        )
    }

    fn point_span(&self) -> Span {
        Span::point(self.pos as u32, self.line, self.col)
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }

    // ── Lexeme scanners ──────────────────────────────────────

    fn scan_space(&mut self, start: Mark) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
        if self.options.include_spaces {
            let span = self.span_from(start);
            self.push(TokenKind::Space, span);
        }
    }

    fn scan_comment(&mut self, start: Mark) {
        self.bump();
        self.bump();
        let text_start = self.pos;
        while matches!(self.peek(), Some(c) if c != '\n') {
            self.bump();
        }
        if self.options.include_comments {
            let text = self.source[text_start..self.pos].to_string();
            let span = self.span_from(start);
            self.push(TokenKind::Comment(text), span);
        }
    }

    fn scan_number(&mut self, start: Mark) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        // Fractional part only when a digit follows the dot.
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let span = self.span_from(start);
        let text = &self.source[start.pos..self.pos];
        match text.parse::<f64>() {
            Ok(n) => self.push(TokenKind::Number(n), span),
            Err(_) => {
                self.trace
                    .push_error(format!("malformed number literal '{text}'"), span);
                self.push(TokenKind::Error('0'), span);
            }
        }
    }

    fn scan_symbol(&mut self, start: Mark) {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        let text = &self.source[start.pos..self.pos];
        let span = self.span_from(start);
        let kind = TokenKind::from_keyword(text)
            .unwrap_or_else(|| TokenKind::Symbol(text.to_string()));
        self.push(kind, span);
    }

    fn scan_string(&mut self, start: Mark) {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.scan_escape() {
                    Some(c) => text.push(c),
                    None => {
                        let span = self.span_from(start);
                        self.trace.push_error("invalid escape sequence", span);
                    }
                },
                Some('\n') | None => {
                    let span = self.span_from(start);
                    self.trace.push_error("unterminated string literal", span);
                    break;
                }
                Some(c) => text.push(c),
            }
        }
        let span = self.span_from(start);
        self.push(TokenKind::String(text), span);
    }

    fn scan_char(&mut self, start: Mark) {
        self.bump(); // opening quote
        let c = match self.bump() {
            Some('\\') => self.scan_escape(),
            Some('\'') | Some('\n') | None => None,
            Some(c) => Some(c),
        };
        let closed = self.eat('\'');
        let span = self.span_from(start);
        match c {
            Some(c) if closed => self.push(TokenKind::Char(c), span),
            _ => {
                self.trace.push_error("malformed char literal", span);
                self.push(TokenKind::Error('\''), span);
            }
        }
    }

    fn scan_escape(&mut self) -> Option<char> {
        match self.bump() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('\\') => Some('\\'),
            Some('"') => Some('"'),
            Some('\'') => Some('\''),
            Some('0') => Some('\0'),
            _ => None,
        }
    }

    fn scan_operator(&mut self, start: Mark) {
        let c = match self.bump() {
            Some(c) => c,
            None => return,
        };
        let kind = match c {
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' => TokenKind::Assign,
            '<' if self.eat('=') => TokenKind::LtEq,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::GtEq,
            '>' => TokenKind::Gt,
            '!' if self.eat('=') => TokenKind::BangEq,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::StatementEnd,
            '#' => TokenKind::HashSign,
            other => {
                let span = self.span_from(start);
                self.trace
                    .push_error(format!("unrecognized character '{other}'"), span);
                TokenKind::Error(other)
            }
        };
        let span = self.span_from(start);
        self.push(kind, span);
    }
}

#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: u32,
    col: u32,
}
