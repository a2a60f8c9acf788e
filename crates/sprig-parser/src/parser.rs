//! Parser cursor infrastructure.
//!
//! [`Parser`] owns a position into the token slice, the AST arena being
//! built, and the diagnostic trace. The grammar productions live in
//! `parse_decl.rs`, `parse_stmt.rs`, and `parse_expr.rs`.

use sprig_lexer::{Token, TokenKind};
use sprig_types::ast::{Ast, NodeId};
use sprig_types::{Span, Trace};
use thiserror::Error;

/// A syntax error carrying the offending location.
///
/// Productions propagate these with `?`; the declaration loop converts
/// them into trace diagnostics and resynchronizes.
#[derive(Debug, Clone, Error)]
#[error("{span}: {message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// The outcome of parsing one token stream.
#[derive(Debug)]
pub struct ParseOutput {
    pub ast: Ast,
    /// The `Program` node, absent when nothing usable was parsed.
    pub root: Option<NodeId>,
    pub trace: Trace,
}

/// Recursive-descent parser over a token slice.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    pub(crate) ast: Ast,
    pub(crate) trace: Trace,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned at the first meaningful token.
    pub fn new(tokens: &'a [Token]) -> Self {
        let mut parser = Self {
            tokens,
            pos: 0,
            ast: Ast::new(),
            trace: Trace::new(),
        };
        if parser.at(&TokenKind::Initial) {
            parser.pos += 1;
        }
        parser.settle();
        parser
    }

    /// Record an error into the trace.
    pub fn record(&mut self, err: &ParseError) {
        self.trace.push_error(err.message.clone(), err.span);
    }

    /// Finish parsing and hand back the arena and trace.
    pub fn finish(self, root: Option<NodeId>) -> ParseOutput {
        ParseOutput {
            ast: self.ast,
            root,
            trace: self.trace,
        }
    }

    // ── Cursor ───────────────────────────────────────────────

    /// Skip trivia tokens so `peek` always sees something meaningful.
    fn settle(&mut self) {
        while matches!(
            self.tokens.get(self.pos).map(|t| &t.kind),
            Some(TokenKind::Space) | Some(TokenKind::Comment(_))
        ) {
            self.pos += 1;
        }
    }

    /// The current token kind. `Final` once the stream is exhausted.
    pub(crate) fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Final)
    }

    /// Look ahead `n` meaningful tokens past the current one.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        let mut pos = self.pos;
        let mut remaining = n;
        while remaining > 0 {
            pos += 1;
            while matches!(
                self.tokens.get(pos).map(|t| &t.kind),
                Some(TokenKind::Space) | Some(TokenKind::Comment(_))
            ) {
                pos += 1;
            }
            remaining -= 1;
        }
        self.tokens
            .get(pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Final)
    }

    /// The current token's span.
    pub(crate) fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .or_else(|| self.tokens.last().map(|t| t.span))
            .unwrap_or(Span::point(0, 1, 1))
    }

    /// The span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        let mut pos = self.pos;
        while pos > 0 {
            pos -= 1;
            let t = &self.tokens[pos];
            if !matches!(t.kind, TokenKind::Space | TokenKind::Comment(_)) {
                return t.span;
            }
        }
        self.span()
    }

    /// Consume and return the current token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Final, self.span()));
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        self.settle();
        token
    }

    /// Whether the current token matches exactly.
    pub(crate) fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    /// Consume the current token when it matches.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            return true;
        }
        false
    }

    /// Consume a token of the given kind or fail.
    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        if self.at(kind) {
            Ok(self.advance().span)
        } else {
            Err(ParseError::new(
                format!("expected '{kind}', found '{}'", self.peek()),
                self.span(),
            ))
        }
    }

    /// Consume a symbol token and return its text.
    pub(crate) fn expect_symbol(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            TokenKind::Symbol(_) => {
                let token = self.advance();
                match token.kind {
                    TokenKind::Symbol(name) => Ok((name, token.span)),
                    _ => unreachable!("peeked a symbol"),
                }
            }
            other => Err(ParseError::new(
                format!("expected {what}, found '{other}'"),
                self.span(),
            )),
        }
    }

    /// Whether the stream is exhausted.
    pub(crate) fn at_end(&self) -> bool {
        self.at(&TokenKind::Final)
    }

    /// Skip forward to a likely declaration boundary after an error.
    ///
    /// Stops just past the next closing brace, or at end of input.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            if self.eat(&TokenKind::RBrace) {
                return;
            }
            self.advance();
        }
    }
}
