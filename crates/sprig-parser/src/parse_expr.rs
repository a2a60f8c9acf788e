//! Expression productions.
//!
//! Fixed precedence, loosest first:
//! `or` < `and` < equality < relational < additive < multiplicative <
//! unary < primary. Parentheses reset the chain.

use crate::parser::{ParseError, Parser};
use sprig_lexer::TokenKind;
use sprig_types::ast::{BinOpKind, NodeId, NodeKind, UnOpKind};

impl Parser<'_> {
    pub(crate) fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = self.binop(BinOpKind::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_equality()?;
            lhs = self.binop(BinOpKind::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinOpKind::Eq,
                TokenKind::BangEq => BinOpKind::Neq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = self.binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinOpKind::Lt,
                TokenKind::LtEq => BinOpKind::LtEq,
                TokenKind::Gt => BinOpKind::Gt,
                TokenKind::GtEq => BinOpKind::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = self.binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOpKind::Add,
                TokenKind::Minus => BinOpKind::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOpKind::Mul,
                TokenKind::Slash => BinOpKind::Div,
                TokenKind::Percent => BinOpKind::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = self.binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        let op = match self.peek() {
            TokenKind::Minus => UnOpKind::Neg,
            TokenKind::Not => UnOpKind::Not,
            _ => return self.parse_primary(),
        };
        let start = self.span();
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(self.ast.span(operand));
        Ok(self.ast.push(NodeKind::UnOp { op, operand }, span))
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(self.ast.push(NodeKind::NumberLit(n), span))
            }
            TokenKind::Boolean(b) => {
                self.advance();
                Ok(self.ast.push(NodeKind::BoolLit(b), span))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(self.ast.push(NodeKind::CharLit(c), span))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(self.ast.push(NodeKind::StringLit(s), span))
            }
            TokenKind::LBracket => self.parse_array_lit(),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Symbol(name) => {
                self.advance();
                if self.at(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    let span = span.merge(self.prev_span());
                    Ok(self.ast.push(NodeKind::Call { name, args }, span))
                } else {
                    Ok(self.ast.push(NodeKind::VarRef { name }, span))
                }
            }
            other => Err(ParseError::new(
                format!("expected expression, found '{other}'"),
                span,
            )),
        }
    }

    /// `[a, b, c]`
    fn parse_array_lit(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect(&TokenKind::LBracket)?;
        let mut elems = Vec::new();
        if !self.at(&TokenKind::RBracket) {
            loop {
                elems.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(NodeKind::ArrayLit { elems }, span))
    }

    /// `(a, b, c)`
    fn parse_args(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn binop(&mut self, op: BinOpKind, lhs: NodeId, rhs: NodeId) -> NodeId {
        let span = self.ast.span(lhs).merge(self.ast.span(rhs));
        self.ast.push(NodeKind::BinOp { op, lhs, rhs }, span)
    }
}
