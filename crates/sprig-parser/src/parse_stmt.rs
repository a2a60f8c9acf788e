//! Statement productions: blocks, control flow, declarations,
//! assignments.

use crate::parser::{ParseError, Parser};
use sprig_lexer::TokenKind;
use sprig_types::ast::{NodeId, NodeKind};

impl Parser<'_> {
    /// `{ stmt* }`
    pub(crate) fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at_end() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(NodeKind::Block { stmts }, span))
    }

    fn parse_stmt(&mut self) -> Result<NodeId, ParseError> {
        match self.peek() {
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::Symbol(_) if self.starts_var_decl() => self.parse_var_decl(),
            TokenKind::Symbol(_) if *self.look_ahead(1) == TokenKind::Assign => {
                self.parse_assign()
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// A statement beginning `type name =` declares a new variable.
    fn starts_var_decl(&self) -> bool {
        match self.look_ahead(1) {
            TokenKind::Symbol(_) => *self.look_ahead(2) == TokenKind::Assign,
            TokenKind::LBracket => {
                *self.look_ahead(2) == TokenKind::RBracket
                    && matches!(self.look_ahead(3), TokenKind::Symbol(_))
                    && *self.look_ahead(4) == TokenKind::Assign
            }
            _ => false,
        }
    }

    /// `if (cond) { ... } else if (...) { ... } else { ... }`
    fn parse_if(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect(&TokenKind::KwIf)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let then_block = self.parse_block()?;
        let else_branch = if self.eat(&TokenKind::KwElse) {
            if self.at(&TokenKind::KwIf) {
                Some(self.parse_if()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(
            NodeKind::If {
                cond,
                then_block,
                else_branch,
            },
            span,
        ))
    }

    /// `for (num x in expr) { ... }`
    fn parse_for(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect(&TokenKind::KwFor)?;
        self.expect(&TokenKind::LParen)?;
        let var_ty = self.parse_type_name()?;
        let (var_name, _) = self.expect_symbol("loop variable name")?;
        self.expect(&TokenKind::KwIn)?;
        let iterable = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(
            NodeKind::ForEach {
                var_name,
                var_ty,
                iterable,
                body,
            },
            span,
        ))
    }

    /// `return expr;` / `return;`
    fn parse_return(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect(&TokenKind::KwReturn)?;
        let value = if self.at(&TokenKind::StatementEnd) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::StatementEnd)?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(NodeKind::Return { value }, span))
    }

    /// `num x = expr;`
    fn parse_var_decl(&mut self) -> Result<NodeId, ParseError> {
        let start = self.span();
        let ty = self.parse_type_name()?;
        let (name, _) = self.expect_symbol("variable name")?;
        self.expect(&TokenKind::Assign)?;
        let init = self.parse_expr()?;
        self.expect(&TokenKind::StatementEnd)?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(NodeKind::VarDecl { name, ty, init }, span))
    }

    /// `x = expr;`
    fn parse_assign(&mut self) -> Result<NodeId, ParseError> {
        let start = self.span();
        let (name, _) = self.expect_symbol("variable name")?;
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.expect(&TokenKind::StatementEnd)?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(NodeKind::Assign { name, value }, span))
    }

    /// An expression in statement position, e.g. a call.
    fn parse_expr_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.span();
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::StatementEnd)?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(NodeKind::ExprStmt { expr }, span))
    }
}
