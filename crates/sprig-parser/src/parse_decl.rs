//! Top-level declarations: functions and extern signatures.

use crate::parser::{ParseError, Parser};
use sprig_lexer::TokenKind;
use sprig_types::ast::{NodeId, NodeKind, TypeName};

impl Parser<'_> {
    /// Parse a whole program: function declarations and `# extern`
    /// signature declarations until end of input.
    ///
    /// Declarations that fail to parse are recorded in the trace and
    /// skipped; the surviving ones still make it into the program node.
    pub fn parse_program(&mut self) -> Result<NodeId, ParseError> {
        let start = self.span();
        let mut decls = Vec::new();
        while !self.at_end() {
            let result = if self.at(&TokenKind::HashSign) {
                self.parse_extern_decl()
            } else {
                self.parse_fundecl()
            };
            match result {
                Ok(decl) => decls.push(decl),
                Err(err) => {
                    self.record(&err);
                    self.synchronize();
                }
            }
        }
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(NodeKind::Program { decls }, span))
    }

    /// `# extern none print(str text);`
    ///
    /// Signature only; the body is provided by the host at VM setup.
    fn parse_extern_decl(&mut self) -> Result<NodeId, ParseError> {
        let start = self.expect(&TokenKind::HashSign)?;
        let (marker, marker_span) = self.expect_symbol("'extern'")?;
        if marker != "extern" {
            return Err(ParseError::new(
                format!("expected 'extern' after '#', found '{marker}'"),
                marker_span,
            ));
        }
        let ret_ty = self.parse_type_name()?;
        let (name, _) = self.expect_symbol("function name")?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::StatementEnd)?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(
            NodeKind::ExternDecl {
                name,
                ret_ty,
                params,
            },
            span,
        ))
    }

    /// `num add(num a, num b) { ... }`
    fn parse_fundecl(&mut self) -> Result<NodeId, ParseError> {
        let start = self.span();
        let ret_ty = self.parse_type_name()?;
        let (name, _) = self.expect_symbol("function name")?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let span = start.merge(self.prev_span());
        Ok(self.ast.push(
            NodeKind::FunDecl {
                name,
                ret_ty,
                params,
                body,
            },
            span,
        ))
    }

    /// `( type name, type name, ... )`
    fn parse_params(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let start = self.span();
                let ty = self.parse_type_name()?;
                let (name, _) = self.expect_symbol("parameter name")?;
                let span = start.merge(self.prev_span());
                params.push(self.ast.push(NodeKind::Param { name, ty }, span));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    /// A type name: `num`, `bol`, `chr`, `str`, `none`, or `T[]`.
    pub(crate) fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let (name, span) = self.expect_symbol("type name")?;
        let base = TypeName::from_name(&name)
            .ok_or_else(|| ParseError::new(format!("unknown type name '{name}'"), span))?;
        if self.at(&TokenKind::LBracket) && *self.look_ahead(1) == TokenKind::RBracket {
            self.advance();
            self.advance();
            return Ok(TypeName::Array(Box::new(base)));
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use sprig_lexer::{tokenize, LexOptions};
    use sprig_types::ast::{NodeKind, TypeName};

    fn parse_ok(source: &str) -> (sprig_types::ast::Ast, sprig_types::ast::NodeId) {
        let tokens = tokenize(source, LexOptions::default()).tokens;
        let out = parse(&tokens);
        assert!(!out.trace.has_errors(), "unexpected errors: {:?}", out.trace);
        (out.ast, out.root.unwrap())
    }

    #[test]
    fn test_extern_decl_shape() {
        let (ast, root) = parse_ok("# extern none print(str text);");
        let NodeKind::Program { decls } = ast.kind(root) else {
            panic!("expected program root");
        };
        assert_eq!(decls.len(), 1);
        match ast.kind(decls[0]) {
            NodeKind::ExternDecl { name, ret_ty, params } => {
                assert_eq!(name, "print");
                assert_eq!(*ret_ty, TypeName::None);
                assert_eq!(params.len(), 1);
            }
            other => panic!("expected extern decl, got {other:?}"),
        }
    }

    #[test]
    fn test_array_type_suffix() {
        let (ast, root) = parse_ok("num sum(num[] values) { return 0; }");
        let NodeKind::Program { decls } = ast.kind(root) else {
            panic!("expected program root");
        };
        let NodeKind::FunDecl { params, .. } = ast.kind(decls[0]) else {
            panic!("expected fundecl");
        };
        match ast.kind(params[0]) {
            NodeKind::Param { ty, .. } => {
                assert_eq!(*ty, TypeName::Array(Box::new(TypeName::Num)));
            }
            other => panic!("expected param, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_decl_is_skipped_but_rest_survives() {
        let source = "num broken( { }\nnum ok() { return 1; }";
        let tokens = tokenize(source, LexOptions::default()).tokens;
        let out = parse(&tokens);
        assert!(out.trace.has_errors());
        let NodeKind::Program { decls } = out.ast.kind(out.root.unwrap()) else {
            panic!("expected program root");
        };
        assert_eq!(decls.len(), 1);
        match out.ast.kind(decls[0]) {
            NodeKind::FunDecl { name, .. } => assert_eq!(name, "ok"),
            other => panic!("expected fundecl, got {other:?}"),
        }
    }
}
