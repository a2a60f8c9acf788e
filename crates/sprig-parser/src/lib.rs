//! sprig parser: recursive descent over the token stream into the AST
//! arena.
//!
//! Syntax errors are recorded as diagnostics and the parser resynchronizes
//! at declaration boundaries, so one bad function does not hide the rest
//! of the file.

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseError, ParseOutput, Parser};

use sprig_lexer::Token;

/// Parse a token stream into an AST.
pub fn parse(tokens: &[Token]) -> ParseOutput {
    let mut parser = Parser::new(tokens);
    let root = match parser.parse_program() {
        Ok(root) => Some(root),
        Err(err) => {
            parser.record(&err);
            None
        }
    };
    parser.finish(root)
}
