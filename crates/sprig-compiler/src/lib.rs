//! sprig compiler: orchestrates the full pipeline.
//!
//! `lex -> parse -> check -> codegen`, accumulating diagnostics from
//! every stage into one [`Trace`]. On any error the returned artifact
//! is the empty program, the uniform "did not compile" signal.

mod checker;
mod ctx;
mod sig;

pub use checker::check;
pub use ctx::TypeCtx;
pub use sig::{FnSig, Sig};

use sprig_lexer::LexOptions;
use sprig_types::{Program, Span, Trace};

/// The result of compiling one source buffer.
#[derive(Debug)]
pub struct CompileOutput {
    /// Empty (not executable) when compilation failed.
    pub program: Program,
    pub trace: Trace,
    /// Collected function signatures, declaration order.
    pub signatures: Vec<FnSig>,
}

impl CompileOutput {
    fn failed(trace: Trace, signatures: Vec<FnSig>) -> Self {
        Self {
            program: Program::empty(),
            trace,
            signatures,
        }
    }
}

/// Compile sprig source text to bytecode.
pub fn compile_source(source: &str) -> CompileOutput {
    let lexed = sprig_lexer::tokenize(source, LexOptions::default());
    let mut trace = lexed.trace;

    let parsed = sprig_parser::parse(&lexed.tokens);
    trace.merge(parsed.trace);
    let Some(root) = parsed.root else {
        return CompileOutput::failed(trace, Vec::new());
    };

    let signatures = checker::check(&parsed.ast, root, &mut trace);
    if trace.has_errors() {
        return CompileOutput::failed(trace, signatures);
    }

    match sprig_codegen::generate(&parsed.ast, root) {
        Ok(program) => CompileOutput {
            program,
            trace,
            signatures,
        },
        Err(err) => {
            trace.push_error(err.to_string(), Span::point(0, 1, 1));
            CompileOutput::failed(trace, signatures)
        }
    }
}
