//! The sprig type checker.
//!
//! A single recursive pass over the AST in declaration order. A
//! function's signature is registered before its own body is checked,
//! so a body may call the function itself or anything declared above
//! it, never a later declaration. Bodies are checked against a
//! [`TypeCtx`] that is cloned when entering if/else arms and loop
//! bodies. Errors land in the shared [`Trace`] and checking continues
//! best-effort with [`Sig::Error`] to keep one mistake from producing
//! a cascade.

use crate::ctx::TypeCtx;
use crate::sig::{FnSig, Sig};
use sprig_types::ast::{Ast, BinOpKind, NodeId, NodeKind, UnOpKind};
use sprig_types::Trace;

/// Type-check a parsed program.
///
/// Returns the collected function signatures in declaration order;
/// errors are pushed into `trace`.
pub fn check(ast: &Ast, root: NodeId, trace: &mut Trace) -> Vec<FnSig> {
    let mut checker = Checker {
        ast,
        trace,
        funcs: Vec::new(),
    };
    checker.run(root);
    checker.funcs
}

struct Checker<'a> {
    ast: &'a Ast,
    trace: &'a mut Trace,
    funcs: Vec<FnSig>,
}

impl Checker<'_> {
    fn run(&mut self, root: NodeId) {
        let NodeKind::Program { decls } = self.ast.kind(root) else {
            return;
        };

        // Declaration order is binding: a signature is registered just
        // before its own body, so calls resolve against the current
        // function and everything declared above it only.
        for &decl in decls {
            let (name, ret_ty, params) = match self.ast.kind(decl) {
                NodeKind::FunDecl {
                    name,
                    ret_ty,
                    params,
                    ..
                }
                | NodeKind::ExternDecl {
                    name,
                    ret_ty,
                    params,
                } => (name, ret_ty, params),
                _ => continue,
            };
            if self.find_fn(name).is_some() {
                self.trace.push_error(
                    format!("function '{name}' already declared"),
                    self.ast.span(decl),
                );
                continue;
            }
            let param_sigs = params
                .iter()
                .map(|&p| match self.ast.kind(p) {
                    NodeKind::Param { ty, .. } => Sig::from(ty),
                    _ => Sig::Error,
                })
                .collect();
            self.funcs
                .push(FnSig::new(name.clone(), param_sigs, Sig::from(ret_ty)));

            if let NodeKind::FunDecl {
                ret_ty,
                params,
                body,
                ..
            } = self.ast.kind(decl)
            {
                self.check_function(ret_ty.into(), params, *body);
            }
        }
    }

    fn find_fn(&self, name: &str) -> Option<&FnSig> {
        self.funcs.iter().find(|f| f.name == name)
    }

    fn check_function(&mut self, ret: Sig, params: &[NodeId], body: NodeId) {
        let mut ctx = TypeCtx::new();
        for &param in params {
            let NodeKind::Param { name, ty } = self.ast.kind(param) else {
                continue;
            };
            if !ctx.insert(name, Sig::from(ty)) {
                self.trace.push_error(
                    format!("parameter '{name}' already declared"),
                    self.ast.span(param),
                );
            }
        }
        self.check_block(body, &mut ctx, &ret);
    }

    // ── Statements ───────────────────────────────────────────

    /// Check a block's statements against the given context. The caller
    /// decides whether `ctx` is shared or a branch clone.
    fn check_block(&mut self, block: NodeId, ctx: &mut TypeCtx, ret: &Sig) {
        let NodeKind::Block { stmts } = self.ast.kind(block) else {
            return;
        };
        for &stmt in stmts {
            self.check_stmt(stmt, ctx, ret);
        }
    }

    fn check_stmt(&mut self, stmt: NodeId, ctx: &mut TypeCtx, ret: &Sig) {
        let span = self.ast.span(stmt);
        match self.ast.kind(stmt) {
            NodeKind::VarDecl { name, ty, init } => {
                let declared = Sig::from(ty);
                let actual = self.infer(*init, ctx);
                if !declared.matches(&actual) {
                    self.trace.push_error(
                        format!(
                            "type mismatch: '{name}' declared as {declared} but initialized with {actual}"
                        ),
                        span,
                    );
                }
                if !ctx.insert(name, declared) {
                    self.trace
                        .push_error(format!("variable '{name}' already declared"), span);
                }
            }
            NodeKind::Assign { name, value } => {
                let actual = self.infer(*value, ctx);
                match ctx.lookup(name).cloned() {
                    Some(expected) => {
                        if !expected.matches(&actual) {
                            self.trace.push_error(
                                format!(
                                    "type mismatch: cannot assign {actual} to '{name}' of signature {expected}"
                                ),
                                span,
                            );
                        }
                    }
                    None => {
                        self.trace
                            .push_error(format!("unknown variable '{name}'"), span);
                    }
                }
            }
            NodeKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                let cond_sig = self.infer(*cond, ctx);
                if !cond_sig.matches(&Sig::Bool) {
                    self.trace.push_error(
                        format!("condition must be b, found {cond_sig}"),
                        self.ast.span(*cond),
                    );
                }
                let mut then_ctx = ctx.clone();
                self.check_block(*then_block, &mut then_ctx, ret);
                if let Some(else_node) = else_branch {
                    if matches!(self.ast.kind(*else_node), NodeKind::Block { .. }) {
                        let mut else_ctx = ctx.clone();
                        self.check_block(*else_node, &mut else_ctx, ret);
                    } else {
                        // else-if chain: the nested If clones for its own arms.
                        self.check_stmt(*else_node, ctx, ret);
                    }
                }
            }
            NodeKind::ForEach {
                var_name,
                var_ty,
                iterable,
                body,
            } => {
                let iter_sig = self.infer(*iterable, ctx);
                let elem = match &iter_sig {
                    Sig::Array(inner) => inner.as_ref().clone(),
                    Sig::Error => Sig::Error,
                    Sig::Mixed => {
                        self.trace.push_error(
                            "cannot iterate over a mixed array",
                            self.ast.span(*iterable),
                        );
                        Sig::Error
                    }
                    other => {
                        self.trace.push_error(
                            format!("cannot iterate value of signature {other}"),
                            self.ast.span(*iterable),
                        );
                        Sig::Error
                    }
                };
                let declared = Sig::from(var_ty);
                if !declared.matches(&elem) {
                    self.trace.push_error(
                        format!(
                            "loop variable '{var_name}' declared as {declared} but elements are {elem}"
                        ),
                        span,
                    );
                }
                let mut body_ctx = ctx.clone();
                if !body_ctx.insert(var_name, declared) {
                    self.trace.push_error(
                        format!("variable '{var_name}' already declared"),
                        span,
                    );
                }
                self.check_block(*body, &mut body_ctx, ret);
            }
            NodeKind::Return { value } => {
                let actual = match value {
                    Some(expr) => self.infer(*expr, ctx),
                    None => Sig::None,
                };
                if !ret.matches(&actual) {
                    self.trace.push_error(
                        format!("return signature mismatch: expected {ret}, found {actual}"),
                        span,
                    );
                }
            }
            NodeKind::ExprStmt { expr } => {
                // The value is discarded whatever its signature.
                self.infer(*expr, ctx);
            }
            NodeKind::Block { .. } => {
                let mut inner = ctx.clone();
                self.check_block(stmt, &mut inner, ret);
            }
            _ => {}
        }
    }

    // ── Expressions ──────────────────────────────────────────

    fn infer(&mut self, expr: NodeId, ctx: &TypeCtx) -> Sig {
        let span = self.ast.span(expr);
        match self.ast.kind(expr) {
            NodeKind::NumberLit(_) => Sig::Float,
            NodeKind::BoolLit(_) => Sig::Bool,
            NodeKind::CharLit(_) => Sig::Char,
            NodeKind::StringLit(_) => Sig::Array(Box::new(Sig::Char)),
            NodeKind::ArrayLit { elems } => {
                let sigs: Vec<Sig> = elems
                    .clone()
                    .iter()
                    .map(|&e| self.infer(e, ctx))
                    .collect();
                Sig::fold_array(&sigs)
            }
            NodeKind::VarRef { name } => match ctx.lookup(name) {
                Some(sig) => sig.clone(),
                None => {
                    self.trace
                        .push_error(format!("unknown variable '{name}'"), span);
                    Sig::Error
                }
            },
            NodeKind::UnOp { op, operand } => {
                let (op, operand) = (*op, *operand);
                let sig = self.infer(operand, ctx);
                if sig == Sig::Error {
                    return Sig::Error;
                }
                match unop_rule(op, &sig) {
                    Some(result) => result,
                    None => {
                        self.trace.push_error(
                            format!("operator '{}' is not defined for {sig}", op.symbol()),
                            span,
                        );
                        Sig::Error
                    }
                }
            }
            NodeKind::BinOp { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                let lhs_sig = self.infer(lhs, ctx);
                let rhs_sig = self.infer(rhs, ctx);
                if lhs_sig == Sig::Error || rhs_sig == Sig::Error {
                    return Sig::Error;
                }
                match binop_rule(op, &lhs_sig, &rhs_sig) {
                    Some(result) => result,
                    None => {
                        self.trace.push_error(
                            format!(
                                "operator '{}' is not defined for {lhs_sig} and {rhs_sig}",
                                op.symbol()
                            ),
                            span,
                        );
                        Sig::Error
                    }
                }
            }
            NodeKind::Call { name, args } => {
                let name = name.clone();
                let arg_sigs: Vec<Sig> = args
                    .clone()
                    .iter()
                    .map(|&a| self.infer(a, ctx))
                    .collect();
                let Some(fn_sig) = self.find_fn(&name).cloned() else {
                    self.trace
                        .push_error(format!("unknown function '{name}'"), span);
                    return Sig::Error;
                };
                if fn_sig.params.len() != arg_sigs.len() {
                    self.trace.push_error(
                        format!(
                            "wrong number of arguments to '{name}': expected {}, found {}",
                            fn_sig.params.len(),
                            arg_sigs.len()
                        ),
                        span,
                    );
                    return fn_sig.ret;
                }
                for (i, (param, arg)) in fn_sig.params.iter().zip(&arg_sigs).enumerate() {
                    if !param.matches(arg) {
                        self.trace.push_error(
                            format!(
                                "argument {} of '{name}' expects {param}, found {arg}",
                                i + 1
                            ),
                            span,
                        );
                    }
                }
                fn_sig.ret
            }
            _ => Sig::Error,
        }
    }
}

// ── Operator rules ───────────────────────────────────────────

/// Built-in binary operator rule table. Operators resolve through the
/// same structural matching as calls: no matching row means a type
/// error.
fn binop_rule(op: BinOpKind, lhs: &Sig, rhs: &Sig) -> Option<Sig> {
    use BinOpKind::*;
    match (op, lhs, rhs) {
        (Add | Sub | Mul | Div | Mod, Sig::Float, Sig::Float) => Some(Sig::Float),
        (Lt | LtEq | Gt | GtEq, Sig::Float, Sig::Float) => Some(Sig::Bool),
        (Lt | LtEq | Gt | GtEq, Sig::Char, Sig::Char) => Some(Sig::Bool),
        (Eq | Neq, a, b) if a == b && *a != Sig::Mixed => Some(Sig::Bool),
        (And | Or, Sig::Bool, Sig::Bool) => Some(Sig::Bool),
        _ => None,
    }
}

/// Built-in unary operator rule table.
fn unop_rule(op: UnOpKind, operand: &Sig) -> Option<Sig> {
    match (op, operand) {
        (UnOpKind::Neg, Sig::Float) => Some(Sig::Float),
        (UnOpKind::Not, Sig::Bool) => Some(Sig::Bool),
        _ => None,
    }
}
