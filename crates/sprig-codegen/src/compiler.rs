//! Bytecode emission.
//!
//! Two stages. First every function is lowered into `Ir` records whose
//! jump operands are instruction indices, with reserve-then-patch
//! back-fills for control flow; calls resolve in declaration order
//! against functions already emitted (a function may call itself or
//! anything above it). Then the index of each record is converted to
//! its byte address and the final byte stream is written.

use crate::error::{CodegenError, CodegenResult};
use sprig_types::ast::{Ast, BinOpKind, NodeId, NodeKind, UnOpKind};
use sprig_types::{ConstPool, Op, Program, Value};
use std::collections::HashMap;

/// Generate bytecode for a parsed and checked program.
pub fn generate(ast: &Ast, root: NodeId) -> CodegenResult<Program> {
    let mut codegen = Codegen::new(ast);
    codegen.run(root)?;
    codegen.finish()
}

/// One intermediate instruction. `args[0]` of jump-family records holds
/// an instruction index until relocation.
#[derive(Debug, Clone, Copy)]
struct Ir {
    op: Op,
    args: [u32; 2],
}

struct Codegen<'a> {
    ast: &'a Ast,
    ir: Vec<Ir>,
    consts: ConstPool,
    /// Function name -> arity, filled as declarations are emitted.
    funcs: HashMap<String, u32>,
    /// Extern name -> arity, filled as declarations are seen.
    natives: HashMap<String, u32>,
    /// Function name -> instruction index of its MakeFrame prologue.
    func_starts: HashMap<String, usize>,
    /// Flat local slots of the function being emitted. Slots of exited
    /// scopes keep their index but lose their name.
    locals: Vec<String>,
    scopes: Vec<usize>,
    loop_counter: usize,
}

impl<'a> Codegen<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            ir: Vec::new(),
            consts: ConstPool::new(),
            funcs: HashMap::new(),
            natives: HashMap::new(),
            func_starts: HashMap::new(),
            locals: Vec::new(),
            scopes: Vec::new(),
            loop_counter: 0,
        }
    }

    fn run(&mut self, root: NodeId) -> CodegenResult<()> {
        let NodeKind::Program { decls } = self.ast.kind(root) else {
            return Err(CodegenError::Internal("root is not a program".into()));
        };

        // Declarations are emitted in order; a function is registered
        // before its own body so it may call itself or anything above
        // it, never a later declaration.
        let entry = self.emit2(Op::EntryPoint, 0, 0);
        for &decl in decls {
            match self.ast.kind(decl) {
                NodeKind::FunDecl {
                    name, params, body, ..
                } => {
                    self.funcs.insert(name.clone(), params.len() as u32);
                    self.emit_function(name, params, *body)?;
                }
                NodeKind::ExternDecl { name, params, .. } => {
                    self.natives.insert(name.clone(), params.len() as u32);
                }
                _ => {}
            }
        }

        let main_arity = *self
            .funcs
            .get("main")
            .ok_or(CodegenError::MissingEntryPoint)?;
        let main_start = self.start_of("main")?;
        self.ir[entry].args = [main_start, main_arity];
        Ok(())
    }

    fn start_of(&self, name: &str) -> CodegenResult<u32> {
        self.func_starts
            .get(name)
            .map(|&i| i as u32)
            .ok_or_else(|| CodegenError::UnresolvedCall(name.to_string()))
    }

    // ── Functions ────────────────────────────────────────────

    fn emit_function(
        &mut self,
        name: &str,
        params: &[NodeId],
        body: NodeId,
    ) -> CodegenResult<()> {
        self.locals.clear();
        self.scopes.clear();
        for &param in params {
            let NodeKind::Param { name, .. } = self.ast.kind(param) else {
                return Err(CodegenError::Internal("malformed parameter".into()));
            };
            self.locals.push(name.clone());
        }
        let num_args = params.len() as u32;

        self.func_starts.insert(name.to_string(), self.ir.len());
        let prologue = self.emit2(Op::MakeFrame, num_args, 0);
        self.emit_block(body)?;

        // Implicit `return none;` for functions that fall off the end.
        let none = self.consts.intern(Value::None);
        self.emit1(Op::PushConst, none);
        self.emit0(Op::Return);

        // The frame counts every slot, parameters included.
        let num_locals = self.locals.len() as u32;
        if num_args > u8::MAX as u32 || num_locals > u8::MAX as u32 {
            return Err(CodegenError::LimitExceeded(format!(
                "function '{name}' needs {num_args} args and {num_locals} locals"
            )));
        }
        self.ir[prologue].args[1] = num_locals;
        Ok(())
    }

    // ── Statements ───────────────────────────────────────────

    fn emit_block(&mut self, block: NodeId) -> CodegenResult<()> {
        let NodeKind::Block { stmts } = self.ast.kind(block) else {
            return Err(CodegenError::Internal("expected block".into()));
        };
        self.enter_scope();
        for &stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        self.exit_scope();
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: NodeId) -> CodegenResult<()> {
        match self.ast.kind(stmt) {
            NodeKind::VarDecl { name, init, .. } => {
                self.emit_expr(*init)?;
                let slot = self.define_local(name);
                self.emit1(Op::StoreLocal, slot);
            }
            NodeKind::Assign { name, value } => {
                self.emit_expr(*value)?;
                let slot = self.resolve_local(name)?;
                self.emit1(Op::StoreLocal, slot);
            }
            NodeKind::If {
                cond,
                then_block,
                else_branch,
            } => self.emit_if(*cond, *then_block, *else_branch)?,
            NodeKind::ForEach {
                var_name,
                iterable,
                body,
                ..
            } => self.emit_for_each(var_name, *iterable, *body)?,
            NodeKind::Return { value } => {
                match value {
                    Some(expr) => self.emit_expr(*expr)?,
                    None => {
                        let none = self.consts.intern(Value::None);
                        self.emit1(Op::PushConst, none);
                    }
                }
                self.emit0(Op::Return);
            }
            NodeKind::ExprStmt { expr } => {
                self.emit_expr(*expr)?;
                self.emit0(Op::Pop);
            }
            NodeKind::Block { .. } => self.emit_block(stmt)?,
            other => {
                return Err(CodegenError::Internal(format!(
                    "unexpected node in statement position: {other:?}"
                )))
            }
        }
        Ok(())
    }

    fn emit_if(
        &mut self,
        cond: NodeId,
        then_block: NodeId,
        else_branch: Option<NodeId>,
    ) -> CodegenResult<()> {
        self.emit_expr(cond)?;
        let to_else = self.reserve(Op::JumpIfFalse);
        self.emit_block(then_block)?;
        match else_branch {
            Some(else_node) => {
                let to_end = self.reserve(Op::Jump);
                self.patch(to_else, self.ir.len());
                // An else-if chain nests another If node here.
                if matches!(self.ast.kind(else_node), NodeKind::Block { .. }) {
                    self.emit_block(else_node)?;
                } else {
                    self.emit_stmt(else_node)?;
                }
                self.patch(to_end, self.ir.len());
            }
            None => self.patch(to_else, self.ir.len()),
        }
        Ok(())
    }

    /// Lower `for (t x in expr)` to an index-counter loop over hidden
    /// locals:
    ///
    /// ```text
    ///   <iterable>            store $arr
    ///   0                     store $idx
    /// top:
    ///   $idx < len($arr)      jump_if_false end
    ///   x = $arr[$idx]
    ///   <body>
    ///   $idx = $idx + 1       jump top
    /// end:
    /// ```
    fn emit_for_each(
        &mut self,
        var_name: &str,
        iterable: NodeId,
        body: NodeId,
    ) -> CodegenResult<()> {
        let n = self.loop_counter;
        self.loop_counter += 1;
        self.enter_scope();

        self.emit_expr(iterable)?;
        let arr = self.define_local(&format!("$arr{n}"));
        self.emit1(Op::StoreLocal, arr);

        let zero = self.consts.intern(Value::Number(0.0));
        self.emit1(Op::PushConst, zero);
        let idx = self.define_local(&format!("$idx{n}"));
        self.emit1(Op::StoreLocal, idx);

        let top = self.ir.len();
        self.emit1(Op::LoadLocal, idx);
        self.emit1(Op::LoadLocal, arr);
        self.emit0(Op::ArrayLen);
        self.emit0(Op::CmpLt);
        let to_end = self.reserve(Op::JumpIfFalse);

        self.emit1(Op::LoadLocal, arr);
        self.emit1(Op::LoadLocal, idx);
        self.emit0(Op::ArrayGet);
        let elem = self.define_local(var_name);
        self.emit1(Op::StoreLocal, elem);

        self.emit_block(body)?;

        self.emit1(Op::LoadLocal, idx);
        let one = self.consts.intern(Value::Number(1.0));
        self.emit1(Op::PushConst, one);
        self.emit0(Op::Add);
        self.emit1(Op::StoreLocal, idx);
        let back = self.reserve(Op::Jump);
        self.patch(back, top);
        self.patch(to_end, self.ir.len());

        self.exit_scope();
        Ok(())
    }

    // ── Expressions ──────────────────────────────────────────

    fn emit_expr(&mut self, expr: NodeId) -> CodegenResult<()> {
        match self.ast.kind(expr) {
            NodeKind::NumberLit(n) => {
                let idx = self.consts.intern(Value::Number(*n));
                self.emit1(Op::PushConst, idx);
            }
            NodeKind::BoolLit(b) => {
                let idx = self.consts.intern(Value::Bool(*b));
                self.emit1(Op::PushConst, idx);
            }
            NodeKind::CharLit(c) => {
                let idx = self.consts.intern(Value::Char(*c));
                self.emit1(Op::PushConst, idx);
            }
            NodeKind::StringLit(s) => {
                let idx = self.consts.intern_string(s);
                self.emit1(Op::PushConst, idx);
            }
            NodeKind::ArrayLit { elems } => {
                let elems = elems.clone();
                for &elem in &elems {
                    self.emit_expr(elem)?;
                }
                self.emit1(Op::MakeArray, elems.len() as u32);
            }
            NodeKind::VarRef { name } => {
                let slot = self.resolve_local(name)?;
                self.emit1(Op::LoadLocal, slot);
            }
            NodeKind::UnOp { op, operand } => {
                self.emit_expr(*operand)?;
                match op {
                    UnOpKind::Neg => self.emit0(Op::Neg),
                    UnOpKind::Not => self.emit0(Op::Not),
                };
            }
            NodeKind::BinOp { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                self.emit_expr(lhs)?;
                self.emit_expr(rhs)?;
                self.emit0(binop_opcode(op));
            }
            NodeKind::Call { name, args } => {
                let (name, args) = (name.clone(), args.clone());
                for &arg in &args {
                    self.emit_expr(arg)?;
                }
                if self.funcs.contains_key(&name) {
                    let start = self.start_of(&name)?;
                    self.emit1(Op::Call, start);
                } else if self.natives.contains_key(&name) {
                    let name_const = self.consts.intern_string(&name);
                    self.emit2(Op::CallNative, name_const, args.len() as u32);
                } else {
                    return Err(CodegenError::UnresolvedCall(name));
                }
            }
            other => {
                return Err(CodegenError::Internal(format!(
                    "unexpected node in expression position: {other:?}"
                )))
            }
        }
        Ok(())
    }

    // ── Emission helpers ─────────────────────────────────────

    fn emit0(&mut self, op: Op) -> usize {
        self.ir.push(Ir { op, args: [0, 0] });
        self.ir.len() - 1
    }

    fn emit1(&mut self, op: Op, arg: u32) -> usize {
        self.ir.push(Ir { op, args: [arg, 0] });
        self.ir.len() - 1
    }

    fn emit2(&mut self, op: Op, arg0: u32, arg1: u32) -> usize {
        self.ir.push(Ir {
            op,
            args: [arg0, arg1],
        });
        self.ir.len() - 1
    }

    /// Emit a record whose target is patched later.
    fn reserve(&mut self, op: Op) -> usize {
        self.emit0(op)
    }

    fn patch(&mut self, idx: usize, target: usize) {
        self.ir[idx].args[0] = target as u32;
    }

    // ── Local slots ──────────────────────────────────────────

    fn enter_scope(&mut self) {
        self.scopes.push(self.locals.len());
    }

    /// Names from the exited scope stop resolving, their slots remain
    /// reserved for the rest of the function.
    fn exit_scope(&mut self) {
        if let Some(start) = self.scopes.pop() {
            for name in &mut self.locals[start..] {
                name.clear();
            }
        }
    }

    fn define_local(&mut self, name: &str) -> u32 {
        self.locals.push(name.to_string());
        (self.locals.len() - 1) as u32
    }

    fn resolve_local(&self, name: &str) -> CodegenResult<u32> {
        self.locals
            .iter()
            .rposition(|l| l == name)
            .map(|i| i as u32)
            .ok_or_else(|| CodegenError::UnresolvedSymbol(name.to_string()))
    }

    // ── Relocation & byte emission ───────────────────────────

    fn finish(self) -> CodegenResult<Program> {
        // Instruction index -> byte address.
        let mut offsets = Vec::with_capacity(self.ir.len());
        let mut addr = 0usize;
        for rec in &self.ir {
            offsets.push(addr as u32);
            addr += rec.op.encoded_size();
        }

        let mut code = Vec::with_capacity(addr);
        for rec in &self.ir {
            let mut args = rec.args;
            if matches!(
                rec.op,
                Op::Jump | Op::JumpIfFalse | Op::Call | Op::EntryPoint
            ) {
                let target = args[0] as usize;
                let resolved = offsets.get(target).ok_or_else(|| {
                    CodegenError::Internal(format!("jump target {target} out of range"))
                })?;
                args[0] = *resolved;
            }
            code.push(rec.op as u8);
            for arg in args.iter().take(rec.op.operand_count()) {
                code.extend_from_slice(&arg.to_le_bytes());
            }
        }
        Ok(Program::new(code, self.consts.into_values()))
    }
}

fn binop_opcode(op: BinOpKind) -> Op {
    match op {
        BinOpKind::Add => Op::Add,
        BinOpKind::Sub => Op::Sub,
        BinOpKind::Mul => Op::Mul,
        BinOpKind::Div => Op::Div,
        BinOpKind::Mod => Op::Mod,
        BinOpKind::Lt => Op::CmpLt,
        BinOpKind::LtEq => Op::CmpLte,
        BinOpKind::Gt => Op::CmpGt,
        BinOpKind::GtEq => Op::CmpGte,
        BinOpKind::Eq => Op::CmpEq,
        BinOpKind::Neq => Op::CmpNeq,
        BinOpKind::And => Op::And,
        BinOpKind::Or => Op::Or,
    }
}
