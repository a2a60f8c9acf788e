//! AST node types for the sprig language.
//!
//! Nodes live in a single [`Ast`] arena and refer to each other by
//! [`NodeId`] index. Every node carries a [`Span`] for diagnostics.
//! Nodes are never freed individually; the arena drops as one unit.

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Arena
// ══════════════════════════════════════════════════════════════════════════════

/// Index of a node in the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Arena holding every node of one parsed program.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id.
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        id
    }

    /// Access a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Access a node's kind by id.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Access a node's span by id.
    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One AST node: a kind plus its source span.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Type Names
// ══════════════════════════════════════════════════════════════════════════════

/// A surface-syntax type name as written in declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    /// `num`
    Num,
    /// `bol`
    Bool,
    /// `chr`
    Char,
    /// `str` (sugar for an array of `chr`)
    Str,
    /// `none`
    None,
    /// `T[]`
    Array(Box<TypeName>),
}

impl TypeName {
    /// Look up a base type name. `[]` suffixes are the parser's job.
    pub fn from_name(name: &str) -> Option<TypeName> {
        Some(match name {
            "num" => TypeName::Num,
            "bol" => TypeName::Bool,
            "chr" => TypeName::Char,
            "str" => TypeName::Str,
            "none" => TypeName::None,
            _ => return None,
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Node Kinds
// ══════════════════════════════════════════════════════════════════════════════

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    Neq,
    And,
    Or,
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOpKind {
    Neg,
    Not,
}

/// Every node kind in the sprig language.
#[derive(Debug, PartialEq)]
pub enum NodeKind {
    // ── Top Level ─────────────────────────────────────────────

    /// A whole source file: function and extern declarations.
    Program { decls: Vec<NodeId> },
    /// `num add(num a, num b) { ... }`
    FunDecl {
        name: String,
        ret_ty: TypeName,
        params: Vec<NodeId>,
        body: NodeId,
    },
    /// `# extern none print(str text);` — signature only, bound by the host.
    ExternDecl {
        name: String,
        ret_ty: TypeName,
        params: Vec<NodeId>,
    },
    /// One parameter declaration.
    Param { name: String, ty: TypeName },

    // ── Statements ────────────────────────────────────────────

    /// `{ ... }`
    Block { stmts: Vec<NodeId> },
    /// `num x = expr;`
    VarDecl {
        name: String,
        ty: TypeName,
        init: NodeId,
    },
    /// `x = expr;`
    Assign { name: String, value: NodeId },
    /// `if (cond) { ... } else ...` — `else_branch` is a block or
    /// another `If` for chains.
    If {
        cond: NodeId,
        then_block: NodeId,
        else_branch: Option<NodeId>,
    },
    /// `for (num x in expr) { ... }`
    ForEach {
        var_name: String,
        var_ty: TypeName,
        iterable: NodeId,
        body: NodeId,
    },
    /// `return expr;` / `return;`
    Return { value: Option<NodeId> },
    /// An expression in statement position (a call).
    ExprStmt { expr: NodeId },

    // ── Expressions ───────────────────────────────────────────

    BinOp {
        op: BinOpKind,
        lhs: NodeId,
        rhs: NodeId,
    },
    UnOp { op: UnOpKind, operand: NodeId },
    NumberLit(f64),
    BoolLit(bool),
    CharLit(char),
    StringLit(String),
    ArrayLit { elems: Vec<NodeId> },
    VarRef { name: String },
    Call { name: String, args: Vec<NodeId> },
}

impl BinOpKind {
    /// Source text of the operator, for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Mod => "%",
            BinOpKind::Lt => "<",
            BinOpKind::LtEq => "<=",
            BinOpKind::Gt => ">",
            BinOpKind::GtEq => ">=",
            BinOpKind::Eq => "==",
            BinOpKind::Neq => "!=",
            BinOpKind::And => "and",
            BinOpKind::Or => "or",
        }
    }
}

impl UnOpKind {
    /// Source text of the operator, for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            UnOpKind::Neg => "-",
            UnOpKind::Not => "not",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_push_and_lookup() {
        let mut ast = Ast::new();
        let span = Span::new(0, 2, 1, 1);
        let lit = ast.push(NodeKind::NumberLit(42.0), span);
        let neg = ast.push(
            NodeKind::UnOp {
                op: UnOpKind::Neg,
                operand: lit,
            },
            span,
        );
        assert_eq!(ast.len(), 2);
        assert_eq!(*ast.kind(lit), NodeKind::NumberLit(42.0));
        match ast.kind(neg) {
            NodeKind::UnOp { op, operand } => {
                assert_eq!(*op, UnOpKind::Neg);
                assert_eq!(*operand, lit);
            }
            other => panic!("expected unop, got {other:?}"),
        }
        assert_eq!(ast.span(neg), span);
    }

    #[test]
    fn test_type_name_lookup() {
        assert_eq!(TypeName::from_name("num"), Some(TypeName::Num));
        assert_eq!(TypeName::from_name("bol"), Some(TypeName::Bool));
        assert_eq!(TypeName::from_name("chr"), Some(TypeName::Char));
        assert_eq!(TypeName::from_name("str"), Some(TypeName::Str));
        assert_eq!(TypeName::from_name("none"), Some(TypeName::None));
        assert_eq!(TypeName::from_name("int"), None);
        assert_eq!(TypeName::from_name("Num"), None);
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(BinOpKind::Add.symbol(), "+");
        assert_eq!(BinOpKind::Neq.symbol(), "!=");
        assert_eq!(BinOpKind::And.symbol(), "and");
        assert_eq!(UnOpKind::Not.symbol(), "not");
    }
}
