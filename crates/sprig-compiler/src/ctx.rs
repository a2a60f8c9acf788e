//! Type context: name -> signature bindings for one lexical scope
//! chain.
//!
//! Entries keep insertion order. Entering an if/else arm or a loop body
//! clones the whole context (O(n)) so mutations inside the branch never
//! leak back into the parent scope.

use crate::sig::Sig;

/// Insertion-ordered binding context.
#[derive(Debug, Clone, Default)]
pub struct TypeCtx {
    entries: Vec<(String, Sig)>,
}

impl TypeCtx {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name. Returns `false` when the name is already bound in
    /// this context; shadowing only happens across clones.
    pub fn insert(&mut self, name: &str, sig: Sig) -> bool {
        if self.entries.iter().any(|(n, _)| n == name) {
            return false;
        }
        self.entries.push((name.to_string(), sig));
        true
    }

    /// Point lookup by name.
    pub fn lookup(&self, name: &str) -> Option<&Sig> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sig)| sig)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context has no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Sig)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut ctx = TypeCtx::new();
        assert!(ctx.insert("x", Sig::Float));
        assert!(ctx.insert("y", Sig::Bool));
        assert_eq!(ctx.lookup("x"), Some(&Sig::Float));
        assert_eq!(ctx.lookup("y"), Some(&Sig::Bool));
        assert_eq!(ctx.lookup("z"), None);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut ctx = TypeCtx::new();
        assert!(ctx.insert("x", Sig::Float));
        assert!(!ctx.insert("x", Sig::Bool));
        // The original binding survives.
        assert_eq!(ctx.lookup("x"), Some(&Sig::Float));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut ctx = TypeCtx::new();
        ctx.insert("b", Sig::Bool);
        ctx.insert("a", Sig::Float);
        ctx.insert("c", Sig::Char);
        let names: Vec<_> = ctx.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_clone_isolates_branches() {
        let mut parent = TypeCtx::new();
        parent.insert("x", Sig::Float);
        let mut branch = parent.clone();
        branch.insert("y", Sig::Bool);
        assert_eq!(branch.len(), 2);
        assert_eq!(parent.len(), 1);
        assert_eq!(parent.lookup("y"), None);
    }
}
