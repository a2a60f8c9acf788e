//! Structural type signatures.
//!
//! A [`Sig`] is the checker's view of a value type. Signatures have a
//! canonical display form used in diagnostics and host integration:
//! `f` (number), `b` (bool), `c` (char), `n` (none), `[t]` (array of
//! `t`), `[*]` (mixed array), `?` (error placeholder). A function
//! renders as `#name:params`.

use serde::{Deserialize, Serialize};
use sprig_types::ast::TypeName;
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Sig
// ══════════════════════════════════════════════════════════════════════════════

/// A structural value signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sig {
    /// A number.
    Float,
    Bool,
    Char,
    /// The absence of a value (void returns, `return;`).
    None,
    /// A homogeneous array. Strings are `Array(Char)`.
    Array(Box<Sig>),
    /// An array whose elements disagree on their signature.
    Mixed,
    /// Placeholder after a reported type error; matches anything and
    /// suppresses cascading diagnostics.
    Error,
}

impl Sig {
    /// Fold element signatures into an array signature.
    ///
    /// Degrades to [`Sig::Mixed`] on the first element mismatch. An
    /// empty literal has no element evidence and folds to `[n]`.
    pub fn fold_array(elems: &[Sig]) -> Sig {
        if elems.iter().any(|s| *s == Sig::Error) {
            return Sig::Error;
        }
        let Some(first) = elems.first() else {
            return Sig::Array(Box::new(Sig::None));
        };
        if elems.iter().any(|s| s != first) {
            return Sig::Mixed;
        }
        Sig::Array(Box::new(first.clone()))
    }

    /// Structural match, with [`Sig::Error`] as a wildcard.
    pub fn matches(&self, other: &Sig) -> bool {
        self == other || *self == Sig::Error || *other == Sig::Error
    }
}

impl From<&TypeName> for Sig {
    fn from(ty: &TypeName) -> Sig {
        match ty {
            TypeName::Num => Sig::Float,
            TypeName::Bool => Sig::Bool,
            TypeName::Char => Sig::Char,
            TypeName::Str => Sig::Array(Box::new(Sig::Char)),
            TypeName::None => Sig::None,
            TypeName::Array(inner) => Sig::Array(Box::new(Sig::from(inner.as_ref()))),
        }
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sig::Float => f.write_str("f"),
            Sig::Bool => f.write_str("b"),
            Sig::Char => f.write_str("c"),
            Sig::None => f.write_str("n"),
            Sig::Array(inner) => write!(f, "[{inner}]"),
            Sig::Mixed => f.write_str("[*]"),
            Sig::Error => f.write_str("?"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// FnSig
// ══════════════════════════════════════════════════════════════════════════════

/// A function signature: name, parameter signatures, return signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnSig {
    pub name: String,
    pub params: Vec<Sig>,
    pub ret: Sig,
}

impl FnSig {
    pub fn new(name: impl Into<String>, params: Vec<Sig>, ret: Sig) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
        }
    }
}

impl fmt::Display for FnSig {
    /// Canonical form `#name:params`, e.g. `#add:ff`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:", self.name)?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_display() {
        assert_eq!(Sig::Float.to_string(), "f");
        assert_eq!(Sig::Bool.to_string(), "b");
        assert_eq!(Sig::Char.to_string(), "c");
        assert_eq!(Sig::None.to_string(), "n");
    }

    #[test]
    fn test_array_display_nests() {
        let chars = Sig::Array(Box::new(Sig::Char));
        assert_eq!(chars.to_string(), "[c]");
        let nested = Sig::Array(Box::new(chars));
        assert_eq!(nested.to_string(), "[[c]]");
        assert_eq!(Sig::Mixed.to_string(), "[*]");
    }

    #[test]
    fn test_fold_homogeneous() {
        let folded = Sig::fold_array(&[Sig::Float, Sig::Float, Sig::Float]);
        assert_eq!(folded, Sig::Array(Box::new(Sig::Float)));
    }

    #[test]
    fn test_fold_mixed_needs_two_differing_sigs() {
        assert_eq!(Sig::fold_array(&[Sig::Float, Sig::Bool]), Sig::Mixed);
        assert_eq!(
            Sig::fold_array(&[Sig::Float, Sig::Float, Sig::Char]),
            Sig::Mixed
        );
        // A single element can never be mixed.
        assert_eq!(
            Sig::fold_array(&[Sig::Bool]),
            Sig::Array(Box::new(Sig::Bool))
        );
    }

    #[test]
    fn test_fold_propagates_error() {
        assert_eq!(Sig::fold_array(&[Sig::Float, Sig::Error]), Sig::Error);
    }

    #[test]
    fn test_error_matches_anything() {
        assert!(Sig::Error.matches(&Sig::Float));
        assert!(Sig::Mixed.matches(&Sig::Error));
        assert!(!Sig::Float.matches(&Sig::Bool));
    }

    #[test]
    fn test_from_type_name() {
        use sprig_types::ast::TypeName;
        assert_eq!(Sig::from(&TypeName::Num), Sig::Float);
        assert_eq!(Sig::from(&TypeName::Str), Sig::Array(Box::new(Sig::Char)));
        assert_eq!(
            Sig::from(&TypeName::Array(Box::new(TypeName::Num))),
            Sig::Array(Box::new(Sig::Float))
        );
    }

    #[test]
    fn test_fn_sig_display() {
        let sig = FnSig::new("add", vec![Sig::Float, Sig::Float], Sig::Float);
        assert_eq!(sig.to_string(), "#add:ff");
        let print = FnSig::new(
            "print",
            vec![Sig::Array(Box::new(Sig::Char))],
            Sig::None,
        );
        assert_eq!(print.to_string(), "#print:[c]");
        let thunk = FnSig::new("tick", vec![], Sig::None);
        assert_eq!(thunk.to_string(), "#tick:");
    }
}
