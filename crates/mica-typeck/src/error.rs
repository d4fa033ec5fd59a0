use mica_ast::Span;
use smol_str::SmolStr;
use std::fmt;

use crate::types::Ty;

/// Where two types were required to agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchSite {
    Branches,
    Argument,
    Assignment,
    Clauses,
    Comparison,
    UnionTerm,
    LoopResult,
    Value,
}

impl fmt::Display for MismatchSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MismatchSite::Branches => "then and else have different types",
            MismatchSite::Argument => "parameter type mismatch",
            MismatchSite::Assignment => "type mismatch",
            MismatchSite::Clauses => "clauses have different types",
            MismatchSite::Comparison => "compare different types",
            MismatchSite::UnionTerm => "tagged union's term has a wrong type",
            MismatchSite::LoopResult => "return type is inconsistent",
            MismatchSite::Value => "value type is inconsistent",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeErrorKind {
    #[error("unbound variable: {0}")]
    UnboundVariable(SmolStr),

    #[error("wrong number of arguments: expected {expected}, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("{site}: expected {expected}, found {found}")]
    TypeMismatch {
        site: MismatchSite,
        expected: Ty,
        found: Ty,
    },

    #[error("{expected} expected, found {found}")]
    ExpectedKind { expected: &'static str, found: Ty },

    #[error("unknown property name: {0}")]
    UnknownProperty(SmolStr),

    #[error("unknown variant label: {0}")]
    UnknownVariant(SmolStr),

    #[error("non-exhaustive dispatch: missing {}", .missing.join(", "))]
    NonExhaustiveDispatch { missing: Vec<SmolStr> },

    #[error("wrong return type: expected {expected}, found {found}")]
    WrongDeclaredReturnType { expected: Ty, found: Ty },

    #[error("duplicate type parameter: {0}")]
    DuplicateTypeParameter(SmolStr),

    #[error("unbound type variable: {0}")]
    UnboundTypeVariable(SmolStr),

    #[error("not a generic type: {0}")]
    NotGeneric(SmolStr),

    #[error("wrong number of type arguments: expected {expected}, found {found}")]
    GenericArityMismatch { expected: usize, found: usize },

    #[error("type recursion for generics is not supported: {0}")]
    UnsupportedTypeRecursionInGenerics(SmolStr),

    #[error("duplicate property: {0}")]
    DuplicateProperty(SmolStr),

    #[error("duplicate variant: {0}")]
    DuplicateVariant(SmolStr),

    #[error("recursive type is not contractive: {0}")]
    NonContractiveRecursion(SmolStr),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{}:{}] {}", .span.start, .span.end, .kind)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}
