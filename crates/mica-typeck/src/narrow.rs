use mica_ast::{CompareOp, ExprId, ExprKind, Module};
use smol_str::SmolStr;

/// What a conditional's test tells each branch about one variable.
///
/// Only these syntactic shapes are recognized. Any other condition, even a
/// semantically equivalent one, is checked without narrowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Refinement {
    /// `if (x)`: `x` is present in the then-branch.
    Present(SmolStr),
    /// `if (!x)`: `x` is present in the else-branch.
    Absent(SmolStr),
    /// `if (x.tag === "label")`, or `!==` when `matches` is false.
    Tag {
        var: SmolStr,
        label: SmolStr,
        matches: bool,
    },
}

pub(crate) fn refinement(module: &Module, cond: ExprId) -> Option<Refinement> {
    match &module.exprs[cond].kind {
        ExprKind::Var(name) => Some(Refinement::Present(name.clone())),
        ExprKind::Not(inner) => match &module.exprs[*inner].kind {
            ExprKind::Var(name) => Some(Refinement::Absent(name.clone())),
            _ => None,
        },
        ExprKind::Compare { op, left, right } => {
            let ExprKind::ObjectGet { obj, prop } = &module.exprs[*left].kind else {
                return None;
            };
            let (ExprKind::Var(var), ExprKind::String(label)) =
                (&module.exprs[*obj].kind, &module.exprs[*right].kind)
            else {
                return None;
            };
            if prop.as_str() != "tag" {
                return None;
            }
            Some(Refinement::Tag {
                var: var.clone(),
                label: label.clone(),
                matches: *op == CompareOp::StrictEq,
            })
        }
        _ => None,
    }
}
