//! Structural compatibility between types.
//!
//! Recursive types are compared coinductively: before a `Rec` is unfolded,
//! the pair being compared is pushed on a stack of assumptions. Meeting an
//! alpha-equivalent pair again closes the cycle successfully. The stack is
//! popped on return, so assumptions never leak between sibling comparisons.
//!
//! Type variables are matched through a renaming map that pairs each
//! expected-side name with its actual-side counterpart. It starts with
//! identity pairs for the generic variables in scope and grows as `Generic`
//! binders are entered.

use log::trace;
use smol_str::SmolStr;

use crate::subst::{unfold, FreshNames};
use crate::types::{find_prop, find_variant, Prop, Ty, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Same shape on both sides; objects need the same property set.
    Equal,
    /// The actual side may offer more than the expected side asks for:
    /// extra object properties are allowed and function parameters are
    /// compared contravariantly.
    Width,
}

/// Does `actual` fit where `expected` is required?
///
/// `scope` lists the generic variables currently in scope; both sides may
/// mention them freely. Any other free variable is a bug in the caller.
pub fn compatible(
    expected: &Ty,
    actual: &Ty,
    mode: Mode,
    scope: &[SmolStr],
    fresh: &mut FreshNames,
) -> bool {
    let mut cx = Compat {
        renames: scope.iter().map(|n| (n.clone(), n.clone())).collect(),
        seen: Vec::new(),
        fresh,
    };
    cx.compat(expected, actual, mode)
}

struct Compat<'f> {
    renames: Vec<(SmolStr, SmolStr)>,
    seen: Vec<(Ty, Ty, Mode)>,
    fresh: &'f mut FreshNames,
}

impl Compat<'_> {
    fn compat(&mut self, expected: &Ty, actual: &Ty, mode: Mode) -> bool {
        match (expected, actual) {
            (Ty::Undefined, _) | (_, Ty::Undefined) => true,
            (Ty::Rec(..), _) | (_, Ty::Rec(..)) => self.compat_rec(expected, actual, mode),
            (Ty::Boolean, Ty::Boolean) | (Ty::Number, Ty::Number) | (Ty::String, Ty::String) => {
                true
            }
            (Ty::Option(a), Ty::Option(b))
            | (Ty::Array(a), Ty::Array(b))
            | (Ty::Map(a), Ty::Map(b)) => self.compat(a, b, mode),
            (Ty::Func(ps1, r1), Ty::Func(ps2, r2)) => {
                if ps1.len() != ps2.len() {
                    return false;
                }
                let params_ok = match mode {
                    Mode::Equal => ps1
                        .iter()
                        .zip(ps2)
                        .all(|(p1, p2)| self.compat(&p1.ty, &p2.ty, Mode::Equal)),
                    Mode::Width => {
                        self.flip();
                        let ok = ps1
                            .iter()
                            .zip(ps2)
                            .all(|(p1, p2)| self.compat(&p2.ty, &p1.ty, Mode::Width));
                        self.flip();
                        ok
                    }
                };
                params_ok && self.compat(r1, r2, mode)
            }
            (Ty::Object(p1), Ty::Object(p2)) => {
                if mode == Mode::Equal && p1.len() != p2.len() {
                    return false;
                }
                self.props(p1, p2, mode)
            }
            (Ty::TaggedUnion(v1), Ty::TaggedUnion(v2)) => self.variants(v1, v2),
            (Ty::Generic(ps1, b1), Ty::Generic(ps2, b2)) => {
                if ps1.len() != ps2.len() {
                    return false;
                }
                let mark = self.renames.len();
                self.renames
                    .extend(ps1.iter().cloned().zip(ps2.iter().cloned()));
                let ok = self.compat(b1, b2, mode);
                self.renames.truncate(mark);
                ok
            }
            (Ty::Var(n), Ty::Var(m)) => self.same_var(n, m),
            _ => false,
        }
    }

    /// Every expected property must be offered by `actual`.
    fn props(&mut self, expected: &[Prop], actual: &[Prop], mode: Mode) -> bool {
        expected.iter().all(|p| match find_prop(actual, &p.name) {
            Some(q) => self.compat(&p.ty, &q.ty, mode),
            None => false,
        })
    }

    fn variants(&mut self, expected: &[Variant], actual: &[Variant]) -> bool {
        if expected.len() != actual.len() {
            return false;
        }
        expected.iter().all(|v| match find_variant(actual, &v.label) {
            Some(w) => v.props.len() == w.props.len() && self.props(&v.props, &w.props, Mode::Equal),
            None => false,
        })
    }

    fn compat_rec(&mut self, expected: &Ty, actual: &Ty, mode: Mode) -> bool {
        let assumed = self
            .seen
            .iter()
            .any(|(e, a, m)| *m == mode && alpha_eq(e, expected) && alpha_eq(a, actual));
        if assumed {
            trace!("cycle closed at {} / {}", expected, actual);
            return true;
        }
        let expected_body = unfold(expected, self.fresh);
        let actual_body = unfold(actual, self.fresh);
        self.seen.push((expected.clone(), actual.clone(), mode));
        let ok = self.compat(&expected_body, &actual_body, mode);
        self.seen.pop();
        ok
    }

    fn same_var(&self, expected: &SmolStr, actual: &SmolStr) -> bool {
        let left = self.renames.iter().rposition(|(e, _)| e == expected);
        let right = self.renames.iter().rposition(|(_, a)| a == actual);
        match (left, right) {
            (Some(i), Some(j)) => i == j,
            _ => panic!(
                "type variable {} / {} is not in scope during compatibility check",
                expected, actual
            ),
        }
    }

    /// Swap sides for a contravariant position.
    fn flip(&mut self) {
        for pair in &mut self.renames {
            std::mem::swap(&mut pair.0, &mut pair.1);
        }
    }
}

/// Structural identity up to renaming of `Rec` and `Generic` binders.
pub fn alpha_eq(a: &Ty, b: &Ty) -> bool {
    alpha(a, b, &mut Vec::new())
}

fn alpha(a: &Ty, b: &Ty, bound: &mut Vec<(SmolStr, SmolStr)>) -> bool {
    match (a, b) {
        (Ty::Boolean, Ty::Boolean)
        | (Ty::Number, Ty::Number)
        | (Ty::String, Ty::String)
        | (Ty::Undefined, Ty::Undefined) => true,
        (Ty::Option(x), Ty::Option(y))
        | (Ty::Array(x), Ty::Array(y))
        | (Ty::Map(x), Ty::Map(y)) => alpha(x, y, bound),
        (Ty::Func(ps1, r1), Ty::Func(ps2, r2)) => {
            ps1.len() == ps2.len()
                && ps1
                    .iter()
                    .zip(ps2)
                    .all(|(p, q)| p.name == q.name && alpha(&p.ty, &q.ty, bound))
                && alpha(r1, r2, bound)
        }
        (Ty::Object(p1), Ty::Object(p2)) => alpha_props(p1, p2, bound),
        (Ty::TaggedUnion(v1), Ty::TaggedUnion(v2)) => {
            v1.len() == v2.len()
                && v1.iter().all(|v| match find_variant(v2, &v.label) {
                    Some(w) => alpha_props(&v.props, &w.props, bound),
                    None => false,
                })
        }
        (Ty::Rec(n, x), Ty::Rec(m, y)) => {
            bound.push((n.clone(), m.clone()));
            let ok = alpha(x, y, bound);
            bound.pop();
            ok
        }
        (Ty::Generic(ps1, x), Ty::Generic(ps2, y)) => {
            if ps1.len() != ps2.len() {
                return false;
            }
            let mark = bound.len();
            bound.extend(ps1.iter().cloned().zip(ps2.iter().cloned()));
            let ok = alpha(x, y, bound);
            bound.truncate(mark);
            ok
        }
        (Ty::Var(n), Ty::Var(m)) => {
            let left = bound.iter().rposition(|(l, _)| l == n);
            let right = bound.iter().rposition(|(_, r)| r == m);
            match (left, right) {
                (Some(i), Some(j)) => i == j,
                (None, None) => n == m,
                _ => false,
            }
        }
        _ => false,
    }
}

fn alpha_props(p1: &[Prop], p2: &[Prop], bound: &mut Vec<(SmolStr, SmolStr)>) -> bool {
    p1.len() == p2.len()
        && p1.iter().all(|p| match find_prop(p2, &p.name) {
            Some(q) => alpha(&p.ty, &q.ty, bound),
            None => false,
        })
}
