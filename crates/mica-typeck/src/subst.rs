use log::trace;
use smol_str::SmolStr;

use crate::types::{Param, Prop, Ty, Variant};

/// Supply of names that cannot clash with user identifiers.
///
/// Fresh names have the form `base@N`. Front ends never produce `@`, and
/// `N` only grows, so a fresh name is distinct from every name seen so far.
#[derive(Debug)]
pub struct FreshNames {
    next: u32,
}

impl Default for FreshNames {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, base: &str) -> SmolStr {
        let stem = base.split('@').next().unwrap_or(base);
        let name = SmolStr::new(format!("{}@{}", stem, self.next));
        self.next += 1;
        name
    }
}

/// `ty[var := repl]`, renaming binders of `ty` that would capture a free
/// variable of `repl`.
pub fn substitute(ty: &Ty, var: &str, repl: &Ty, fresh: &mut FreshNames) -> Ty {
    if !ty.occurs_free(var) {
        return ty.clone();
    }
    let mut s = Subst {
        var,
        repl,
        repl_free: repl.free_vars(),
        fresh,
    };
    s.go(ty)
}

struct Subst<'a> {
    var: &'a str,
    repl: &'a Ty,
    repl_free: Vec<SmolStr>,
    fresh: &'a mut FreshNames,
}

impl Subst<'_> {
    fn go(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Boolean | Ty::Number | Ty::String | Ty::Undefined => ty.clone(),
            Ty::Var(name) if name == self.var => self.repl.clone(),
            Ty::Var(_) => ty.clone(),
            Ty::Option(e) => Ty::option(self.go(e)),
            Ty::Array(e) => Ty::array(self.go(e)),
            Ty::Map(e) => Ty::map(self.go(e)),
            Ty::Func(params, ret) => {
                let params = params
                    .iter()
                    .map(|p| Param::new(p.name.clone(), self.go(&p.ty)))
                    .collect();
                Ty::func(params, self.go(ret))
            }
            Ty::Object(props) => Ty::Object(self.props(props)),
            Ty::TaggedUnion(variants) => Ty::TaggedUnion(
                variants
                    .iter()
                    .map(|v| Variant::new(v.label.clone(), self.props(&v.props)))
                    .collect(),
            ),
            Ty::Rec(name, body) => {
                if name == self.var || !body.occurs_free(self.var) {
                    return ty.clone();
                }
                let (name, body) = self.avoid_capture(name, body);
                Ty::rec(name, self.go(&body))
            }
            Ty::Generic(params, body) => {
                if params.iter().any(|p| p == self.var) || !body.occurs_free(self.var) {
                    return ty.clone();
                }
                let mut body = (**body).clone();
                let mut renamed = Vec::with_capacity(params.len());
                for p in params {
                    let (p, b) = self.avoid_capture(p, &body);
                    body = b;
                    renamed.push(p);
                }
                Ty::generic(renamed, self.go(&body))
            }
        }
    }

    fn props(&mut self, props: &[Prop]) -> Vec<Prop> {
        props
            .iter()
            .map(|p| Prop::new(p.name.clone(), self.go(&p.ty)))
            .collect()
    }

    /// Rename `binder` throughout `body` when it collides with a free
    /// variable of the replacement.
    fn avoid_capture(&mut self, binder: &SmolStr, body: &Ty) -> (SmolStr, Ty) {
        if !self.repl_free.contains(binder) {
            return (binder.clone(), body.clone());
        }
        let renamed = self.fresh.fresh(binder);
        trace!("renaming bound {} to {} to avoid capture", binder, renamed);
        let body = substitute(body, binder, &Ty::Var(renamed.clone()), self.fresh);
        (renamed, body)
    }
}

/// One-level unfolding of a top-level `Rec`: `body[name := Rec(name, body)]`.
/// Other types are returned unchanged.
pub fn unfold_once(ty: &Ty, fresh: &mut FreshNames) -> Ty {
    match ty {
        Ty::Rec(name, body) => substitute(body, name, ty, fresh),
        _ => ty.clone(),
    }
}

/// Unfold until the head is no longer a `Rec`. Terminates for contractive
/// types, which is all the resolver produces.
pub fn unfold(ty: &Ty, fresh: &mut FreshNames) -> Ty {
    let mut cur = ty.clone();
    while let Ty::Rec(..) = cur {
        cur = unfold_once(&cur, fresh);
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(param: &str) -> Ty {
        Ty::generic(
            vec![param.into()],
            Ty::func(vec![Param::new("x", Ty::var(param))], Ty::var(param)),
        )
    }

    #[test]
    fn fresh_names_count_from_one_and_strip_suffix() {
        let mut fresh = FreshNames::new();
        assert_eq!(fresh.fresh("X"), "X@1");
        assert_eq!(fresh.fresh("X@1"), "X@2");
        assert_eq!(fresh.fresh("Y"), "Y@3");
    }

    #[test]
    fn replaces_free_occurrences() {
        let mut fresh = FreshNames::new();
        let ty = Ty::func(vec![Param::new("x", Ty::var("T"))], Ty::array(Ty::var("T")));
        let out = substitute(&ty, "T", &Ty::Number, &mut fresh);
        insta::assert_snapshot!(out.to_string(), @"(x: number) => number[]");
    }

    #[test]
    fn shadowing_binder_stops_substitution() {
        let mut fresh = FreshNames::new();
        let ty = identity("T");
        assert_eq!(substitute(&ty, "T", &Ty::Number, &mut fresh), ty);
    }

    #[test]
    fn colliding_binder_is_renamed() {
        let mut fresh = FreshNames::new();
        // <X>(x: X) => T with T := X must not capture the outer X.
        let ty = Ty::generic(
            vec!["X".into()],
            Ty::func(vec![Param::new("x", Ty::var("X"))], Ty::var("T")),
        );
        let out = substitute(&ty, "T", &Ty::var("X"), &mut fresh);
        insta::assert_snapshot!(out.to_string(), @"<X@1>(x: X@1) => X");
    }

    #[test]
    fn unfold_reaches_non_rec_head() {
        let mut fresh = FreshNames::new();
        let stream = Ty::rec(
            "S",
            Ty::Object(vec![Prop::new("next", Ty::func(vec![], Ty::var("S")))]),
        );
        let out = unfold(&stream, &mut fresh);
        insta::assert_snapshot!(out.to_string(), @"{ next: () => (mu S. { next: () => S }) }");
    }
}
