use log::debug;
use mica_ast::{Module, Span, TypeAlias, TypeExprId, TypeExprKind};
use smol_str::SmolStr;

use crate::error::{TypeError, TypeErrorKind};
use crate::subst::{substitute, FreshNames};
use crate::types::{Param, Prop, Ty, Variant};

/// Turns type annotations into checked `Ty` values, expanding aliases.
pub(crate) struct Resolver<'a> {
    module: &'a Module,
    fresh: &'a mut FreshNames,
    /// Aliases whose bodies are being expanded, innermost last.
    expanding: Vec<SmolStr>,
}

/// A generic parameter of an enclosing term-level abstraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TyVar {
    /// The name annotations use.
    pub(crate) name: SmolStr,
    /// The variable it stands for in checked types. Differs from `name`
    /// when an inner abstraction reuses a parameter name already in scope.
    pub(crate) var: SmolStr,
}

impl TyVar {
    pub(crate) fn new(name: impl Into<SmolStr>, var: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            var: var.into(),
        }
    }
}

/// A name visible inside a type expression.
struct Bound {
    name: SmolStr,
    ty: Ty,
    is_rec: bool,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(module: &'a Module, fresh: &'a mut FreshNames) -> Self {
        Self {
            module,
            fresh,
            expanding: Vec::new(),
        }
    }

    /// Resolve `id` with the given generic variables in scope.
    pub(crate) fn resolve(&mut self, id: TypeExprId, tyvars: &[TyVar]) -> Result<Ty, TypeError> {
        let mut scope: Vec<Bound> = tyvars
            .iter()
            .map(|v| Bound {
                name: v.name.clone(),
                ty: Ty::Var(v.var.clone()),
                is_rec: false,
            })
            .collect();
        self.go(id, &mut scope)
    }

    fn go(&mut self, id: TypeExprId, scope: &mut Vec<Bound>) -> Result<Ty, TypeError> {
        let module = self.module;
        let texpr = &module.type_exprs[id];
        let span = texpr.span;
        match &texpr.kind {
            TypeExprKind::Boolean => Ok(Ty::Boolean),
            TypeExprKind::Number => Ok(Ty::Number),
            TypeExprKind::String => Ok(Ty::String),
            TypeExprKind::Undefined => Ok(Ty::Undefined),
            TypeExprKind::Option(e) => Ok(Ty::option(self.go(*e, scope)?)),
            TypeExprKind::Array(e) => Ok(Ty::array(self.go(*e, scope)?)),
            TypeExprKind::Map(e) => Ok(Ty::map(self.go(*e, scope)?)),
            TypeExprKind::Func { params, ret } => {
                let mut ps = Vec::with_capacity(params.len());
                for (name, ty) in params {
                    ps.push(Param::new(name.clone(), self.go(*ty, scope)?));
                }
                Ok(Ty::func(ps, self.go(*ret, scope)?))
            }
            TypeExprKind::Object(props) => Ok(Ty::Object(self.props(props, scope, span)?)),
            TypeExprKind::TaggedUnion(variants) => {
                let mut out: Vec<Variant> = Vec::with_capacity(variants.len());
                for v in variants {
                    if out.iter().any(|w| w.label == v.label) {
                        return Err(err(TypeErrorKind::DuplicateVariant(v.label.clone()), span));
                    }
                    let props = self.props(&v.props, scope, span)?;
                    out.push(Variant::new(v.label.clone(), props));
                }
                Ok(Ty::TaggedUnion(out))
            }
            TypeExprKind::Rec { name, body } => {
                if scope.iter().any(|b| b.is_rec && b.name == *name) {
                    return Err(err(TypeErrorKind::DuplicateTypeParameter(name.clone()), span));
                }
                scope.push(Bound {
                    name: name.clone(),
                    ty: Ty::Var(name.clone()),
                    is_rec: true,
                });
                let body = self.go(*body, scope);
                scope.pop();
                let ty = Ty::rec(name.clone(), body?);
                check_contractive(&ty, span)?;
                Ok(ty)
            }
            TypeExprKind::Generic { type_params, body } => {
                check_distinct(type_params, span)?;
                let mark = scope.len();
                scope.extend(type_params.iter().map(|p| Bound {
                    name: p.clone(),
                    ty: Ty::Var(p.clone()),
                    is_rec: false,
                }));
                let body = self.go(*body, scope);
                scope.truncate(mark);
                Ok(Ty::generic(type_params.clone(), body?))
            }
            TypeExprKind::Named { name, args: None } => {
                if let Some(b) = scope.iter().rev().find(|b| b.name == *name) {
                    return Ok(b.ty.clone());
                }
                let Some(alias) = module.alias(name) else {
                    return Err(err(TypeErrorKind::UnboundTypeVariable(name.clone()), span));
                };
                if let Some(params) = &alias.params {
                    return Err(err(
                        TypeErrorKind::GenericArityMismatch {
                            expected: params.len(),
                            found: 0,
                        },
                        span,
                    ));
                }
                if self.expanding.contains(name) {
                    return Ok(Ty::Var(name.clone()));
                }
                self.expand(alias, &[], span)
            }
            TypeExprKind::Named {
                name,
                args: Some(args),
            } => {
                if scope.iter().any(|b| b.name == *name) {
                    return Err(err(TypeErrorKind::NotGeneric(name.clone()), span));
                }
                let Some(alias) = module.alias(name) else {
                    return Err(err(TypeErrorKind::UnboundTypeVariable(name.clone()), span));
                };
                if self.expanding.contains(name) {
                    return Err(err(
                        TypeErrorKind::UnsupportedTypeRecursionInGenerics(name.clone()),
                        span,
                    ));
                }
                let Some(params) = &alias.params else {
                    return Err(err(TypeErrorKind::NotGeneric(name.clone()), span));
                };
                if params.len() != args.len() {
                    return Err(err(
                        TypeErrorKind::GenericArityMismatch {
                            expected: params.len(),
                            found: args.len(),
                        },
                        span,
                    ));
                }
                let mut resolved = Vec::with_capacity(args.len());
                for a in args {
                    resolved.push(self.go(*a, scope)?);
                }
                self.expand(alias, &resolved, span)
            }
        }
    }

    fn props(
        &mut self,
        props: &[(SmolStr, TypeExprId)],
        scope: &mut Vec<Bound>,
        span: Span,
    ) -> Result<Vec<Prop>, TypeError> {
        let mut out: Vec<Prop> = Vec::with_capacity(props.len());
        for (name, ty) in props {
            if out.iter().any(|p| p.name == *name) {
                return Err(err(TypeErrorKind::DuplicateProperty(name.clone()), span));
            }
            out.push(Prop::new(name.clone(), self.go(*ty, scope)?));
        }
        Ok(out)
    }

    /// Expand an alias body in its own lexical scope: only the alias's
    /// parameters are visible. Parameters are bound to fresh variables and
    /// replaced by the arguments afterwards, so an argument can never be
    /// captured by a binder inside the body.
    fn expand(&mut self, alias: &TypeAlias, args: &[Ty], span: Span) -> Result<Ty, TypeError> {
        let params = alias.params.as_deref().unwrap_or(&[]);
        check_distinct(params, alias.span)?;
        let placeholders: Vec<SmolStr> = params.iter().map(|p| self.fresh.fresh(p)).collect();
        let mut scope: Vec<Bound> = params
            .iter()
            .zip(&placeholders)
            .map(|(p, v)| Bound {
                name: p.clone(),
                ty: Ty::Var(v.clone()),
                is_rec: false,
            })
            .collect();

        self.expanding.push(alias.name.clone());
        let body = self.go(alias.body, &mut scope);
        self.expanding.pop();
        let mut body = body?;

        for (v, arg) in placeholders.iter().zip(args) {
            body = substitute(&body, v, arg, self.fresh);
        }
        if body.occurs_free(&alias.name) {
            body = Ty::rec(alias.name.clone(), body);
            check_contractive(&body, span)?;
        }
        debug!("expanded alias {} to {}", alias.name, body);
        Ok(body)
    }
}

fn err(kind: TypeErrorKind, span: Span) -> TypeError {
    TypeError::new(kind, span)
}

fn check_distinct(names: &[SmolStr], span: Span) -> Result<(), TypeError> {
    for (i, n) in names.iter().enumerate() {
        if names[..i].contains(n) {
            return Err(err(TypeErrorKind::DuplicateTypeParameter(n.clone()), span));
        }
    }
    Ok(())
}

/// A `Rec` whose body, after peeling directly nested `Rec` binders, is one
/// of those binders would unfold forever.
fn check_contractive(ty: &Ty, span: Span) -> Result<(), TypeError> {
    let mut binders = Vec::new();
    let mut cur = ty;
    while let Ty::Rec(name, body) = cur {
        binders.push(name);
        cur = body;
    }
    match cur {
        Ty::Var(v) if binders.contains(&v) => Err(err(
            TypeErrorKind::NonContractiveRecursion(binders[0].clone()),
            span,
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mica_ast::ModuleBuilder;

    fn resolve_in(b: ModuleBuilder, id: TypeExprId) -> Result<Ty, TypeErrorKind> {
        let module = b.finish();
        let mut fresh = FreshNames::new();
        Resolver::new(&module, &mut fresh)
            .resolve(id, &[])
            .map_err(|e| e.kind)
    }

    #[test]
    fn recursive_alias_becomes_rec() {
        let b = ModuleBuilder::new();
        let body = b.t_union(vec![
            ("cons", vec![("head", b.t_number()), ("tail", b.t_var("List"))]),
            ("nil", vec![]),
        ]);
        b.alias("List", body);
        let use_site = b.t_var("List");
        let ty = resolve_in(b, use_site).unwrap();
        insta::assert_snapshot!(
            ty.to_string(),
            @r#"(mu List. ({ tag: "cons"; head: number; tail: List } | { tag: "nil" }))"#
        );
    }

    #[test]
    fn generic_alias_is_instantiated() {
        let b = ModuleBuilder::new();
        let body = b.t_object(&[("value", b.t_var("T")), ("all", b.t_array(b.t_var("T")))]);
        b.generic_alias("Box", &["T"], body);
        let use_site = b.t_app("Box", &[b.t_string()]);
        let ty = resolve_in(b, use_site).unwrap();
        insta::assert_snapshot!(ty.to_string(), @"{ value: string; all: string[] }");
    }

    #[test]
    fn alias_argument_is_not_captured() {
        let b = ModuleBuilder::new();
        // type F<T> = <X>(x: X) => T;  F<X> under an outer X
        let body = b.t_generic(&["X"], b.t_func(&[("x", b.t_var("X"))], b.t_var("T")));
        b.generic_alias("F", &["T"], body);
        let use_site = b.t_generic(&["X"], b.t_app("F", &[b.t_var("X")]));
        let ty = resolve_in(b, use_site).unwrap();
        insta::assert_snapshot!(ty.to_string(), @"<X><X@2>(x: X@2) => X");
    }

    #[test]
    fn alias_errors() {
        let b = ModuleBuilder::new();
        let body = b.t_object(&[("v", b.t_var("T"))]);
        b.generic_alias("Box", &["T"], body);
        b.alias("Num", b.t_number());
        let bare = b.t_var("Box");
        let applied_plain = b.t_app("Num", &[b.t_number()]);
        let too_many = b.t_app("Box", &[b.t_number(), b.t_number()]);
        let missing = b.t_var("Nope");
        let module = b.finish();
        let mut fresh = FreshNames::new();
        let mut r = Resolver::new(&module, &mut fresh);
        let kind = |res: Result<Ty, TypeError>| res.unwrap_err().kind.to_string();
        insta::assert_snapshot!(kind(r.resolve(bare, &[])), @"wrong number of type arguments: expected 1, found 0");
        insta::assert_snapshot!(kind(r.resolve(applied_plain, &[])), @"not a generic type: Num");
        insta::assert_snapshot!(kind(r.resolve(too_many, &[])), @"wrong number of type arguments: expected 1, found 2");
        insta::assert_snapshot!(kind(r.resolve(missing, &[])), @"unbound type variable: Nope");
    }

    #[test]
    fn generic_alias_recursion_is_rejected() {
        let b = ModuleBuilder::new();
        let body = b.t_union(vec![
            ("cons", vec![("head", b.t_var("T")), ("tail", b.t_app("List", &[b.t_var("T")]))]),
            ("nil", vec![]),
        ]);
        b.generic_alias("List", &["T"], body);
        let use_site = b.t_app("List", &[b.t_number()]);
        assert_eq!(
            resolve_in(b, use_site),
            Err(TypeErrorKind::UnsupportedTypeRecursionInGenerics("List".into()))
        );
    }

    #[test]
    fn type_variable_applied_to_arguments() {
        let b = ModuleBuilder::new();
        let use_site = b.t_generic(&["T"], b.t_app("T", &[b.t_number()]));
        assert_eq!(
            resolve_in(b, use_site),
            Err(TypeErrorKind::NotGeneric("T".into()))
        );
    }

    #[test]
    fn structural_well_formedness() {
        let b = ModuleBuilder::new();
        let dup_prop = b.t_object(&[("a", b.t_number()), ("a", b.t_string())]);
        let dup_variant = b.t_union(vec![("a", vec![]), ("a", vec![])]);
        let dup_param = b.t_generic(&["X", "X"], b.t_var("X"));
        let nested_rec = b.t_rec("R", b.t_array(b.t_rec("R", b.t_array(b.t_var("R")))));
        let loops = b.t_rec("R", b.t_rec("S", b.t_var("R")));
        let unbound = b.t_array(b.t_var("Q"));
        let module = b.finish();
        let mut fresh = FreshNames::new();
        let mut r = Resolver::new(&module, &mut fresh);
        let kind = |res: Result<Ty, TypeError>| res.unwrap_err().kind;
        assert_eq!(kind(r.resolve(dup_prop, &[])), TypeErrorKind::DuplicateProperty("a".into()));
        assert_eq!(kind(r.resolve(dup_variant, &[])), TypeErrorKind::DuplicateVariant("a".into()));
        assert_eq!(kind(r.resolve(dup_param, &[])), TypeErrorKind::DuplicateTypeParameter("X".into()));
        assert_eq!(kind(r.resolve(nested_rec, &[])), TypeErrorKind::DuplicateTypeParameter("R".into()));
        assert_eq!(kind(r.resolve(loops, &[])), TypeErrorKind::NonContractiveRecursion("R".into()));
        assert_eq!(kind(r.resolve(unbound, &[])), TypeErrorKind::UnboundTypeVariable("Q".into()));
    }

    #[test]
    fn scope_variables_resolve_to_themselves() {
        let b = ModuleBuilder::new();
        let id = b.t_func(&[("x", b.t_var("T"))], b.t_var("T"));
        let module = b.finish();
        let mut fresh = FreshNames::new();
        let ty = Resolver::new(&module, &mut fresh)
            .resolve(id, &[TyVar::new("T", "T")])
            .unwrap();
        insta::assert_snapshot!(ty.to_string(), @"(x: T) => T");
    }

    #[test]
    fn renamed_scope_variables_resolve_to_their_variable() {
        let b = ModuleBuilder::new();
        let id = b.t_func(&[("x", b.t_var("T"))], b.t_var("U"));
        let module = b.finish();
        let mut fresh = FreshNames::new();
        let scope = [TyVar::new("U", "U"), TyVar::new("T", "T@1")];
        let ty = Resolver::new(&module, &mut fresh).resolve(id, &scope).unwrap();
        insta::assert_snapshot!(ty.to_string(), @"(x: T@1) => U");
    }
}
