use log::debug;
use mica_ast::{Clause, ExprId, ExprKind, Module, PropInit, Span, TypeExprId};
use smol_str::SmolStr;

use crate::compat::{self, Mode};
use crate::config::CheckConfig;
use crate::env::TypeEnv;
use crate::error::{MismatchSite, TypeError, TypeErrorKind};
use crate::narrow::{self, Refinement};
use crate::resolve::{Resolver, TyVar};
use crate::subst::{self, FreshNames};
use crate::types::{find_variant, Param, Prop, Ty, Variant};

// ── Type checker ─────────────────────────────────────────────────

pub(crate) struct TypeChecker<'a> {
    module: &'a Module,
    config: &'a CheckConfig,
    /// Fresh-name supply for this check only.
    fresh: FreshNames,
}

fn err(kind: TypeErrorKind, span: Span) -> TypeError {
    TypeError::new(kind, span)
}

fn expected_kind(expected: &'static str, found: &Ty, span: Span) -> TypeError {
    err(
        TypeErrorKind::ExpectedKind {
            expected,
            found: found.clone(),
        },
        span,
    )
}

/// The side that is not the fall-through placeholder.
fn join(a: Ty, b: Ty) -> Ty {
    if a == Ty::Undefined {
        b
    } else {
        a
    }
}

impl<'a> TypeChecker<'a> {
    pub(crate) fn new(module: &'a Module, config: &'a CheckConfig) -> Self {
        Self {
            module,
            config,
            fresh: FreshNames::new(),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn span(&self, id: ExprId) -> Span {
        self.module.exprs[id].span
    }

    pub(crate) fn resolve(&mut self, id: TypeExprId, tyvars: &[TyVar]) -> Result<Ty, TypeError> {
        Resolver::new(self.module, &mut self.fresh).resolve(id, tyvars)
    }

    fn compatible(&mut self, expected: &Ty, actual: &Ty, mode: Mode, tyvars: &[TyVar]) -> bool {
        let scope: Vec<SmolStr> = tyvars.iter().map(|v| v.var.clone()).collect();
        compat::compatible(expected, actual, mode, &scope, &mut self.fresh)
    }

    fn unfold(&mut self, ty: &Ty) -> Ty {
        subst::unfold(ty, &mut self.fresh)
    }

    fn require(
        &mut self,
        site: MismatchSite,
        expected: &Ty,
        found: &Ty,
        mode: Mode,
        span: Span,
        tyvars: &[TyVar],
    ) -> Result<(), TypeError> {
        if self.compatible(expected, found, mode, tyvars) {
            Ok(())
        } else {
            Err(err(
                TypeErrorKind::TypeMismatch {
                    site,
                    expected: expected.clone(),
                    found: found.clone(),
                },
                span,
            ))
        }
    }

    fn require_prim(
        &mut self,
        ty: &Ty,
        want: Ty,
        name: &'static str,
        span: Span,
    ) -> Result<(), TypeError> {
        if self.unfold(ty) == want {
            Ok(())
        } else {
            Err(expected_kind(name, ty, span))
        }
    }

    fn array_elem(&mut self, ty: &Ty, span: Span) -> Result<Ty, TypeError> {
        match self.unfold(ty) {
            Ty::Array(elem) => Ok(*elem),
            _ => Err(expected_kind("array", ty, span)),
        }
    }

    fn map_elem(&mut self, ty: &Ty, span: Span) -> Result<Ty, TypeError> {
        match self.unfold(ty) {
            Ty::Map(elem) => Ok(*elem),
            _ => Err(expected_kind("map", ty, span)),
        }
    }

    fn union_variants(&mut self, ty: &Ty, span: Span) -> Result<Vec<Variant>, TypeError> {
        match self.unfold(ty) {
            Ty::TaggedUnion(variants) => Ok(variants),
            _ => Err(expected_kind("tagged union", ty, span)),
        }
    }

    fn resolve_params(
        &mut self,
        params: &[mica_ast::Param],
        tyvars: &[TyVar],
    ) -> Result<Vec<Param>, TypeError> {
        let mut out = Vec::with_capacity(params.len());
        for p in params {
            out.push(Param::new(p.name.clone(), self.resolve(p.type_ann, tyvars)?));
        }
        Ok(out)
    }

    // ── Judgement ────────────────────────────────────────────────

    pub(crate) fn check_expr(
        &mut self,
        id: ExprId,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let module = self.module;
        let expr = &module.exprs[id];
        let span = expr.span;
        match &expr.kind {
            ExprKind::Bool(_) => Ok(Ty::Boolean),
            ExprKind::Number(_) => Ok(Ty::Number),
            ExprKind::String(_) => Ok(Ty::String),
            ExprKind::Undefined => Ok(Ty::Undefined),

            ExprKind::Not(cond) => {
                let ty = self.check_expr(*cond, env, tyvars)?;
                self.require_prim(&ty, Ty::Boolean, "boolean", self.span(*cond))?;
                Ok(Ty::Boolean)
            }

            ExprKind::Compare { left, right, .. } => {
                let l = self.check_expr(*left, env, tyvars)?;
                let r = self.check_expr(*right, env, tyvars)?;
                self.require(MismatchSite::Comparison, &l, &r, Mode::Equal, span, tyvars)?;
                Ok(Ty::Boolean)
            }

            ExprKind::If { cond, thn, els } => self.check_if(*cond, *thn, *els, span, env, tyvars),

            ExprKind::Add { left, right } => {
                let l = self.check_expr(*left, env, tyvars)?;
                self.require_prim(&l, Ty::Number, "number", self.span(*left))?;
                let r = self.check_expr(*right, env, tyvars)?;
                self.require_prim(&r, Ty::Number, "number", self.span(*right))?;
                Ok(Ty::Number)
            }

            ExprKind::Var(name) => env
                .lookup(name)
                .cloned()
                .ok_or_else(|| err(TypeErrorKind::UnboundVariable(name.clone()), span)),

            ExprKind::Func {
                params,
                ret_type,
                body,
            } => {
                let params = self.resolve_params(params, tyvars)?;
                let body_env =
                    env.extend_many(params.iter().map(|p| (p.name.clone(), p.ty.clone())));
                let body_ty = self.check_expr(*body, &body_env, tyvars)?;
                let ret = match ret_type {
                    Some(declared) => {
                        let declared = self.resolve(*declared, tyvars)?;
                        self.require_return(&declared, &body_ty, span, tyvars)?;
                        declared
                    }
                    None => body_ty,
                };
                Ok(Ty::func(params, ret))
            }

            ExprKind::Call { func, args } => self.check_call(*func, args, span, env, tyvars),

            ExprKind::Seq { body, rest } => {
                self.check_expr(*body, env, tyvars)?;
                self.check_expr(*rest, env, tyvars)
            }

            ExprKind::Const { name, init, rest } => {
                let ty = self.check_expr(*init, env, tyvars)?;
                self.check_expr(*rest, &env.extend(name.clone(), ty), tyvars)
            }

            ExprKind::Assign { name, init } => {
                let Some(bound) = env.lookup(name).cloned() else {
                    return Err(err(TypeErrorKind::UnboundVariable(name.clone()), span));
                };
                let ty = self.check_expr(*init, env, tyvars)?;
                let mode = self.config.assignment_mode;
                self.require(MismatchSite::Assignment, &bound, &ty, mode, self.span(*init), tyvars)?;
                Ok(ty)
            }

            ExprKind::For {
                ary,
                idx,
                body,
                rest,
            } => {
                let ary_ty = self.check_expr(*ary, env, tyvars)?;
                self.array_elem(&ary_ty, self.span(*ary))?;
                let body_env = env.extend(idx.clone(), Ty::Number);
                self.check_loop(*body, &body_env, *rest, env, span, tyvars)
            }

            ExprKind::ForOf {
                ary,
                var,
                body,
                rest,
            } => {
                let ary_ty = self.check_expr(*ary, env, tyvars)?;
                let elem = self.array_elem(&ary_ty, self.span(*ary))?;
                let body_env = env.extend(var.clone(), elem);
                self.check_loop(*body, &body_env, *rest, env, span, tyvars)
            }

            ExprKind::ArrayNew(ty) => {
                let ty = self.resolve(*ty, tyvars)?;
                self.array_elem(&ty, span)?;
                Ok(ty)
            }

            ExprKind::ArrayExt { ary, val } => {
                let ary_ty = self.check_expr(*ary, env, tyvars)?;
                let elem = self.array_elem(&ary_ty, self.span(*ary))?;
                let val_ty = self.check_expr(*val, env, tyvars)?;
                self.require(MismatchSite::Value, &elem, &val_ty, Mode::Equal, self.span(*val), tyvars)?;
                Ok(ary_ty)
            }

            ExprKind::MapNew(ty) => {
                let ty = self.resolve(*ty, tyvars)?;
                self.map_elem(&ty, span)?;
                Ok(ty)
            }

            ExprKind::MapCopy(map) => {
                let map_ty = self.check_expr(*map, env, tyvars)?;
                self.map_elem(&map_ty, self.span(*map))?;
                Ok(map_ty)
            }

            ExprKind::MapExt { map, key, val } => {
                let map_ty = self.check_expr(*map, env, tyvars)?;
                let elem = self.map_elem(&map_ty, self.span(*map))?;
                let key_ty = self.check_expr(*key, env, tyvars)?;
                self.require_prim(&key_ty, Ty::String, "string", self.span(*key))?;
                let val_ty = self.check_expr(*val, env, tyvars)?;
                self.require(MismatchSite::Value, &elem, &val_ty, Mode::Equal, self.span(*val), tyvars)?;
                Ok(map_ty)
            }

            ExprKind::MapIn { map, key } => {
                let map_ty = self.check_expr(*map, env, tyvars)?;
                self.map_elem(&map_ty, self.span(*map))?;
                let key_ty = self.check_expr(*key, env, tyvars)?;
                self.require_prim(&key_ty, Ty::String, "string", self.span(*key))?;
                Ok(Ty::Boolean)
            }

            ExprKind::Member { base, index } => {
                let base_ty = self.check_expr(*base, env, tyvars)?;
                let index_ty = self.check_expr(*index, env, tyvars)?;
                match self.unfold(&base_ty) {
                    Ty::Array(elem) => {
                        self.require_prim(&index_ty, Ty::Number, "number", self.span(*index))?;
                        Ok(*elem)
                    }
                    Ty::Map(elem) => {
                        self.require_prim(&index_ty, Ty::String, "string", self.span(*index))?;
                        Ok(*elem)
                    }
                    _ => Err(expected_kind("array or map", &base_ty, self.span(*base))),
                }
            }

            ExprKind::ObjectNew(props) => {
                let props = self.check_props(props, span, env, tyvars)?;
                Ok(Ty::Object(props))
            }

            ExprKind::ObjectGet { obj, prop } => self.check_object_get(*obj, prop, span, env, tyvars),

            ExprKind::TaggedUnionNew {
                label,
                props,
                as_type,
            } => self.check_union_new(label, props, *as_type, span, env, tyvars),

            ExprKind::TaggedUnionExt { term, as_type } => {
                self.check_union_ext(*term, *as_type, span, env, tyvars)
            }

            ExprKind::TaggedUnionGet {
                var,
                clauses,
                default,
            } => self.check_dispatch(var, clauses, *default, span, env, tyvars),

            ExprKind::RecFunc {
                name,
                params,
                ret_type,
                body,
                rest,
            } => {
                let params = self.resolve_params(params, tyvars)?;
                let ret = self.resolve(*ret_type, tyvars)?;
                let func_ty = Ty::func(params.clone(), ret.clone());
                let body_env = env
                    .extend_many(params.into_iter().map(|p| (p.name, p.ty)))
                    .extend(name.clone(), func_ty.clone());
                let body_ty = self.check_expr(*body, &body_env, tyvars)?;
                self.require_return(&ret, &body_ty, span, tyvars)?;
                self.check_expr(*rest, &env.extend(name.clone(), func_ty), tyvars)
            }

            ExprKind::TypeAbs { type_params, body } => {
                for (i, p) in type_params.iter().enumerate() {
                    if type_params[..i].contains(p) {
                        return Err(err(TypeErrorKind::DuplicateTypeParameter(p.clone()), span));
                    }
                }
                // A reused name gets a fresh variable so the outer one stays
                // distinguishable in the body's type.
                let mut inner = tyvars.to_vec();
                let mut vars = Vec::with_capacity(type_params.len());
                for p in type_params {
                    let var = if tyvars.iter().any(|v| v.name == *p || v.var == *p) {
                        self.fresh.fresh(p)
                    } else {
                        p.clone()
                    };
                    inner.push(TyVar::new(p.clone(), var.clone()));
                    vars.push(var);
                }
                let body_ty = self.check_expr(*body, env, &inner)?;
                Ok(Ty::generic(vars, body_ty))
            }

            ExprKind::TypeApp { target, type_args } => {
                self.check_type_app(*target, type_args, span, env, tyvars)
            }
        }
    }

    fn require_return(
        &mut self,
        declared: &Ty,
        body: &Ty,
        span: Span,
        tyvars: &[TyVar],
    ) -> Result<(), TypeError> {
        if self.compatible(declared, body, Mode::Equal, tyvars) {
            Ok(())
        } else {
            Err(err(
                TypeErrorKind::WrongDeclaredReturnType {
                    expected: declared.clone(),
                    found: body.clone(),
                },
                span,
            ))
        }
    }

    fn check_props(
        &mut self,
        props: &[PropInit],
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Vec<Prop>, TypeError> {
        let mut out: Vec<Prop> = Vec::with_capacity(props.len());
        for p in props {
            if out.iter().any(|q| q.name == p.name) {
                return Err(err(TypeErrorKind::DuplicateProperty(p.name.clone()), span));
            }
            let ty = self.check_expr(p.value, env, tyvars)?;
            out.push(Prop::new(p.name.clone(), ty));
        }
        Ok(out)
    }

    // ── Conditionals ─────────────────────────────────────────────

    fn check_if(
        &mut self,
        cond: ExprId,
        thn: ExprId,
        els: ExprId,
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let (thn_env, els_env) = match self.narrowed(cond, env)? {
            Some(envs) => envs,
            None => {
                let cond_ty = self.check_expr(cond, env, tyvars)?;
                self.require_prim(&cond_ty, Ty::Boolean, "boolean", self.span(cond))?;
                (env.clone(), env.clone())
            }
        };
        let thn_ty = self.check_expr(thn, &thn_env, tyvars)?;
        let els_ty = self.check_expr(els, &els_env, tyvars)?;
        self.require(MismatchSite::Branches, &thn_ty, &els_ty, Mode::Equal, span, tyvars)?;
        Ok(join(thn_ty, els_ty))
    }

    /// Branch environments for a recognized narrowing condition, or `None`
    /// when the condition has another shape or the variable's type does not
    /// fit the shape.
    fn narrowed(
        &mut self,
        cond: ExprId,
        env: &TypeEnv,
    ) -> Result<Option<(TypeEnv, TypeEnv)>, TypeError> {
        let Some(refinement) = narrow::refinement(self.module, cond) else {
            return Ok(None);
        };
        match refinement {
            Refinement::Present(var) => Ok(self.narrow_option(var, env)),
            Refinement::Absent(var) => Ok(self
                .narrow_option(var, env)
                .map(|(present, unchanged)| (unchanged, present))),
            Refinement::Tag {
                var,
                label,
                matches,
            } => {
                let Some(ty) = env.lookup(&var) else {
                    return Ok(None);
                };
                let Ty::TaggedUnion(variants) = self.unfold(ty) else {
                    return Ok(None);
                };
                let (hit, rest): (Vec<Variant>, Vec<Variant>) =
                    variants.into_iter().partition(|v| v.label == label);
                if hit.is_empty() {
                    return Err(err(TypeErrorKind::UnknownVariant(label), self.span(cond)));
                }
                debug!(
                    "narrowing {} on tag {:?}: {} variant(s) remain in the other branch",
                    var,
                    label,
                    rest.len()
                );
                let hit_env = env.extend(var.clone(), Ty::TaggedUnion(hit));
                let rest_env = env.extend(var, Ty::TaggedUnion(rest));
                if matches {
                    Ok(Some((hit_env, rest_env)))
                } else {
                    Ok(Some((rest_env, hit_env)))
                }
            }
        }
    }

    /// `(env with var: T, env)` when `var: T | undefined`.
    fn narrow_option(&mut self, var: SmolStr, env: &TypeEnv) -> Option<(TypeEnv, TypeEnv)> {
        let ty = env.lookup(&var)?;
        let Ty::Option(elem) = self.unfold(ty) else {
            return None;
        };
        debug!("narrowing {} to {}", var, elem);
        Some((env.extend(var, *elem), env.clone()))
    }

    fn check_loop(
        &mut self,
        body: ExprId,
        body_env: &TypeEnv,
        rest: ExprId,
        env: &TypeEnv,
        span: Span,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let body_ty = self.check_expr(body, body_env, tyvars)?;
        let rest_ty = self.check_expr(rest, env, tyvars)?;
        self.require(MismatchSite::LoopResult, &body_ty, &rest_ty, Mode::Equal, span, tyvars)?;
        Ok(join(body_ty, rest_ty))
    }

    // ── Functions ────────────────────────────────────────────────

    fn check_call(
        &mut self,
        func: ExprId,
        args: &[ExprId],
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let func_ty = self.check_expr(func, env, tyvars)?;
        let Ty::Func(params, ret) = self.unfold(&func_ty) else {
            return Err(expected_kind("function", &func_ty, self.span(func)));
        };
        if params.len() != args.len() {
            return Err(err(
                TypeErrorKind::ArityMismatch {
                    expected: params.len(),
                    found: args.len(),
                },
                span,
            ));
        }
        let mode = self.config.argument_mode;
        for (param, arg) in params.iter().zip(args) {
            let arg_ty = self.check_expr(*arg, env, tyvars)?;
            self.require(MismatchSite::Argument, &param.ty, &arg_ty, mode, self.span(*arg), tyvars)?;
        }
        Ok(*ret)
    }

    fn check_type_app(
        &mut self,
        target: ExprId,
        type_args: &[TypeExprId],
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let target_ty = self.check_expr(target, env, tyvars)?;
        let Ty::Generic(params, body) = self.unfold(&target_ty) else {
            return Err(expected_kind("generic", &target_ty, self.span(target)));
        };
        if params.len() != type_args.len() {
            return Err(err(
                TypeErrorKind::GenericArityMismatch {
                    expected: params.len(),
                    found: type_args.len(),
                },
                span,
            ));
        }
        let mut args = Vec::with_capacity(type_args.len());
        for a in type_args {
            args.push(self.resolve(*a, tyvars)?);
        }

        // Substitution runs parameter by parameter. If an argument mentions a
        // later parameter's name, rename the parameters first so the later
        // step cannot rewrite it.
        let clash = args
            .iter()
            .enumerate()
            .any(|(i, a)| params[i + 1..].iter().any(|p| a.occurs_free(p)));
        let mut ty = *body;
        let mut names = params.clone();
        if clash {
            for name in &mut names {
                let renamed = self.fresh.fresh(name);
                ty = subst::substitute(&ty, name, &Ty::Var(renamed.clone()), &mut self.fresh);
                *name = renamed;
            }
        }
        for (name, arg) in names.iter().zip(&args) {
            ty = subst::substitute(&ty, name, arg, &mut self.fresh);
        }
        debug!(
            "instantiated <{}> with [{}]: {}",
            params.join(", "),
            args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", "),
            ty
        );
        Ok(ty)
    }

    // ── Objects and tagged unions ────────────────────────────────

    fn check_object_get(
        &mut self,
        obj: ExprId,
        prop: &SmolStr,
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let obj_ty = self.check_expr(obj, env, tyvars)?;
        let unknown = || err(TypeErrorKind::UnknownProperty(prop.clone()), span);
        match self.unfold(&obj_ty) {
            Ty::Object(props) => props
                .into_iter()
                .find(|p| p.name == *prop)
                .map(|p| p.ty)
                .ok_or_else(unknown),
            // `tag` is readable on every union, so it shadows a variant
            // property of the same name.
            Ty::TaggedUnion(_) if prop.as_str() == "tag" => Ok(Ty::String),
            Ty::TaggedUnion(mut variants) if variants.len() == 1 => variants
                .remove(0)
                .props
                .into_iter()
                .find(|p| p.name == *prop)
                .map(|p| p.ty)
                .ok_or_else(unknown),
            Ty::TaggedUnion(_) => Err(unknown()),
            Ty::Array(elem) => {
                let predicate = || {
                    Param::new(
                        "f",
                        Ty::func(vec![Param::new("x", (*elem).clone())], Ty::Boolean),
                    )
                };
                match prop.as_str() {
                    "length" => Ok(Ty::Number),
                    "find" => Ok(Ty::func(vec![predicate()], Ty::option((*elem).clone()))),
                    "filter" => Ok(Ty::func(vec![predicate()], Ty::array((*elem).clone()))),
                    _ => Err(unknown()),
                }
            }
            _ => Err(expected_kind("object", &obj_ty, self.span(obj))),
        }
    }

    fn check_union_new(
        &mut self,
        label: &SmolStr,
        props: &[PropInit],
        as_type: TypeExprId,
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let as_ty = self.resolve(as_type, tyvars)?;
        let variants = self.union_variants(&as_ty, span)?;
        let Some(variant) = find_variant(&variants, label) else {
            return Err(err(TypeErrorKind::UnknownVariant(label.clone()), span));
        };
        let mut supplied: Vec<&SmolStr> = Vec::with_capacity(props.len());
        for p in props {
            if supplied.contains(&&p.name) {
                return Err(err(TypeErrorKind::DuplicateProperty(p.name.clone()), span));
            }
            supplied.push(&p.name);
            let Some(declared) = variant.prop(&p.name) else {
                return Err(err(TypeErrorKind::UnknownProperty(p.name.clone()), span));
            };
            let actual = self.check_expr(p.value, env, tyvars)?;
            self.require(
                MismatchSite::UnionTerm,
                &declared.ty,
                &actual,
                Mode::Equal,
                self.span(p.value),
                tyvars,
            )?;
        }
        Ok(as_ty)
    }

    fn check_union_ext(
        &mut self,
        term: ExprId,
        as_type: TypeExprId,
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let term_ty = self.check_expr(term, env, tyvars)?;
        let as_ty = self.resolve(as_type, tyvars)?;
        let target = self.union_variants(&as_ty, span)?;
        let source = self.union_variants(&term_ty, self.span(term))?;
        for v in &source {
            let Some(w) = find_variant(&target, &v.label) else {
                return Err(err(TypeErrorKind::UnknownVariant(v.label.clone()), span));
            };
            for p in &v.props {
                let Some(q) = w.prop(&p.name) else {
                    return Err(err(TypeErrorKind::UnknownProperty(p.name.clone()), span));
                };
                self.require(MismatchSite::UnionTerm, &q.ty, &p.ty, Mode::Equal, span, tyvars)?;
            }
            if let Some(q) = w.props.iter().find(|q| v.prop(&q.name).is_none()) {
                return Err(err(TypeErrorKind::UnknownProperty(q.name.clone()), span));
            }
        }
        Ok(as_ty)
    }

    /// `switch (var.tag)`: each clause sees `var` as the object of its
    /// variant's properties; the default clause sees the uncovered variants.
    fn check_dispatch(
        &mut self,
        var: &SmolStr,
        clauses: &[Clause],
        default: Option<ExprId>,
        span: Span,
        env: &TypeEnv,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        let Some(bound) = env.lookup(var).cloned() else {
            return Err(err(TypeErrorKind::UnboundVariable(var.clone()), span));
        };
        let variants = self.union_variants(&bound, span)?;

        let mut covered: Vec<&SmolStr> = Vec::with_capacity(clauses.len());
        let mut result: Option<Ty> = None;
        for clause in clauses {
            let clause_span = self.span(clause.body);
            if covered.contains(&&clause.label) {
                return Err(err(TypeErrorKind::DuplicateVariant(clause.label.clone()), clause_span));
            }
            let Some(variant) = find_variant(&variants, &clause.label) else {
                return Err(err(TypeErrorKind::UnknownVariant(clause.label.clone()), clause_span));
            };
            covered.push(&clause.label);
            let local = env.extend(var.clone(), Ty::Object(variant.props.clone()));
            let ty = self.check_expr(clause.body, &local, tyvars)?;
            result = Some(self.join_clause(result, ty, span, tyvars)?);
        }

        let remaining: Vec<Variant> = variants
            .iter()
            .filter(|v| !covered.contains(&&v.label))
            .cloned()
            .collect();
        debug!(
            "dispatch on {}: {} clause(s), {} variant(s) left",
            var,
            clauses.len(),
            remaining.len()
        );
        match default {
            Some(body) => {
                let local = env.extend(var.clone(), Ty::TaggedUnion(remaining));
                let ty = self.check_expr(body, &local, tyvars)?;
                result = Some(self.join_clause(result, ty, span, tyvars)?);
            }
            None if !remaining.is_empty() => {
                return Err(err(
                    TypeErrorKind::NonExhaustiveDispatch {
                        missing: remaining.into_iter().map(|v| v.label).collect(),
                    },
                    span,
                ));
            }
            None => {}
        }
        Ok(result.unwrap_or(Ty::Undefined))
    }

    fn join_clause(
        &mut self,
        acc: Option<Ty>,
        ty: Ty,
        span: Span,
        tyvars: &[TyVar],
    ) -> Result<Ty, TypeError> {
        match acc {
            None => Ok(ty),
            Some(prev) => {
                self.require(MismatchSite::Clauses, &prev, &ty, Mode::Equal, span, tyvars)?;
                Ok(join(prev, ty))
            }
        }
    }
}
