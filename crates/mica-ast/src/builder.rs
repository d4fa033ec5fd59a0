//! Programmatic construction of a [`Module`].
//!
//! Front ends and tests build term trees through `ModuleBuilder`. Every
//! method takes `&self`, so nested calls such as
//! `b.add(b.num(1.0), b.num(2.0))` work without temporaries. Each allocated
//! node receives its own span, numbered in allocation order.

use std::cell::{Cell, RefCell};

use smol_str::SmolStr;

use crate::*;

pub struct ModuleBuilder {
    module: RefCell<Module>,
    next_offset: Cell<u32>,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self {
            module: RefCell::new(Module::new()),
            next_offset: Cell::new(0),
        }
    }

    pub fn finish(self) -> Module {
        self.module.into_inner()
    }

    fn next_span(&self) -> Span {
        let start = self.next_offset.get();
        self.next_offset.set(start + 1);
        Span::new(start, start + 1)
    }

    pub fn expr(&self, kind: ExprKind) -> ExprId {
        let span = self.next_span();
        self.module.borrow_mut().alloc_expr(kind, span)
    }

    pub fn ty(&self, kind: TypeExprKind) -> TypeExprId {
        let span = self.next_span();
        self.module.borrow_mut().alloc_type(kind, span)
    }

    pub fn span_of(&self, id: ExprId) -> Span {
        self.module.borrow().exprs[id].span
    }

    /// Declare `type name = body`.
    pub fn alias(&self, name: &str, body: TypeExprId) {
        self.push_alias(name, None, body);
    }

    /// Declare `type name<params> = body`.
    pub fn generic_alias(&self, name: &str, params: &[&str], body: TypeExprId) {
        self.push_alias(name, Some(names(params)), body);
    }

    fn push_alias(&self, name: &str, params: Option<Vec<SmolStr>>, body: TypeExprId) {
        let span = self.next_span();
        self.module.borrow_mut().type_aliases.push(TypeAlias {
            name: SmolStr::new(name),
            params,
            body,
            span,
        });
    }

    // ── Terms ────────────────────────────────────────────────────

    pub fn bool(&self, value: bool) -> ExprId {
        self.expr(ExprKind::Bool(value))
    }

    pub fn num(&self, value: f64) -> ExprId {
        self.expr(ExprKind::Number(value))
    }

    pub fn string(&self, value: &str) -> ExprId {
        self.expr(ExprKind::String(SmolStr::new(value)))
    }

    pub fn undefined(&self) -> ExprId {
        self.expr(ExprKind::Undefined)
    }

    pub fn not(&self, cond: ExprId) -> ExprId {
        self.expr(ExprKind::Not(cond))
    }

    pub fn eq(&self, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Compare {
            op: CompareOp::StrictEq,
            left,
            right,
        })
    }

    pub fn ne(&self, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Compare {
            op: CompareOp::StrictNe,
            left,
            right,
        })
    }

    pub fn if_(&self, cond: ExprId, thn: ExprId, els: ExprId) -> ExprId {
        self.expr(ExprKind::If { cond, thn, els })
    }

    pub fn add(&self, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Add { left, right })
    }

    pub fn var(&self, name: &str) -> ExprId {
        self.expr(ExprKind::Var(SmolStr::new(name)))
    }

    pub fn func(&self, params: &[(&str, TypeExprId)], body: ExprId) -> ExprId {
        self.expr(ExprKind::Func {
            params: params_of(params),
            ret_type: None,
            body,
        })
    }

    pub fn func_ret(&self, params: &[(&str, TypeExprId)], ret: TypeExprId, body: ExprId) -> ExprId {
        self.expr(ExprKind::Func {
            params: params_of(params),
            ret_type: Some(ret),
            body,
        })
    }

    pub fn call(&self, func: ExprId, args: &[ExprId]) -> ExprId {
        self.expr(ExprKind::Call {
            func,
            args: args.to_vec(),
        })
    }

    pub fn seq(&self, body: ExprId, rest: ExprId) -> ExprId {
        self.expr(ExprKind::Seq { body, rest })
    }

    pub fn let_(&self, name: &str, init: ExprId, rest: ExprId) -> ExprId {
        self.expr(ExprKind::Const {
            name: SmolStr::new(name),
            init,
            rest,
        })
    }

    pub fn assign(&self, name: &str, init: ExprId) -> ExprId {
        self.expr(ExprKind::Assign {
            name: SmolStr::new(name),
            init,
        })
    }

    pub fn for_(&self, ary: ExprId, idx: &str, body: ExprId, rest: ExprId) -> ExprId {
        self.expr(ExprKind::For {
            ary,
            idx: SmolStr::new(idx),
            body,
            rest,
        })
    }

    pub fn for_of(&self, ary: ExprId, var: &str, body: ExprId, rest: ExprId) -> ExprId {
        self.expr(ExprKind::ForOf {
            ary,
            var: SmolStr::new(var),
            body,
            rest,
        })
    }

    pub fn array_new(&self, ty: TypeExprId) -> ExprId {
        self.expr(ExprKind::ArrayNew(ty))
    }

    pub fn array_ext(&self, ary: ExprId, val: ExprId) -> ExprId {
        self.expr(ExprKind::ArrayExt { ary, val })
    }

    pub fn map_new(&self, ty: TypeExprId) -> ExprId {
        self.expr(ExprKind::MapNew(ty))
    }

    pub fn map_copy(&self, map: ExprId) -> ExprId {
        self.expr(ExprKind::MapCopy(map))
    }

    pub fn map_ext(&self, map: ExprId, key: ExprId, val: ExprId) -> ExprId {
        self.expr(ExprKind::MapExt { map, key, val })
    }

    pub fn map_in(&self, map: ExprId, key: ExprId) -> ExprId {
        self.expr(ExprKind::MapIn { map, key })
    }

    pub fn member(&self, base: ExprId, index: ExprId) -> ExprId {
        self.expr(ExprKind::Member { base, index })
    }

    pub fn object(&self, props: &[(&str, ExprId)]) -> ExprId {
        self.expr(ExprKind::ObjectNew(props_of(props)))
    }

    pub fn get(&self, obj: ExprId, prop: &str) -> ExprId {
        self.expr(ExprKind::ObjectGet {
            obj,
            prop: SmolStr::new(prop),
        })
    }

    pub fn union_new(&self, label: &str, props: &[(&str, ExprId)], as_type: TypeExprId) -> ExprId {
        self.expr(ExprKind::TaggedUnionNew {
            label: SmolStr::new(label),
            props: props_of(props),
            as_type,
        })
    }

    pub fn union_ext(&self, term: ExprId, as_type: TypeExprId) -> ExprId {
        self.expr(ExprKind::TaggedUnionExt { term, as_type })
    }

    pub fn switch(&self, var: &str, clauses: &[(&str, ExprId)], default: Option<ExprId>) -> ExprId {
        self.expr(ExprKind::TaggedUnionGet {
            var: SmolStr::new(var),
            clauses: clauses
                .iter()
                .map(|(label, body)| Clause {
                    label: SmolStr::new(label),
                    body: *body,
                })
                .collect(),
            default,
        })
    }

    pub fn rec_func(
        &self,
        name: &str,
        params: &[(&str, TypeExprId)],
        ret: TypeExprId,
        body: ExprId,
        rest: ExprId,
    ) -> ExprId {
        self.expr(ExprKind::RecFunc {
            name: SmolStr::new(name),
            params: params_of(params),
            ret_type: ret,
            body,
            rest,
        })
    }

    pub fn type_abs(&self, type_params: &[&str], body: ExprId) -> ExprId {
        self.expr(ExprKind::TypeAbs {
            type_params: names(type_params),
            body,
        })
    }

    pub fn type_app(&self, target: ExprId, type_args: &[TypeExprId]) -> ExprId {
        self.expr(ExprKind::TypeApp {
            target,
            type_args: type_args.to_vec(),
        })
    }

    // ── Types ────────────────────────────────────────────────────

    pub fn t_boolean(&self) -> TypeExprId {
        self.ty(TypeExprKind::Boolean)
    }

    pub fn t_number(&self) -> TypeExprId {
        self.ty(TypeExprKind::Number)
    }

    pub fn t_string(&self) -> TypeExprId {
        self.ty(TypeExprKind::String)
    }

    pub fn t_undefined(&self) -> TypeExprId {
        self.ty(TypeExprKind::Undefined)
    }

    pub fn t_option(&self, elem: TypeExprId) -> TypeExprId {
        self.ty(TypeExprKind::Option(elem))
    }

    pub fn t_array(&self, elem: TypeExprId) -> TypeExprId {
        self.ty(TypeExprKind::Array(elem))
    }

    pub fn t_map(&self, elem: TypeExprId) -> TypeExprId {
        self.ty(TypeExprKind::Map(elem))
    }

    pub fn t_func(&self, params: &[(&str, TypeExprId)], ret: TypeExprId) -> TypeExprId {
        self.ty(TypeExprKind::Func {
            params: fields_of(params),
            ret,
        })
    }

    pub fn t_object(&self, props: &[(&str, TypeExprId)]) -> TypeExprId {
        self.ty(TypeExprKind::Object(fields_of(props)))
    }

    pub fn t_union(&self, variants: Vec<(&str, Vec<(&str, TypeExprId)>)>) -> TypeExprId {
        let variants = variants
            .into_iter()
            .map(|(label, props)| VariantExpr {
                label: SmolStr::new(label),
                props: fields_of(&props),
            })
            .collect();
        self.ty(TypeExprKind::TaggedUnion(variants))
    }

    pub fn t_rec(&self, name: &str, body: TypeExprId) -> TypeExprId {
        self.ty(TypeExprKind::Rec {
            name: SmolStr::new(name),
            body,
        })
    }

    pub fn t_generic(&self, type_params: &[&str], body: TypeExprId) -> TypeExprId {
        self.ty(TypeExprKind::Generic {
            type_params: names(type_params),
            body,
        })
    }

    pub fn t_var(&self, name: &str) -> TypeExprId {
        self.ty(TypeExprKind::Named {
            name: SmolStr::new(name),
            args: None,
        })
    }

    pub fn t_app(&self, name: &str, args: &[TypeExprId]) -> TypeExprId {
        self.ty(TypeExprKind::Named {
            name: SmolStr::new(name),
            args: Some(args.to_vec()),
        })
    }
}

fn names(names: &[&str]) -> Vec<SmolStr> {
    names.iter().map(|n| SmolStr::new(n)).collect()
}

fn params_of(params: &[(&str, TypeExprId)]) -> Vec<Param> {
    params
        .iter()
        .map(|(name, type_ann)| Param {
            name: SmolStr::new(name),
            type_ann: *type_ann,
        })
        .collect()
}

fn props_of(props: &[(&str, ExprId)]) -> Vec<PropInit> {
    props
        .iter()
        .map(|(name, value)| PropInit {
            name: SmolStr::new(name),
            value: *value,
        })
        .collect()
}

fn fields_of(fields: &[(&str, TypeExprId)]) -> Vec<(SmolStr, TypeExprId)> {
    fields
        .iter()
        .map(|(name, ty)| (SmolStr::new(name), *ty))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_follow_allocation_order() {
        let b = ModuleBuilder::new();
        let one = b.num(1.0);
        let two = b.num(2.0);
        let sum = b.add(one, two);
        assert_eq!(b.span_of(one), Span::new(0, 1));
        assert_eq!(b.span_of(two), Span::new(1, 2));
        assert_eq!(b.span_of(sum), Span::new(2, 3));
    }

    #[test]
    fn nested_calls_build_a_tree() {
        let b = ModuleBuilder::new();
        let root = b.add(b.num(1.0), b.num(2.0));
        let module = b.finish();
        match &module.exprs[root].kind {
            ExprKind::Add { left, right } => {
                assert!(matches!(module.exprs[*left].kind, ExprKind::Number(n) if n == 1.0));
                assert!(matches!(module.exprs[*right].kind, ExprKind::Number(n) if n == 2.0));
            }
            other => panic!("expected add, got {:?}", other),
        }
    }

    #[test]
    fn aliases_are_recorded() {
        let b = ModuleBuilder::new();
        let body = b.t_func(&[("x", b.t_var("X"))], b.t_boolean());
        b.generic_alias("F", &["X"], body);
        let module = b.finish();
        let alias = module.alias("F").unwrap();
        assert_eq!(alias.params.as_deref(), Some(&[SmolStr::new("X")][..]));
        assert!(module.alias("G").is_none());
    }
}
