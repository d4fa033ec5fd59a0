pub mod builder;

use la_arena::{Arena, Idx};
use smol_str::SmolStr;

pub use builder::ModuleBuilder;

// ── Spans ─────────────────────────────────────────────────────────

/// Opaque source location attached by the front end. The checker copies it
/// into diagnostics and never inspects or synthesizes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

// ── ID types ──────────────────────────────────────────────────────

pub type ExprId = Idx<Expr>;
pub type TypeExprId = Idx<TypeExpr>;

// ── Module ────────────────────────────────────────────────────────

/// A fully parsed program: every term and type annotation, plus the named
/// type aliases the annotations may refer to.
#[derive(Debug, Clone)]
pub struct Module {
    pub exprs: Arena<Expr>,
    pub type_exprs: Arena<TypeExpr>,
    pub type_aliases: Vec<TypeAlias>,
}

impl Module {
    pub fn new() -> Self {
        Self {
            exprs: Arena::new(),
            type_exprs: Arena::new(),
            type_aliases: Vec::new(),
        }
    }

    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.exprs.alloc(Expr { kind, span })
    }

    pub fn alloc_type(&mut self, kind: TypeExprKind, span: Span) -> TypeExprId {
        self.type_exprs.alloc(TypeExpr { kind, span })
    }

    pub fn alias(&self, name: &str) -> Option<&TypeAlias> {
        self.type_aliases.iter().find(|a| a.name == name)
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias declaration: `type Name<P...> = body`.
/// `params` is `None` for a plain alias and `Some` for a generic one.
#[derive(Debug, Clone)]
pub struct TypeAlias {
    pub name: SmolStr,
    pub params: Option<Vec<SmolStr>>,
    pub body: TypeExprId,
    pub span: Span,
}

// ── Expressions ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// `true` / `false`
    Bool(bool),
    /// Numeric literal.
    Number(f64),
    /// String literal.
    String(SmolStr),
    /// `undefined`
    Undefined,
    /// `!cond`
    Not(ExprId),
    /// `left === right` / `left !== right`
    Compare {
        op: CompareOp,
        left: ExprId,
        right: ExprId,
    },
    /// `cond ? thn : els`, or an if statement
    If {
        cond: ExprId,
        thn: ExprId,
        els: ExprId,
    },
    /// `left + right`
    Add { left: ExprId, right: ExprId },
    /// Variable reference.
    Var(SmolStr),
    /// Arrow function: `(params): ret => body`
    Func {
        params: Vec<Param>,
        ret_type: Option<TypeExprId>,
        body: ExprId,
    },
    /// `func(args...)`
    Call { func: ExprId, args: Vec<ExprId> },
    /// `body; rest`
    Seq { body: ExprId, rest: ExprId },
    /// `const name = init; rest`
    Const {
        name: SmolStr,
        init: ExprId,
        rest: ExprId,
    },
    /// `name = init`
    Assign { name: SmolStr, init: ExprId },
    /// `for (let idx = 0; idx < ary.length; idx++) { body } rest`
    For {
        ary: ExprId,
        idx: SmolStr,
        body: ExprId,
        rest: ExprId,
    },
    /// `for (const var of ary) { body } rest`
    ForOf {
        ary: ExprId,
        var: SmolStr,
        body: ExprId,
        rest: ExprId,
    },
    /// `<T[]>[]`
    ArrayNew(TypeExprId),
    /// `[...ary, val]`
    ArrayExt { ary: ExprId, val: ExprId },
    /// `<Record<string, T>>{}`
    MapNew(TypeExprId),
    /// `{ ...map }`
    MapCopy(ExprId),
    /// `{ ...map, [key]: val }`
    MapExt {
        map: ExprId,
        key: ExprId,
        val: ExprId,
    },
    /// `key in map`
    MapIn { map: ExprId, key: ExprId },
    /// `base[index]`
    Member { base: ExprId, index: ExprId },
    /// `{ name: term, ... }`
    ObjectNew(Vec<PropInit>),
    /// `obj.prop`
    ObjectGet { obj: ExprId, prop: SmolStr },
    /// `<As>{ tag: "label", props... }`
    TaggedUnionNew {
        label: SmolStr,
        props: Vec<PropInit>,
        as_type: TypeExprId,
    },
    /// `<As>term`, widening a union value to a larger union
    TaggedUnionExt { term: ExprId, as_type: TypeExprId },
    /// `switch (var.tag) { case "label": ...; default: ... }`
    TaggedUnionGet {
        var: SmolStr,
        clauses: Vec<Clause>,
        default: Option<ExprId>,
    },
    /// `function name(params): ret { body } rest`
    RecFunc {
        name: SmolStr,
        params: Vec<Param>,
        ret_type: TypeExprId,
        body: ExprId,
        rest: ExprId,
    },
    /// `<P...>body`
    TypeAbs {
        type_params: Vec<SmolStr>,
        body: ExprId,
    },
    /// `target<Args...>`
    TypeApp {
        target: ExprId,
        type_args: Vec<TypeExprId>,
    },
}

/// Function parameter with its declared type.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: SmolStr,
    pub type_ann: TypeExprId,
}

/// `name: term` inside an object or tagged-union literal.
#[derive(Debug, Clone)]
pub struct PropInit {
    pub name: SmolStr,
    pub value: ExprId,
}

/// `case "label": body` of a tagged-union dispatch.
#[derive(Debug, Clone)]
pub struct Clause {
    pub label: SmolStr,
    pub body: ExprId,
}

// ── Type expressions ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Boolean,
    Number,
    String,
    Undefined,
    /// `T | undefined`
    Option(TypeExprId),
    /// `T[]`
    Array(TypeExprId),
    /// `Record<string, T>`
    Map(TypeExprId),
    /// `(p: T, ...) => R`
    Func {
        params: Vec<(SmolStr, TypeExprId)>,
        ret: TypeExprId,
    },
    /// `{ p: T; ... }`
    Object(Vec<(SmolStr, TypeExprId)>),
    /// `{ tag: "L"; p: T } | ...`
    TaggedUnion(Vec<VariantExpr>),
    /// `mu Name. T`
    Rec { name: SmolStr, body: TypeExprId },
    /// `<P...>T`
    Generic {
        type_params: Vec<SmolStr>,
        body: TypeExprId,
    },
    /// Reference to a type variable, an enclosing `mu` binder or a type
    /// alias, optionally applied to type arguments: `X`, `F<number>`.
    Named {
        name: SmolStr,
        args: Option<Vec<TypeExprId>>,
    },
}

/// One variant of a tagged-union type expression.
#[derive(Debug, Clone)]
pub struct VariantExpr {
    pub label: SmolStr,
    pub props: Vec<(SmolStr, TypeExprId)>,
}
