use smol_str::SmolStr;
use std::fmt;

// ── Types ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    Boolean,
    Number,
    String,
    /// Type of `undefined` and of branches that fall through. Compatible
    /// with every other type.
    Undefined,
    /// `T | undefined`
    Option(Box<Ty>),
    Array(Box<Ty>),
    /// String-keyed record: `Record<string, T>`
    Map(Box<Ty>),
    /// Function type. Parameter names are kept for rendering only.
    Func(Vec<Param>, Box<Ty>),
    Object(Vec<Prop>),
    TaggedUnion(Vec<Variant>),
    /// Equirecursive binder: `mu name. body`
    Rec(SmolStr, Box<Ty>),
    /// Universally quantified type: `<X, Y>body`
    Generic(Vec<SmolStr>, Box<Ty>),
    /// Reference to a generic parameter or an enclosing `Rec` binder
    Var(SmolStr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: SmolStr,
    pub ty: Ty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prop {
    pub name: SmolStr,
    pub ty: Ty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub label: SmolStr,
    pub props: Vec<Prop>,
}

impl Param {
    pub fn new(name: impl Into<SmolStr>, ty: Ty) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl Prop {
    pub fn new(name: impl Into<SmolStr>, ty: Ty) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl Variant {
    pub fn new(label: impl Into<SmolStr>, props: Vec<Prop>) -> Self {
        Self {
            label: label.into(),
            props,
        }
    }

    pub fn prop(&self, name: &str) -> Option<&Prop> {
        find_prop(&self.props, name)
    }
}

pub(crate) fn find_prop<'p>(props: &'p [Prop], name: &str) -> Option<&'p Prop> {
    props.iter().find(|p| p.name == name)
}

pub(crate) fn find_variant<'v>(variants: &'v [Variant], label: &str) -> Option<&'v Variant> {
    variants.iter().find(|v| v.label == label)
}

// ── Constructors ─────────────────────────────────────────────────

impl Ty {
    pub fn option(elem: Ty) -> Ty {
        Ty::Option(Box::new(elem))
    }

    pub fn array(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem))
    }

    pub fn map(elem: Ty) -> Ty {
        Ty::Map(Box::new(elem))
    }

    pub fn func(params: Vec<Param>, ret: Ty) -> Ty {
        Ty::Func(params, Box::new(ret))
    }

    pub fn rec(name: impl Into<SmolStr>, body: Ty) -> Ty {
        Ty::Rec(name.into(), Box::new(body))
    }

    pub fn generic(params: Vec<SmolStr>, body: Ty) -> Ty {
        Ty::Generic(params, Box::new(body))
    }

    pub fn var(name: impl Into<SmolStr>) -> Ty {
        Ty::Var(name.into())
    }
}

// ── Free variables ───────────────────────────────────────────────

impl Ty {
    /// Free type variables in first-occurrence order, without duplicates.
    pub fn free_vars(&self) -> Vec<SmolStr> {
        let mut out = Vec::new();
        let mut bound = Vec::new();
        collect_free(self, &mut bound, &mut out);
        out
    }

    pub fn occurs_free(&self, name: &str) -> bool {
        match self {
            Ty::Boolean | Ty::Number | Ty::String | Ty::Undefined => false,
            Ty::Option(e) | Ty::Array(e) | Ty::Map(e) => e.occurs_free(name),
            Ty::Func(params, ret) => {
                params.iter().any(|p| p.ty.occurs_free(name)) || ret.occurs_free(name)
            }
            Ty::Object(props) => props.iter().any(|p| p.ty.occurs_free(name)),
            Ty::TaggedUnion(variants) => variants
                .iter()
                .any(|v| v.props.iter().any(|p| p.ty.occurs_free(name))),
            Ty::Rec(n, body) => n != name && body.occurs_free(name),
            Ty::Generic(params, body) => {
                !params.iter().any(|p| p == name) && body.occurs_free(name)
            }
            Ty::Var(n) => n == name,
        }
    }
}

fn collect_free(ty: &Ty, bound: &mut Vec<SmolStr>, out: &mut Vec<SmolStr>) {
    match ty {
        Ty::Boolean | Ty::Number | Ty::String | Ty::Undefined => {}
        Ty::Option(e) | Ty::Array(e) | Ty::Map(e) => collect_free(e, bound, out),
        Ty::Func(params, ret) => {
            for p in params {
                collect_free(&p.ty, bound, out);
            }
            collect_free(ret, bound, out);
        }
        Ty::Object(props) => {
            for p in props {
                collect_free(&p.ty, bound, out);
            }
        }
        Ty::TaggedUnion(variants) => {
            for v in variants {
                for p in &v.props {
                    collect_free(&p.ty, bound, out);
                }
            }
        }
        Ty::Rec(name, body) => {
            bound.push(name.clone());
            collect_free(body, bound, out);
            bound.pop();
        }
        Ty::Generic(params, body) => {
            let mark = bound.len();
            bound.extend(params.iter().cloned());
            collect_free(body, bound, out);
            bound.truncate(mark);
        }
        Ty::Var(name) => {
            if !bound.contains(name) && !out.contains(name) {
                out.push(name.clone());
            }
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Boolean => write!(f, "boolean"),
            Ty::Number => write!(f, "number"),
            Ty::String => write!(f, "string"),
            Ty::Undefined => write!(f, "undefined"),
            Ty::Option(elem) => write!(f, "({} | undefined)", elem),
            Ty::Array(elem) => match **elem {
                Ty::Func(..) | Ty::Generic(..) => write!(f, "({})[]", elem),
                _ => write!(f, "{}[]", elem),
            },
            Ty::Map(elem) => write!(f, "Record<string, {}>", elem),
            Ty::Func(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", p.name, p.ty)?;
                }
                write!(f, ") => {}", ret)
            }
            Ty::Object(props) => write_props(f, None, props),
            Ty::TaggedUnion(variants) if variants.is_empty() => write!(f, "never"),
            Ty::TaggedUnion(variants) => {
                write!(f, "(")?;
                for (i, v) in variants.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write_props(f, Some(&v.label), &v.props)?;
                }
                write!(f, ")")
            }
            Ty::Rec(name, body) => write!(f, "(mu {}. {})", name, body),
            Ty::Generic(params, body) => {
                write!(f, "<")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ">{}", body)
            }
            Ty::Var(name) => write!(f, "{}", name),
        }
    }
}

fn write_props(f: &mut fmt::Formatter<'_>, tag: Option<&SmolStr>, props: &[Prop]) -> fmt::Result {
    if tag.is_none() && props.is_empty() {
        return write!(f, "{{}}");
    }
    write!(f, "{{ ")?;
    let mut first = true;
    if let Some(label) = tag {
        write!(f, "tag: \"{}\"", label)?;
        first = false;
    }
    for p in props {
        if !first {
            write!(f, "; ")?;
        }
        first = false;
        write!(f, "{}: {}", p.name, p.ty)?;
    }
    write!(f, " }}")
}
