use smol_str::SmolStr;
use std::rc::Rc;

use crate::types::Ty;

/// Immutable variable → type environment.
///
/// Extending returns a new environment that shares its parent, so the two
/// branches of a conditional can each extend the same parent without seeing
/// each other's bindings.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    head: Option<Rc<Binding>>,
}

#[derive(Debug)]
struct Binding {
    name: SmolStr,
    ty: Ty,
    next: Option<Rc<Binding>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&self, name: impl Into<SmolStr>, ty: Ty) -> TypeEnv {
        TypeEnv {
            head: Some(Rc::new(Binding {
                name: name.into(),
                ty,
                next: self.head.clone(),
            })),
        }
    }

    pub fn extend_many<I>(&self, bindings: I) -> TypeEnv
    where
        I: IntoIterator<Item = (SmolStr, Ty)>,
    {
        bindings
            .into_iter()
            .fold(self.clone(), |env, (name, ty)| env.extend(name, ty))
    }

    pub fn lookup(&self, name: &str) -> Option<&Ty> {
        let mut cur = self.head.as_deref();
        while let Some(b) = cur {
            if b.name == name {
                return Some(&b.ty);
            }
            cur = b.next.as_deref();
        }
        None
    }
}
