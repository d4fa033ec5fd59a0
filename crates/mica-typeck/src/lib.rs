//! Structural type checker for a small TypeScript-like expression language.
//!
//! The checker takes a [`Module`] built by a front end and the id of its root
//! expression, and either returns the root's type or the first rule it finds
//! violated. There is no inference: every parameter, collection constructor
//! and tagged-union literal carries its type annotation.

pub mod compat;
pub mod config;
pub mod env;
pub mod error;
pub mod subst;
pub mod types;

mod checker;
mod narrow;
mod resolve;

use mica_ast::{ExprId, Module, TypeExprId};

use crate::checker::TypeChecker;

pub use compat::{alpha_eq, compatible, Mode};
pub use config::CheckConfig;
pub use env::TypeEnv;
pub use error::{MismatchSite, TypeError, TypeErrorKind};
pub use subst::{substitute, unfold, FreshNames};
pub use types::{Param, Prop, Ty, Variant};

/// Type-check `root` with the default [`CheckConfig`].
pub fn check(module: &Module, root: ExprId) -> Result<Ty, TypeError> {
    check_with_config(module, root, &CheckConfig::default())
}

pub fn check_with_config(
    module: &Module,
    root: ExprId,
    config: &CheckConfig,
) -> Result<Ty, TypeError> {
    check_in(module, root, &TypeEnv::new(), config)
}

/// Type-check `root` with variables already bound in `env`.
pub fn check_in(
    module: &Module,
    root: ExprId,
    env: &TypeEnv,
    config: &CheckConfig,
) -> Result<Ty, TypeError> {
    TypeChecker::new(module, config).check_expr(root, env, &[])
}

/// Resolve a standalone type annotation, expanding the module's aliases.
pub fn resolve_type(module: &Module, id: TypeExprId) -> Result<Ty, TypeError> {
    let config = CheckConfig::default();
    TypeChecker::new(module, &config).resolve(id, &[])
}
