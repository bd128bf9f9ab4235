//! Expressions over the dimensions of an environment.
//!
//! Each expression comes in two levels. The dimension level ([`LinExpr0`], [`Tree`]) refers to
//! variables by dimension index and is what domain backends consume. The environment level
//! ([`LinExpr`], [`TreeExpr`]) pairs a dimension-level expression with the [`Environment`] giving
//! its dimensions names.
//!
//! [`LinExpr0`]: ./linexpr/struct.LinExpr0.html
//! [`Tree`]: ./texpr/enum.Tree.html
//! [`LinExpr`]: ./linexpr/struct.LinExpr.html
//! [`TreeExpr`]: ./texpr/struct.TreeExpr.html
//! [`Environment`]: ../environment/struct.Environment.html

pub mod linexpr;
pub mod texpr;

pub use crate::expr::linexpr::{LinExpr, LinExpr0};
pub use crate::expr::texpr::{RDir, RType, TexprOp, Tree, TreeExpr};

use crate::environment::{DimChange, Environment};
use crate::error::{Error, Result};

/// The change embedding `from` into `to`, or the error explaining why `to` cannot hold an
/// expression built over `from`.
pub(crate) fn embedding(from: &Environment, to: &Environment) -> Result<Option<DimChange>> {
    if from == to {
        return Ok(None);
    }
    for v in from.vars() {
        if !to.contains(v) {
            return Err(Error::UnknownVariable(v.clone()));
        }
    }
    match from.dimchange(to) {
        Some(c) => Ok(Some(c)),
        None => {
            let conflict = from
                .vars()
                .find(|v| from.is_int(from.dimension_of(v)) != to.is_int(to.dimension_of(v)));
            match conflict {
                Some(v) => Err(Error::IncompatibleEnvironment(v.clone())),
                None => Ok(None),
            }
        }
    }
}
