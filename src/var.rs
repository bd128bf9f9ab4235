//! Variables and dimensions.

use std::fmt;
use std::sync::Arc;

/// A dimension index into an environment.
pub type Dim = u32;

/// Sentinel dimension meaning "not present in the environment".
pub const DIM_MAX: Dim = Dim::MAX;

/// An interned variable name. Cloning a `Var` is cheap and clones compare equal.
///
/// Variables are totally ordered by their names, which fixes the dimension layout of every
/// [`Environment`] they belong to.
///
/// # Examples
/// ```
/// # use numdom::Var;
/// let x = Var::new("x");
/// assert!(x < Var::new("y"));
/// assert_eq!(x.to_string(), "x");
/// ```
///
/// [`Environment`]: ../environment/struct.Environment.html
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(Arc<str>);

impl Var {
    /// Create a variable with the given name.
    pub fn new(name: &str) -> Var {
        Var(Arc::from(name))
    }

    /// The name of this variable.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Var {
        Var::new(name)
    }
}

impl From<String> for Var {
    fn from(name: String) -> Var {
        Var(Arc::from(name))
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({})", &self.0)
    }
}

/// Build a vector of variables from names.
///
/// # Examples
/// ```
/// # use numdom::var::vars;
/// let v = vars(&["x", "y"]);
/// assert_eq!(v.len(), 2);
/// ```
pub fn vars(names: &[&str]) -> Vec<Var> {
    names.iter().map(|n| Var::new(n)).collect()
}
