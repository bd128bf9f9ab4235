//! Environments: typed sets of variables and their dimension layout.
//!
//! An environment holds a sorted list of integer variables followed by a sorted list of real
//! variables. The dimension of a variable is its position in that layout, so integer variables
//! always occupy dimensions `0..intdim` and real variables occupy `intdim..intdim + realdim`.
//! Environments are immutable and cheap to clone. Operations that change the set of variables
//! return a new environment.
//!
//! ```
//! use numdom::{Environment, Var};
//!
//! let e = Environment::new(&[Var::new("x"), Var::new("y")], &[Var::new("z")]).unwrap();
//! assert_eq!(e.to_string(), "{x,y|z}");
//! assert_eq!(e.dimension_of(&Var::new("z")), 2);
//! ```

use crate::error::{Error, Result};
use crate::var::{Dim, Var, DIM_MAX};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The number of integer and real dimensions of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension {
    /// Number of integer dimensions. These always come first.
    pub intdim: usize,
    /// Number of real dimensions.
    pub realdim: usize,
}

impl Dimension {
    /// Create a new dimension description.
    pub fn new(intdim: usize, realdim: usize) -> Dimension {
        Dimension { intdim, realdim }
    }

    /// Total number of dimensions.
    pub fn size(&self) -> usize {
        self.intdim + self.realdim
    }

    /// Whether dimension `d` is integer-typed.
    pub fn is_int(&self, d: Dim) -> bool {
        (d as usize) < self.intdim
    }
}

/// A description of dimensions being added to or removed from a space.
///
/// When adding, `dims` holds sorted insertion points: each entry `d` inserts one new dimension
/// before the current dimension `d`, so repeated entries insert several dimensions at the same
/// place and an entry equal to the current size appends. When removing, `dims` holds the sorted
/// dimensions to drop. In both cases `intdim` and `realdim` count the integer and real dimensions
/// involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimChange {
    /// Insertion points or removed dimensions, sorted.
    pub dims: Vec<Dim>,
    /// Number of integer dimensions involved.
    pub intdim: usize,
    /// Number of real dimensions involved.
    pub realdim: usize,
}

impl DimChange {
    /// Create a new dimension change.
    ///
    /// # Panics
    /// Panics if `dims.len() != intdim + realdim` or if `dims` is not sorted.
    pub fn new(dims: Vec<Dim>, intdim: usize, realdim: usize) -> DimChange {
        if dims.len() != intdim + realdim {
            panic!("Mismatched dimension count in DimChange::new");
        }
        if dims.windows(2).any(|w| w[0] > w[1]) {
            panic!("Unsorted dimensions in DimChange::new");
        }
        DimChange {
            dims,
            intdim,
            realdim,
        }
    }

    /// Whether this change touches no dimension.
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// For an addition, the position of each old dimension in the enlarged space.
    pub fn add_map(&self, old_size: usize) -> Vec<Dim> {
        let mut k = 0;
        (0..old_size)
            .map(|i| {
                while k < self.dims.len() && (self.dims[k] as usize) <= i {
                    k += 1;
                }
                (i + k) as Dim
            })
            .collect()
    }

    /// For an addition, the positions of the new dimensions in the enlarged space.
    pub fn added_dims(&self) -> Vec<Dim> {
        self.dims
            .iter()
            .enumerate()
            .map(|(k, d)| d + k as Dim)
            .collect()
    }

    /// For an addition, insert a fresh element produced by `fill` at every insertion point.
    pub fn insert_into<T: Clone, F: FnMut() -> T>(&self, v: &[T], mut fill: F) -> Vec<T> {
        let mut out = Vec::with_capacity(v.len() + self.dims.len());
        let mut k = 0;
        for i in 0..=v.len() {
            while k < self.dims.len() && self.dims[k] as usize == i {
                out.push(fill());
                k += 1;
            }
            if i < v.len() {
                out.push(v[i].clone());
            }
        }
        while k < self.dims.len() {
            out.push(fill());
            k += 1;
        }
        out
    }

    /// For a removal, the position of each old dimension in the reduced space, if it survives.
    pub fn remove_map(&self, old_size: usize) -> Vec<Option<Dim>> {
        let mut removed = 0;
        (0..old_size)
            .map(|i| {
                if self.dims.binary_search(&(i as Dim)).is_ok() {
                    removed += 1;
                    None
                } else {
                    Some((i - removed) as Dim)
                }
            })
            .collect()
    }

    /// For a removal, drop the removed positions from `v`.
    pub fn remove_from<T: Clone>(&self, v: &[T]) -> Vec<T> {
        v.iter()
            .enumerate()
            .filter(|(i, _)| self.dims.binary_search(&(*i as Dim)).is_err())
            .map(|(_, x)| x.clone())
            .collect()
    }
}

/// An addition followed by a removal, moving a value between two compatible environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimChange2 {
    /// Dimensions added first, relative to the source environment.
    pub add: Option<DimChange>,
    /// Dimensions removed afterwards, relative to the enlarged environment.
    pub remove: Option<DimChange>,
}

/// A permutation of dimensions: dimension `i` moves to `perm[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimPerm(Vec<Dim>);

impl DimPerm {
    /// Create a permutation from its image vector.
    ///
    /// # Panics
    /// Panics if `perm` is not a permutation of `0..perm.len()`.
    pub fn new(perm: Vec<Dim>) -> DimPerm {
        let mut seen = vec![false; perm.len()];
        for &p in &perm {
            if p as usize >= perm.len() || seen[p as usize] {
                panic!("Not a permutation in DimPerm::new");
            }
            seen[p as usize] = true;
        }
        DimPerm(perm)
    }

    /// The identity permutation on `n` dimensions.
    pub fn identity(n: usize) -> DimPerm {
        DimPerm((0..n as Dim).collect())
    }

    /// Number of permuted dimensions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the permutation is over zero dimensions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this permutation leaves every dimension in place.
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &p)| i as Dim == p)
    }

    /// The new position of dimension `d`.
    pub fn apply(&self, d: Dim) -> Dim {
        self.0[d as usize]
    }

    /// The inverse permutation.
    pub fn inverse(&self) -> DimPerm {
        let mut inv = vec![0; self.0.len()];
        for (i, &p) in self.0.iter().enumerate() {
            inv[p as usize] = i as Dim;
        }
        DimPerm(inv)
    }

    /// Exchange the images of `a` and `b`.
    pub fn swap(&mut self, a: Dim, b: Dim) {
        self.0.swap(a as usize, b as usize);
    }

    /// Move the elements of `v` to their new positions.
    ///
    /// # Panics
    /// Panics if `v` does not have exactly one element per dimension.
    pub fn permute<T: Clone>(&self, v: &[T]) -> Vec<T> {
        if v.len() != self.0.len() {
            panic!("Mismatched dimensionality in DimPerm::permute");
        }
        let mut out = v.to_vec();
        for (i, x) in v.iter().enumerate() {
            out[self.0[i] as usize] = x.clone();
        }
        out
    }
}

/// The result of comparing two environments by inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOrdering {
    /// Some variable is typed differently in the two environments.
    Incompatible,
    /// The first environment is strictly contained in the second.
    Subset,
    /// Both environments hold the same variables.
    Equal,
    /// The first environment strictly contains the second.
    Superset,
    /// Neither contains the other.
    Incomparable,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct EnvInner {
    int_vars: Vec<Var>,
    real_vars: Vec<Var>,
}

/// A shared, immutable set of typed variables.
#[derive(Clone, Hash)]
pub struct Environment {
    inner: Arc<EnvInner>,
}

impl Environment {
    /// Create an environment from integer and real variables. The lists need not be sorted.
    ///
    /// # Errors
    /// Fails with `DuplicateVariable` if a name repeats, in either list or across both.
    ///
    /// # Examples
    /// ```
    /// # use numdom::{Environment, Error, Var};
    /// let x = Var::new("x");
    /// assert!(Environment::new(&[x.clone()], &[]).is_ok());
    /// assert_eq!(Environment::new(&[x.clone()], &[x.clone()]).err(),
    ///     Some(Error::DuplicateVariable(x)));
    /// ```
    pub fn new(int_vars: &[Var], real_vars: &[Var]) -> Result<Environment> {
        let mut seen = BTreeSet::new();
        for v in int_vars.iter().chain(real_vars.iter()) {
            if !seen.insert(v) {
                return Err(Error::DuplicateVariable(v.clone()));
            }
        }
        let mut iv = int_vars.to_vec();
        let mut rv = real_vars.to_vec();
        iv.sort();
        rv.sort();
        Ok(Environment {
            inner: Arc::new(EnvInner {
                int_vars: iv,
                real_vars: rv,
            }),
        })
    }

    /// The environment with no variables.
    pub fn empty() -> Environment {
        Environment {
            inner: Arc::new(EnvInner {
                int_vars: Vec::new(),
                real_vars: Vec::new(),
            }),
        }
    }

    /// The integer variables, sorted.
    pub fn int_vars(&self) -> &[Var] {
        &self.inner.int_vars
    }

    /// The real variables, sorted.
    pub fn real_vars(&self) -> &[Var] {
        &self.inner.real_vars
    }

    /// All variables in dimension order.
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.inner.int_vars.iter().chain(self.inner.real_vars.iter())
    }

    /// Number of integer dimensions.
    pub fn intdim(&self) -> usize {
        self.inner.int_vars.len()
    }

    /// Number of real dimensions.
    pub fn realdim(&self) -> usize {
        self.inner.real_vars.len()
    }

    /// The dimension description of this environment.
    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.intdim(), self.realdim())
    }

    /// Total number of variables.
    pub fn len(&self) -> usize {
        self.intdim() + self.realdim()
    }

    /// Whether the environment has no variables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `v` belongs to this environment.
    pub fn contains(&self, v: &Var) -> bool {
        self.dimension_of(v) != DIM_MAX
    }

    /// The dimension of `v`, or `DIM_MAX` if `v` does not belong to this environment.
    ///
    /// # Examples
    /// ```
    /// # use numdom::{Environment, Var, DIM_MAX};
    /// let e = Environment::new(&[Var::new("y"), Var::new("x")], &[Var::new("a")]).unwrap();
    /// assert_eq!(e.dimension_of(&Var::new("x")), 0);
    /// assert_eq!(e.dimension_of(&Var::new("a")), 2);
    /// assert_eq!(e.dimension_of(&Var::new("w")), DIM_MAX);
    /// ```
    pub fn dimension_of(&self, v: &Var) -> Dim {
        if let Ok(i) = self.inner.int_vars.binary_search(v) {
            return i as Dim;
        }
        match self.inner.real_vars.binary_search(v) {
            Ok(i) => (self.intdim() + i) as Dim,
            Err(_) => DIM_MAX,
        }
    }

    /// The dimension of `v`, failing with `UnknownVariable` if it is absent.
    pub fn dim_of(&self, v: &Var) -> Result<Dim> {
        match self.dimension_of(v) {
            DIM_MAX => Err(Error::UnknownVariable(v.clone())),
            d => Ok(d),
        }
    }

    /// The variable at dimension `d`.
    pub fn var_of_dim(&self, d: Dim) -> Option<&Var> {
        let d = d as usize;
        if d < self.intdim() {
            Some(&self.inner.int_vars[d])
        } else {
            self.inner.real_vars.get(d - self.intdim())
        }
    }

    /// Whether dimension `d` holds an integer variable.
    pub fn is_int(&self, d: Dim) -> bool {
        (d as usize) < self.intdim()
    }

    /// The type of `v` in this environment: `Some(true)` for integer, `Some(false)` for real.
    fn typ(&self, v: &Var) -> Option<bool> {
        match self.dimension_of(v) {
            DIM_MAX => None,
            d => Some(self.is_int(d)),
        }
    }

    /// Add integer and real variables.
    ///
    /// # Errors
    /// Fails with `DuplicateVariable` if a new name is already present or repeated.
    ///
    /// # Examples
    /// ```
    /// # use numdom::{Environment, Var};
    /// let e = Environment::new(&[Var::new("x")], &[]).unwrap();
    /// let f = e.add(&[], &[Var::new("z")]).unwrap();
    /// assert_eq!(f.to_string(), "{x|z}");
    /// assert!(f.add(&[Var::new("z")], &[]).is_err());
    /// ```
    pub fn add(&self, int_vars: &[Var], real_vars: &[Var]) -> Result<Environment> {
        let mut iv = self.inner.int_vars.clone();
        let mut rv = self.inner.real_vars.clone();
        iv.extend(int_vars.iter().cloned());
        rv.extend(real_vars.iter().cloned());
        Environment::new(&iv, &rv)
    }

    /// Remove variables.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if a name is absent.
    pub fn remove(&self, vars: &[Var]) -> Result<Environment> {
        for v in vars {
            if !self.contains(v) {
                return Err(Error::UnknownVariable(v.clone()));
            }
        }
        let keep = |v: &&Var| !vars.contains(v);
        let iv: Vec<Var> = self.inner.int_vars.iter().filter(keep).cloned().collect();
        let rv: Vec<Var> = self.inner.real_vars.iter().filter(keep).cloned().collect();
        Environment::new(&iv, &rv)
    }

    /// Rename `old[i]` into `new[i]` for every `i`, simultaneously.
    ///
    /// Returns the renamed environment together with the permutation from the dimensions of
    /// `self` to those of the result.
    ///
    /// # Errors
    /// Fails with `ArityMismatch` if the lists differ in length, `UnknownVariable` if an old name
    /// is absent and `InvalidRenaming` if two variables would end up with the same name.
    ///
    /// # Examples
    /// ```
    /// # use numdom::{Environment, Var};
    /// let e = Environment::new(&[Var::new("x")], &[Var::new("y")]).unwrap();
    /// let (f, _) = e.rename(&[Var::new("y")], &[Var::new("z")]).unwrap();
    /// assert_eq!(f.to_string(), "{x|z}");
    /// assert!(e.rename(&[Var::new("x")], &[Var::new("y")]).is_err());
    /// ```
    pub fn rename(&self, old: &[Var], new: &[Var]) -> Result<(Environment, DimPerm)> {
        if old.len() != new.len() {
            return Err(Error::ArityMismatch(old.len(), new.len()));
        }
        for v in old {
            if !self.contains(v) {
                return Err(Error::UnknownVariable(v.clone()));
            }
        }
        let map = |v: &Var| -> Var {
            match old.iter().position(|o| o == v) {
                Some(i) => new[i].clone(),
                None => v.clone(),
            }
        };
        let iv: Vec<Var> = self.inner.int_vars.iter().map(map).collect();
        let rv: Vec<Var> = self.inner.real_vars.iter().map(map).collect();
        let env = match Environment::new(&iv, &rv) {
            Ok(env) => env,
            Err(Error::DuplicateVariable(v)) => {
                return Err(Error::InvalidRenaming(format!("{} is used twice", v)))
            }
            Err(e) => return Err(e),
        };
        let perm = self.vars().map(|v| env.dimension_of(&map(v))).collect();
        Ok((env, DimPerm::new(perm)))
    }

    /// The least common environment of `self` and `other`.
    ///
    /// # Errors
    /// Fails with `IncompatibleEnvironment` if a variable is integer in one environment and real
    /// in the other.
    pub fn lce(&self, other: &Environment) -> Result<Environment> {
        if self == other {
            return Ok(self.clone());
        }
        let mut iv = self.inner.int_vars.clone();
        let mut rv = self.inner.real_vars.clone();
        for v in other.vars() {
            match (self.typ(v), other.typ(v)) {
                (None, Some(true)) => iv.push(v.clone()),
                (None, Some(false)) => rv.push(v.clone()),
                (Some(a), Some(b)) if a != b => {
                    return Err(Error::IncompatibleEnvironment(v.clone()))
                }
                _ => (),
            }
        }
        Environment::new(&iv, &rv)
    }

    /// The least common environment together with the embeddings of `self` and `other` into it.
    /// An embedding is `None` when the operand already equals the union.
    pub fn lce_with_changes(
        &self,
        other: &Environment,
    ) -> Result<(Environment, Option<DimChange>, Option<DimChange>)> {
        let env = self.lce(other)?;
        let c1 = self.dimchange(&env).filter(|c| !c.is_empty());
        let c2 = other.dimchange(&env).filter(|c| !c.is_empty());
        Ok((env, c1, c2))
    }

    /// The dimension change embedding `self` into `superenv`, or `None` if `superenv` does not
    /// contain `self` with the same variable types.
    pub fn dimchange(&self, superenv: &Environment) -> Option<DimChange> {
        for v in self.vars() {
            if superenv.typ(v) != self.typ(v) {
                return None;
            }
        }
        let mut dims = Vec::new();
        let mut intdim = 0;
        let mut realdim = 0;
        for v in superenv.int_vars() {
            if !self.contains(v) {
                let pos = self.inner.int_vars.partition_point(|w| w < v);
                dims.push(pos as Dim);
                intdim += 1;
            }
        }
        for v in superenv.real_vars() {
            if !self.contains(v) {
                let pos = self.intdim() + self.inner.real_vars.partition_point(|w| w < v);
                dims.push(pos as Dim);
                realdim += 1;
            }
        }
        Some(DimChange::new(dims, intdim, realdim))
    }

    /// The changes moving a value from `self` to `other`: first add the variables of `other`
    /// missing from `self`, then remove the variables of `self` missing from `other`.
    ///
    /// # Errors
    /// Fails with `IncompatibleEnvironment` if a variable is typed differently.
    pub fn dimchange2(&self, other: &Environment) -> Result<DimChange2> {
        let union = self.lce(other)?;
        let add = self.dimchange(&union).filter(|c| !c.is_empty());
        let mut dims = Vec::new();
        let mut intdim = 0;
        let mut realdim = 0;
        for (d, v) in union.vars().enumerate() {
            if !other.contains(v) {
                dims.push(d as Dim);
                if union.is_int(d as Dim) {
                    intdim += 1;
                } else {
                    realdim += 1;
                }
            }
        }
        let remove = if dims.is_empty() {
            None
        } else {
            Some(DimChange::new(dims, intdim, realdim))
        };
        Ok(DimChange2 { add, remove })
    }

    /// Compare two environments by inclusion.
    ///
    /// # Examples
    /// ```
    /// # use numdom::{Environment, Var};
    /// # use numdom::environment::EnvOrdering;
    /// let x = Environment::new(&[Var::new("x")], &[]).unwrap();
    /// let xy = x.add(&[], &[Var::new("y")]).unwrap();
    /// assert_eq!(x.compare(&xy), EnvOrdering::Subset);
    /// assert!(x < xy);
    /// ```
    pub fn compare(&self, other: &Environment) -> EnvOrdering {
        for v in self.vars() {
            if let (Some(a), Some(b)) = (self.typ(v), other.typ(v)) {
                if a != b {
                    return EnvOrdering::Incompatible;
                }
            }
        }
        let sub = self.vars().all(|v| other.contains(v));
        let sup = other.vars().all(|v| self.contains(v));
        match (sub, sup) {
            (true, true) => EnvOrdering::Equal,
            (true, false) => EnvOrdering::Subset,
            (false, true) => EnvOrdering::Superset,
            (false, false) => EnvOrdering::Incomparable,
        }
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for Environment {}

impl PartialOrd for Environment {
    fn partial_cmp(&self, other: &Environment) -> Option<Ordering> {
        match self.compare(other) {
            EnvOrdering::Equal => Some(Ordering::Equal),
            EnvOrdering::Subset => Some(Ordering::Less),
            EnvOrdering::Superset => Some(Ordering::Greater),
            _ => None,
        }
    }
}

fn join_names(f: &mut fmt::Formatter<'_>, vars: &[Var]) -> fmt::Result {
    for (i, v) in vars.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        join_names(f, self.int_vars())?;
        f.write_str("|")?;
        join_names(f, self.real_vars())?;
        f.write_str("}")
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment{}", self)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::var::vars;

    fn xy_z() -> Environment {
        Environment::new(&vars(&["x", "y"]), &vars(&["z"])).unwrap()
    }

    #[test]
    fn display() {
        assert_eq!(xy_z().to_string(), "{x,y|z}");
        let e = Environment::new(&[], &vars(&["y", "z"])).unwrap();
        assert_eq!(e.to_string(), "{|y,z}");
        let e = Environment::new(&vars(&["x"]), &[]).unwrap();
        assert_eq!(e.to_string(), "{x|}");
        assert_eq!(Environment::empty().to_string(), "{|}");
    }

    #[test]
    fn duplicates_rejected() {
        let r = Environment::new(&vars(&["x", "x"]), &[]);
        assert_eq!(r.err(), Some(Error::DuplicateVariable(Var::new("x"))));
        let e = xy_z();
        assert!(e.add(&[], &vars(&["x"])).is_err());
    }

    #[test]
    fn add_remove_idempotence() {
        let e = xy_z();
        assert_eq!(e.add(&[], &[]).unwrap().remove(&[]).unwrap(), e);
        let f = e.add(&vars(&["w"]), &[]).unwrap();
        assert_eq!(f.remove(&vars(&["w"])).unwrap(), e);
    }

    #[test]
    fn remove_unknown() {
        let e = xy_z();
        assert_eq!(
            e.remove(&vars(&["w"])).err(),
            Some(Error::UnknownVariable(Var::new("w")))
        );
    }

    #[test]
    fn contains_and_len() {
        let e = xy_z();
        assert!(e.contains(&Var::new("y")));
        assert!(!e.contains(&Var::new("w")));
        assert_eq!(e.len(), 3);
        assert_eq!(e.intdim(), 2);
        assert_eq!(e.realdim(), 1);
        assert_eq!(e.var_of_dim(2), Some(&Var::new("z")));
        assert_eq!(e.var_of_dim(3), None);
    }

    #[test]
    fn ordering_by_inclusion() {
        let x = Environment::new(&vars(&["x"]), &[]).unwrap();
        let xy = Environment::new(&vars(&["x"]), &vars(&["y"])).unwrap();
        let x_ = Environment::new(&vars(&["x"]), &[]).unwrap();
        assert!(x < xy);
        assert!(x == x_);
        assert!(x > Environment::empty());
        let y = Environment::new(&vars(&["y"]), &[]).unwrap();
        assert_eq!(x.partial_cmp(&y), None);
        assert_eq!(y.compare(&xy), EnvOrdering::Incompatible);
    }

    #[test]
    fn union_and_conflicts() {
        let a = Environment::new(&vars(&["x"]), &vars(&["z"])).unwrap();
        let b = Environment::new(&vars(&["y"]), &vars(&["z"])).unwrap();
        assert_eq!(a.lce(&b).unwrap(), xy_z());
        let c = Environment::new(&[], &vars(&["x"])).unwrap();
        assert_eq!(
            a.lce(&c).err(),
            Some(Error::IncompatibleEnvironment(Var::new("x")))
        );
    }

    #[test]
    fn rename() {
        let e = Environment::new(&vars(&["x"]), &vars(&["y"])).unwrap();
        let (f, perm) = e.rename(&vars(&["y"]), &vars(&["z"])).unwrap();
        assert_eq!(f.to_string(), "{x|z}");
        assert!(perm.is_identity());
        let (g, perm) = e.rename(&vars(&["x"]), &vars(&["a"])).unwrap();
        assert_eq!(g.to_string(), "{a|y}");
        assert!(perm.is_identity());
        let e2 = Environment::new(&vars(&["a", "b"]), &[]).unwrap();
        let (h, perm) = e2.rename(&vars(&["a"]), &vars(&["c"])).unwrap();
        assert_eq!(h.to_string(), "{b,c|}");
        assert_eq!(perm.apply(0), 1);
        assert_eq!(perm.apply(1), 0);
        assert!(matches!(
            e.rename(&vars(&["x"]), &vars(&["y"])),
            Err(Error::InvalidRenaming(_))
        ));
    }

    #[test]
    fn dimchange_embedding() {
        let a = Environment::new(&vars(&["y"]), &[]).unwrap();
        let c = a.dimchange(&xy_z()).unwrap();
        assert_eq!(c.dims, vec![0, 1]);
        assert_eq!((c.intdim, c.realdim), (1, 1));
        assert_eq!(c.add_map(1), vec![1]);
        assert_eq!(c.added_dims(), vec![0, 2]);
        let v = c.insert_into(&["y"], || "?");
        assert_eq!(v, vec!["?", "y", "?"]);
        assert!(xy_z().dimchange(&a).is_none());
    }

    #[test]
    fn dimchange2_moves_between_envs() {
        let a = Environment::new(&vars(&["x"]), &vars(&["z"])).unwrap();
        let b = Environment::new(&vars(&["y"]), &vars(&["z"])).unwrap();
        let c = a.dimchange2(&b).unwrap();
        assert_eq!(c.add.as_ref().map(|c| c.dims.clone()), Some(vec![1]));
        assert_eq!(c.remove.as_ref().map(|c| c.dims.clone()), Some(vec![0]));
        let r = c.remove.unwrap();
        assert_eq!(r.remove_map(3), vec![None, Some(0), Some(1)]);
        assert_eq!(r.remove_from(&["x", "y", "z"]), vec!["y", "z"]);
    }

    #[test]
    fn perm_inverse() {
        let p = DimPerm::new(vec![2, 0, 1]);
        assert_eq!(p.permute(&['a', 'b', 'c']), vec!['b', 'c', 'a']);
        let q = p.inverse();
        assert_eq!(q.permute(&p.permute(&['a', 'b', 'c'])), vec!['a', 'b', 'c']);
    }
}
