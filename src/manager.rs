//! Managers bind a domain backend to per-operation options and a result log.
//!
//! Every abstract value carries the [`Manager`] that created it. The manager decides which
//! backend implements the operations and lets callers tune each operation through a [`FunOpt`]
//! (algorithm hint, timeout, size limit, accuracy wishes). Backends never fail loudly: when an
//! operation times out, overflows or cannot be done exactly, the backend records the condition
//! through the [`OpContext`] it is handed and returns a sound over-approximation. The caller
//! inspects [`Manager::exn`], [`Manager::flag_exact`] and [`Manager::flag_best`] afterward.
//!
//! Managers use `Rc` and `RefCell` internally and are therefore not `Send`; use one per thread.
//!
//! [`Manager`]: ./struct.Manager.html
//! [`FunOpt`]: ./struct.FunOpt.html
//! [`OpContext`]: ./struct.OpContext.html
//! [`Manager::exn`]: ./struct.Manager.html#method.exn
//! [`Manager::flag_exact`]: ./struct.Manager.html#method.flag_exact
//! [`Manager::flag_best`]: ./struct.Manager.html#method.flag_best

use crate::num::ScalarKind;
use crate::DomainBackend;
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Identifies an operation, for options and for the exception log.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunId {
    Unknown,
    Top,
    Bottom,
    OfBox,
    IsBottom,
    IsTop,
    IsLeq,
    IsEq,
    IsDimensionUnconstrained,
    SatInterval,
    SatLincons,
    SatTcons,
    BoundDimension,
    BoundLinexpr,
    BoundTexpr,
    ToBox,
    ToLinconsArray,
    ToTconsArray,
    Meet,
    MeetArray,
    MeetLinconsArray,
    MeetTconsArray,
    Join,
    JoinArray,
    AssignLinexprArray,
    SubstituteLinexprArray,
    AssignTexprArray,
    SubstituteTexprArray,
    ForgetArray,
    Widening,
    ChangeEnvironment,
    RenameArray,
}

impl fmt::Display for FunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Kinds of conditions a backend can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exc {
    /// Nothing happened.
    None,
    /// The operation ran out of time and returned a coarser result.
    Timeout,
    /// The operation hit the size limit and returned a coarser result.
    OutOfSpace,
    /// A number became too large to represent and was replaced by an infinity.
    Overflow,
    /// The arguments were meaningless for this backend.
    InvalidArgument,
    /// The backend does not support the operation and returned a coarse result.
    NotImplemented,
}

/// One entry of the exception log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcRecord {
    /// What happened.
    pub exc: Exc,
    /// Which operation reported it.
    pub funid: FunId,
    /// A human readable explanation.
    pub msg: String,
}

/// Options for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunOpt {
    /// Algorithm selector. `0` is the backend default; larger values ask for more precision.
    pub algorithm: i32,
    /// Timeout in milliseconds, `0` for none.
    pub timeout: u64,
    /// Largest object the operation may build, in backend units. `0` for no limit.
    pub max_object_size: usize,
    /// Whether the caller cares about `flag_exact`.
    pub flag_exact_wanted: bool,
    /// Whether the caller cares about `flag_best`.
    pub flag_best_wanted: bool,
}

impl Default for FunOpt {
    fn default() -> FunOpt {
        FunOpt {
            algorithm: 0,
            timeout: 0,
            max_object_size: 0,
            flag_exact_wanted: false,
            flag_best_wanted: false,
        }
    }
}

/// Options of a manager.
#[derive(Debug, Clone)]
pub struct Options {
    funopt: HashMap<FunId, FunOpt>,
    abort_if_exception: HashSet<Exc>,
    /// Preferred scalar kind for values the manager hands back, such as bounds.
    pub scalar_discr: ScalarKind,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            funopt: HashMap::new(),
            abort_if_exception: HashSet::new(),
            scalar_discr: ScalarKind::Double,
        }
    }
}

/// The state of the last operation and the accumulated exception log.
#[derive(Debug, Clone)]
pub struct ResultLog {
    /// Every recorded exception, oldest first.
    pub exclog: Vec<ExcRecord>,
    /// The last exception raised by the last operation.
    pub exn: Exc,
    /// Whether the last operation was exact.
    pub flag_exact: bool,
    /// Whether the last operation produced the best approximation the domain allows.
    pub flag_best: bool,
}

impl Default for ResultLog {
    fn default() -> ResultLog {
        ResultLog {
            exclog: Vec::new(),
            exn: Exc::None,
            flag_exact: true,
            flag_best: true,
        }
    }
}

/// The state a backend sees while running one operation.
pub struct OpContext {
    funid: FunId,
    opt: FunOpt,
    start: Instant,
    abort: HashSet<Exc>,
    records: Vec<ExcRecord>,
    exact: bool,
    best: bool,
    timed_out: bool,
}

impl OpContext {
    /// A context for `funid` with the given options, not attached to any manager.
    pub fn new(funid: FunId, opt: FunOpt) -> OpContext {
        OpContext {
            funid,
            opt,
            start: Instant::now(),
            abort: HashSet::new(),
            records: Vec::new(),
            exact: true,
            best: true,
            timed_out: false,
        }
    }

    /// The running operation.
    pub fn funid(&self) -> FunId {
        self.funid
    }

    /// The options of the running operation.
    pub fn funopt(&self) -> &FunOpt {
        &self.opt
    }

    /// Record an exception. The result of the operation becomes neither exact nor known best.
    ///
    /// # Panics
    /// Panics if the manager was told to abort on `exc`.
    pub fn raise(&mut self, exc: Exc, msg: &str) {
        warn!("{:?} in {}: {}", exc, self.funid, msg);
        self.exact = false;
        self.best = false;
        if self.abort.contains(&exc) {
            panic!("Aborting on {:?} in {}: {}", exc, self.funid, msg);
        }
        self.records.push(ExcRecord {
            exc,
            funid: self.funid,
            msg: msg.to_string(),
        });
    }

    /// Whether the timeout has expired. The first time it does, a `Timeout` is recorded.
    pub fn timed_out(&mut self) -> bool {
        if self.timed_out {
            return true;
        }
        if self.opt.timeout > 0 && self.start.elapsed() >= Duration::from_millis(self.opt.timeout)
        {
            self.timed_out = true;
            self.raise(Exc::Timeout, "timeout expired");
        }
        self.timed_out
    }

    /// Whether an object of `size` units exceeds the size limit. If it does, an `OutOfSpace` is
    /// recorded.
    pub fn exceeds_size(&mut self, size: usize) -> bool {
        if self.opt.max_object_size > 0 && size > self.opt.max_object_size {
            self.raise(
                Exc::OutOfSpace,
                &format!("object of size {} over the limit", size),
            );
            return true;
        }
        false
    }

    /// Mark the result as an over-approximation.
    pub fn inexact(&mut self) {
        self.exact = false;
    }

    /// Mark the result as possibly coarser than the best the domain allows.
    pub fn not_best(&mut self) {
        self.best = false;
    }

    /// Whether the operation is still exact.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Whether the operation is still best.
    pub fn is_best(&self) -> bool {
        self.best
    }

    /// The exceptions recorded so far.
    pub fn records(&self) -> &[ExcRecord] {
        &self.records
    }
}

struct ManagerInner<B> {
    backend: B,
    options: RefCell<Options>,
    result: RefCell<ResultLog>,
}

/// A shared handle to a domain backend with its options and result log.
///
/// # Examples
/// ```
/// # use numdom::manager::{Exc, FunId, FunOpt, Manager};
/// # use numdom::numerical::BoxDomain;
/// let man = Manager::new(BoxDomain::double());
/// assert_eq!(man.library(), "box");
/// let opt = FunOpt { algorithm: 20, ..FunOpt::default() };
/// man.set_funopt(FunId::MeetLinconsArray, opt);
/// assert_eq!(man.funopt(FunId::MeetLinconsArray).algorithm, 20);
/// assert_eq!(man.exn(), Exc::None);
/// ```
pub struct Manager<B: DomainBackend> {
    inner: Rc<ManagerInner<B>>,
}

impl<B: DomainBackend> Clone for Manager<B> {
    fn clone(&self) -> Manager<B> {
        Manager {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: DomainBackend> fmt::Debug for Manager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Manager({} {})", self.library(), self.version())
    }
}

impl<B: DomainBackend> Manager<B> {
    /// Bind a backend.
    pub fn new(backend: B) -> Manager<B> {
        Manager {
            inner: Rc::new(ManagerInner {
                backend,
                options: RefCell::new(Options::default()),
                result: RefCell::new(ResultLog::default()),
            }),
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// The backend's name.
    pub fn library(&self) -> &str {
        self.inner.backend.library()
    }

    /// The backend's version.
    pub fn version(&self) -> &str {
        self.inner.backend.version()
    }

    /// Whether two handles refer to the same manager.
    pub fn same(&self, other: &Manager<B>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The options of operation `id`.
    pub fn funopt(&self, id: FunId) -> FunOpt {
        self.inner
            .options
            .borrow()
            .funopt
            .get(&id)
            .copied()
            .unwrap_or_default()
    }

    /// Set the options of operation `id`.
    pub fn set_funopt(&self, id: FunId, opt: FunOpt) {
        self.inner.options.borrow_mut().funopt.insert(id, opt);
    }

    /// Whether `exc` turns into a panic.
    pub fn abort_if_exception(&self, exc: Exc) -> bool {
        self.inner.options.borrow().abort_if_exception.contains(&exc)
    }

    /// Choose whether `exc` turns into a panic.
    pub fn set_abort_if_exception(&self, exc: Exc, abort: bool) {
        let mut o = self.inner.options.borrow_mut();
        if abort {
            o.abort_if_exception.insert(exc);
        } else {
            o.abort_if_exception.remove(&exc);
        }
    }

    /// The preferred scalar kind for returned values.
    pub fn scalar_discr(&self) -> ScalarKind {
        self.inner.options.borrow().scalar_discr
    }

    /// Set the preferred scalar kind for returned values.
    pub fn set_scalar_discr(&self, kind: ScalarKind) {
        self.inner.options.borrow_mut().scalar_discr = kind;
    }

    /// The last exception of the last operation.
    pub fn exn(&self) -> Exc {
        self.inner.result.borrow().exn
    }

    /// Whether the last operation was exact.
    pub fn flag_exact(&self) -> bool {
        self.inner.result.borrow().flag_exact
    }

    /// Whether the last operation gave the best approximation.
    pub fn flag_best(&self) -> bool {
        self.inner.result.borrow().flag_best
    }

    /// A copy of the exception log.
    pub fn exclog(&self) -> Vec<ExcRecord> {
        self.inner.result.borrow().exclog.clone()
    }

    /// Empty the exception log.
    pub fn clear_exclog(&self) {
        let mut r = self.inner.result.borrow_mut();
        r.exclog.clear();
        r.exn = Exc::None;
    }

    /// Run one operation of the backend, then publish its flags and exceptions.
    pub(crate) fn run<T, F>(&self, funid: FunId, f: F) -> T
    where
        F: FnOnce(&B, &mut OpContext) -> T,
    {
        debug!("{} on {}", funid, self.library());
        let mut ctx = {
            let o = self.inner.options.borrow();
            let mut ctx = OpContext::new(funid, o.funopt.get(&funid).copied().unwrap_or_default());
            ctx.abort = o.abort_if_exception.clone();
            ctx
        };
        let out = f(&self.inner.backend, &mut ctx);
        let mut r = self.inner.result.borrow_mut();
        r.exn = ctx.records.last().map(|e| e.exc).unwrap_or(Exc::None);
        r.flag_exact = ctx.exact;
        r.flag_best = ctx.best;
        r.exclog.extend(ctx.records);
        out
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::numerical::BoxDomain;

    #[test]
    fn options_round_trip() {
        let man = Manager::new(BoxDomain::mpq());
        assert_eq!(man.funopt(FunId::Join), FunOpt::default());
        let opt = FunOpt {
            timeout: 10,
            flag_exact_wanted: true,
            ..FunOpt::default()
        };
        man.set_funopt(FunId::Join, opt);
        assert_eq!(man.funopt(FunId::Join), opt);
        assert_eq!(man.funopt(FunId::Meet), FunOpt::default());
        man.set_scalar_discr(ScalarKind::Mpq);
        assert_eq!(man.scalar_discr(), ScalarKind::Mpq);
        let other = man.clone();
        assert!(other.same(&man));
        assert!(!Manager::new(BoxDomain::mpq()).same(&man));
    }

    #[test]
    fn exceptions_are_logged() {
        let man = Manager::new(BoxDomain::double());
        let v = man.run(FunId::Widening, |_, ctx| {
            ctx.raise(Exc::NotImplemented, "no thresholds");
            3
        });
        assert_eq!(v, 3);
        assert_eq!(man.exn(), Exc::NotImplemented);
        assert!(!man.flag_exact());
        assert!(!man.flag_best());
        assert_eq!(man.exclog().len(), 1);
        assert_eq!(man.exclog()[0].funid, FunId::Widening);
        man.run(FunId::Top, |_, _| ());
        assert_eq!(man.exn(), Exc::None);
        assert!(man.flag_exact());
        assert_eq!(man.exclog().len(), 1);
        man.clear_exclog();
        assert!(man.exclog().is_empty());
    }

    #[test]
    fn timeouts_are_cooperative() {
        let man = Manager::new(BoxDomain::double());
        man.set_funopt(
            FunId::Join,
            FunOpt {
                timeout: 1,
                ..FunOpt::default()
            },
        );
        let hit = man.run(FunId::Join, |_, ctx| {
            std::thread::sleep(Duration::from_millis(5));
            ctx.timed_out() && ctx.timed_out()
        });
        assert!(hit);
        assert_eq!(man.exn(), Exc::Timeout);
        assert_eq!(man.exclog().len(), 1);
        let mut ctx = OpContext::new(FunId::Meet, FunOpt::default());
        assert!(!ctx.timed_out());
        assert!(!ctx.exceeds_size(1_000_000));
    }

    #[test]
    #[should_panic(expected = "Aborting on Overflow")]
    fn abort_if_exception() {
        let man = Manager::new(BoxDomain::double());
        man.set_abort_if_exception(Exc::Overflow, true);
        assert!(man.abort_if_exception(Exc::Overflow));
        man.run(FunId::Join, |_, ctx| ctx.raise(Exc::Overflow, "too big"));
    }
}
