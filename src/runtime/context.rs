//! Execution-context seam between the scheduler and the interpreter.
//!
//! The scheduler never touches interpreter internals; it acts on suspended
//! contexts through the narrow [`ScriptContext`] trait. The stock
//! implementations here cover the three shapes the runtime needs:
//! [`RootContext`] for an instance's main thread of execution,
//! [`ParkedWaiter`] for a coroutine suspended in `wait`, and
//! [`CallbackContext`] for a never-started context bound to a `delay`
//! callback.

use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::runtime::clock::Seconds;
use crate::runtime::errors::ContextFault;

/// Security identity level of an execution context, 0..=8.
///
/// Read by authorization checks performed outside this crate; freshly
/// provisioned run contexts start at level 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityLevel(u8);

impl IdentityLevel {
    /// Unprivileged scripts.
    pub const ANONYMOUS: IdentityLevel = IdentityLevel(0);
    /// Default for freshly provisioned run contexts.
    pub const DEFAULT: IdentityLevel = IdentityLevel(2);
    /// Highest recognized level.
    pub const MAX: IdentityLevel = IdentityLevel(8);

    /// Create an identity level; `None` if out of the 0..=8 range.
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX.0).then_some(Self(level))
    }

    /// Raw level value.
    #[inline]
    pub fn level(self) -> u8 {
        self.0
    }

    /// Whether this identity meets `required`.
    #[inline]
    pub fn at_least(
        self,
        required: IdentityLevel,
    ) -> bool {
        self >= required
    }
}

impl Default for IdentityLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for IdentityLevel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value delivered when a suspended context is woken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resumption {
    /// Wake with no values.
    Empty,
    /// Wake with the wall-clock seconds elapsed since suspension.
    Elapsed(Seconds),
}

/// Coroutine-like unit of interpreter execution.
///
/// `resume` and `invoke` run on the driver thread and must hand control back
/// promptly; long-running script work belongs to the interpreter, not the
/// wake path. Errors are reported into the `parent` context, the context
/// that would logically have been the caller had the call been synchronous.
pub trait ScriptContext: Send + Sync {
    /// Resume a previously suspended context with `value`.
    fn resume(
        &self,
        parent: &ContextRef,
        value: Resumption,
    ) -> Result<(), ContextFault>;

    /// First start of a never-run context, with no arguments.
    fn invoke(
        &self,
        parent: &ContextRef,
    ) -> Result<(), ContextFault>;

    /// Whether this is the host instance's root execution context.
    fn is_root(&self) -> bool {
        false
    }

    /// Identity/permission level read for authorization checks elsewhere.
    fn identity(&self) -> IdentityLevel {
        IdentityLevel::DEFAULT
    }

    /// Accept a fault raised by a child this context is the error target of.
    ///
    /// Default: log and forget. Implementations that surface errors later
    /// (e.g. a REPL printing an unhandled-error trace) override this.
    fn report(
        &self,
        fault: ContextFault,
    ) {
        tracing::warn!("unhandled script error: {}", fault);
    }
}

/// Shared handle to an execution context.
pub type ContextRef = Arc<dyn ScriptContext>;

/// Root execution context of a host instance.
///
/// Never registered for a wake: there is no parent available to drive an
/// asynchronous resumption of the root, so `wait` on it blocks the calling
/// thread instead. Faults reported into the root accumulate until the
/// embedder observes them.
pub struct RootContext {
    identity: IdentityLevel,
    faults: Mutex<Vec<ContextFault>>,
}

impl RootContext {
    /// Create a root context with the given identity.
    pub fn new(identity: IdentityLevel) -> Self {
        Self {
            identity,
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Drain faults reported into this root since the last observation.
    pub fn take_faults(&self) -> Vec<ContextFault> {
        std::mem::take(&mut *self.faults.lock())
    }
}

impl Default for RootContext {
    fn default() -> Self {
        Self::new(IdentityLevel::DEFAULT)
    }
}

impl ScriptContext for RootContext {
    fn resume(
        &self,
        _parent: &ContextRef,
        _value: Resumption,
    ) -> Result<(), ContextFault> {
        // The root is never suspended through the registry.
        Err(ContextFault::NotSuspended)
    }

    fn invoke(
        &self,
        _parent: &ContextRef,
    ) -> Result<(), ContextFault> {
        Err(ContextFault::AlreadyStarted)
    }

    fn is_root(&self) -> bool {
        true
    }

    fn identity(&self) -> IdentityLevel {
        self.identity
    }

    fn report(
        &self,
        fault: ContextFault,
    ) {
        self.faults.lock().push(fault);
    }
}

impl fmt::Debug for RootContext {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RootContext")
            .field("identity", &self.identity)
            .finish()
    }
}

/// A suspended waiter parked on a channel.
///
/// The script side blocks in [`WaitGate::block`]; the driver delivers the
/// wake value through [`ScriptContext::resume`]. Dropping the registry entry
/// without resuming (instance teardown) unblocks the gate with
/// [`ContextFault::Detached`].
pub struct ParkedWaiter {
    wake: Sender<Resumption>,
    identity: IdentityLevel,
}

/// Receiving half of a [`ParkedWaiter`].
pub struct WaitGate {
    wake: Receiver<Resumption>,
}

impl ParkedWaiter {
    /// Create a parked waiter and the gate its thread blocks on.
    pub fn park(identity: IdentityLevel) -> (ContextRef, WaitGate) {
        let (tx, rx) = bounded(1);
        let waiter: ContextRef = Arc::new(Self {
            wake: tx,
            identity,
        });
        (waiter, WaitGate { wake: rx })
    }
}

impl ScriptContext for ParkedWaiter {
    fn resume(
        &self,
        _parent: &ContextRef,
        value: Resumption,
    ) -> Result<(), ContextFault> {
        self.wake
            .try_send(value)
            .map_err(|_| ContextFault::Detached)
    }

    fn invoke(
        &self,
        _parent: &ContextRef,
    ) -> Result<(), ContextFault> {
        Err(ContextFault::AlreadyStarted)
    }

    fn identity(&self) -> IdentityLevel {
        self.identity
    }
}

impl fmt::Debug for ParkedWaiter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ParkedWaiter")
            .field("identity", &self.identity)
            .finish()
    }
}

impl WaitGate {
    /// Block the calling thread until the driver wakes this context.
    ///
    /// Returns [`ContextFault::Detached`] if the owning instance was torn
    /// down with the wake still pending.
    pub fn block(self) -> Result<Resumption, ContextFault> {
        self.wake.recv().map_err(|_| ContextFault::Detached)
    }
}

/// Callback bound to a never-started context, as created by `delay`.
type BoundCallback = Box<dyn FnOnce() -> Result<(), ContextFault> + Send>;

/// A brand-new execution context bound to a callable value.
///
/// `invoke` consumes the callback; a second invocation (or any `resume`)
/// is a fault.
pub struct CallbackContext {
    callback: Mutex<Option<BoundCallback>>,
    identity: IdentityLevel,
}

impl CallbackContext {
    /// Bind `callback` to a fresh, not-yet-started context.
    pub fn bind<F>(
        callback: F,
        identity: IdentityLevel,
    ) -> ContextRef
    where
        F: FnOnce() -> Result<(), ContextFault> + Send + 'static,
    {
        Arc::new(Self {
            callback: Mutex::new(Some(Box::new(callback))),
            identity,
        })
    }
}

impl ScriptContext for CallbackContext {
    fn resume(
        &self,
        _parent: &ContextRef,
        _value: Resumption,
    ) -> Result<(), ContextFault> {
        Err(ContextFault::NotSuspended)
    }

    fn invoke(
        &self,
        _parent: &ContextRef,
    ) -> Result<(), ContextFault> {
        let callback = self
            .callback
            .lock()
            .take()
            .ok_or(ContextFault::AlreadyStarted)?;
        callback()
    }

    fn identity(&self) -> IdentityLevel {
        self.identity
    }
}

impl fmt::Debug for CallbackContext {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CallbackContext")
            .field("identity", &self.identity)
            .field("started", &self.callback.lock().is_none())
            .finish()
    }
}
