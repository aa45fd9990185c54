//! Script-facing `wait` and `delay` primitives.
//!
//! Both create entries in the calling instance's [`WakeRegistry`]; the one
//! exception is `wait` on the root context, which blocks the calling thread
//! directly because no parent exists to drive an asynchronous resumption of
//! the root.

use std::thread;
use std::time::Duration;

use crate::runtime::clock::{self, Seconds};
use crate::runtime::context::{CallbackContext, ContextRef, IdentityLevel, ParkedWaiter, Resumption};
use crate::runtime::errors::{ContextFault, SuspendError, UsageError};
use crate::runtime::instance::HostInstance;
use crate::runtime::wake::{ResumeMode, Ticket, WakeDescriptor};

/// What a call to [`wait`] did.
#[derive(Debug)]
pub enum WaitOutcome {
    /// Root-context wait: the blocking sleep already happened; this is the
    /// elapsed time.
    Completed(Seconds),
    /// The caller must now suspend; the driver delivers the elapsed time as
    /// the single resumption value once the ticket matures.
    Suspended(Ticket),
}

fn check_duration(seconds: Seconds) -> Result<(), UsageError> {
    if !seconds.is_finite() {
        return Err(UsageError::NonFiniteDuration);
    }
    if seconds < 0.0 {
        return Err(UsageError::NegativeDuration(seconds));
    }
    Ok(())
}

/// Sleep length for a root-context wait. Durations beyond `Duration`'s
/// range saturate: sleeping `Duration::MAX` is indistinguishable from the
/// requested wait and must not panic on a script-supplied value.
pub(crate) fn blocking_duration(seconds: Seconds) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// Suspend `caller` for `seconds`.
///
/// On the root context this performs a real blocking sleep on the calling
/// thread and returns [`WaitOutcome::Completed`]. On any other context it
/// registers a wake and returns [`WaitOutcome::Suspended`]; the interpreter
/// must then actually yield the context, and the later resumption delivers
/// the elapsed time.
pub fn wait(
    instance: &HostInstance,
    caller: &ContextRef,
    seconds: Seconds,
) -> Result<WaitOutcome, SuspendError> {
    check_duration(seconds)?;
    let start = clock::now()?;

    if caller.is_root() {
        thread::sleep(blocking_duration(seconds));
        let end = clock::now()?;
        return Ok(WaitOutcome::Completed(end - start));
    }

    let ticket = instance.registry().register(WakeDescriptor {
        context: caller.clone(),
        parent: instance.root().clone(),
        wake_at: start + seconds,
        started_at: start,
        mode: ResumeMode::Resume,
        deliver_elapsed: true,
    });
    Ok(WaitOutcome::Suspended(ticket))
}

/// Run `callback` roughly `seconds` from now without suspending `caller`.
///
/// A brand-new, never-started context is bound to the callback and
/// registered for invocation; errors it raises are reported into `caller`.
/// Returns as soon as the entry is registered.
pub fn delay<F>(
    instance: &HostInstance,
    caller: &ContextRef,
    seconds: Seconds,
    callback: F,
) -> Result<(), SuspendError>
where
    F: FnOnce() -> Result<(), ContextFault> + Send + 'static,
{
    check_duration(seconds)?;
    let start = clock::now()?;

    let context = CallbackContext::bind(callback, caller.identity());
    instance.registry().register(WakeDescriptor {
        context,
        parent: caller.clone(),
        wake_at: start + seconds,
        started_at: start,
        mode: ResumeMode::Invoke,
        deliver_elapsed: false,
    });
    Ok(())
}

/// Full `wait` for a coroutine thread: register, park, and return the
/// delivered elapsed time once the driver wakes it.
///
/// This is the script-visible `wait(seconds) -> seconds` composition for
/// embeddings whose suspended contexts are parked threads. Must not be
/// called on the instance's root thread of execution; use [`wait`] with the
/// root context for that.
pub fn wait_parked(
    instance: &HostInstance,
    identity: IdentityLevel,
    seconds: Seconds,
) -> Result<Seconds, SuspendError> {
    check_duration(seconds)?;
    let start = clock::now()?;

    let (waiter, gate) = ParkedWaiter::park(identity);
    instance.registry().register(WakeDescriptor {
        context: waiter,
        parent: instance.root().clone(),
        wake_at: start + seconds,
        started_at: start,
        mode: ResumeMode::Resume,
        deliver_elapsed: true,
    });

    match gate.block()? {
        Resumption::Elapsed(elapsed) => Ok(elapsed),
        Resumption::Empty => Ok(0.0),
    }
}
