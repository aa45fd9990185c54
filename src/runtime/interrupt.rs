//! Cooperative cancellation bridge for external interrupt signals.
//!
//! An asynchronous OS signal cannot stop a running script directly; it can
//! only mark the currently interruptible session as cancelled and stop the
//! scheduler driver. The interpreter's own execution-step check polls the
//! session's [`CancelToken`] and aborts the script with the designated
//! cancellation error at the next checked step.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::runtime::driver::SchedulerDriver;
use crate::runtime::errors::ContextFault;

/// Cancellation token polled by the interpreter's step hook.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the token cancelled. Atomic-only.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a cancellation is pending.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Step hook: consume a pending cancellation, aborting the script.
    ///
    /// The pending flag is cleared on observation so the session can keep
    /// accepting input after the aborted script unwinds.
    pub fn check(&self) -> Result<(), ContextFault> {
        if self.flag.swap(false, Ordering::SeqCst) {
            Err(ContextFault::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Bridge between an asynchronous interrupt signal and the runtime.
///
/// One bridge per process. The component that owns the interactive session
/// takes a [`CancelToken`] via [`InterruptBridge::session_token`] and hands
/// it to the interpreter's step hook; the signal handler calls
/// [`InterruptBridge::trigger`], which touches nothing but atomics.
pub struct InterruptBridge {
    pending: Arc<AtomicBool>,
    driver: Arc<SchedulerDriver>,
}

static BRIDGE: OnceCell<InterruptBridge> = OnceCell::new();

impl InterruptBridge {
    /// Install the process-wide bridge. The first call wins; later calls
    /// return the already-installed bridge.
    pub fn install(driver: Arc<SchedulerDriver>) -> &'static InterruptBridge {
        BRIDGE.get_or_init(|| InterruptBridge {
            pending: Arc::new(AtomicBool::new(false)),
            driver,
        })
    }

    /// The installed bridge, if any. Safe to call from a signal handler.
    pub fn installed() -> Option<&'static InterruptBridge> {
        BRIDGE.get()
    }

    /// Begin an interruptible session: clears any stale cancellation and
    /// returns the token its step hook should poll.
    pub fn session_token(&self) -> CancelToken {
        self.pending.store(false, Ordering::SeqCst);
        CancelToken {
            flag: self.pending.clone(),
        }
    }

    /// Signal-handler entry point: request cancellation of the current
    /// session and stop the scheduler driver. Atomic-only.
    pub fn trigger(&self) {
        self.pending.store(true, Ordering::SeqCst);
        self.driver.stop();
    }
}

impl fmt::Debug for InterruptBridge {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("InterruptBridge")
            .field("pending", &self.pending.load(Ordering::SeqCst))
            .finish()
    }
}
