//! Per-instance table of pending wakes.
//!
//! Insertions come from whichever thread runs `wait`/`delay`; removals come
//! from the driver thread during [`WakeRegistry::drain_due`]. Both go
//! through one mutex per registry, so a registration racing a drain is
//! simply ordered before or after it and becomes visible no later than the
//! next tick.

use std::fmt;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::runtime::clock::Seconds;
use crate::runtime::context::ContextRef;

/// Opaque handle identifying one pending scheduled wake.
///
/// Valid exactly while its entry is pending; unique for the lifetime of the
/// owning host instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw counter value.
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// How the driver hands control back to a due context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    /// Resume an existing suspended context.
    Resume,
    /// First invocation of a freshly created, not-yet-started context.
    Invoke,
}

/// Due-time and resumption metadata for one pending wake.
///
/// While the entry is pending the registry is the sole authority over
/// `context`: nothing else may resume, invoke, or drop it.
pub struct WakeDescriptor {
    /// The execution context to act upon.
    pub context: ContextRef,
    /// Error-propagation target for the resumption.
    pub parent: ContextRef,
    /// When the entry becomes due, in seconds.
    pub wake_at: Seconds,
    /// When the entry was created, in seconds.
    pub started_at: Seconds,
    /// Resume an existing context or first-start a new one.
    pub mode: ResumeMode,
    /// Deliver `now - started_at` as the sole resumption value.
    pub deliver_elapsed: bool,
}

impl fmt::Debug for WakeDescriptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WakeDescriptor")
            .field("wake_at", &self.wake_at)
            .field("started_at", &self.started_at)
            .field("mode", &self.mode)
            .field("deliver_elapsed", &self.deliver_elapsed)
            .finish()
    }
}

#[derive(Default)]
struct Entries {
    /// Monotonic, never reused. Exhaustion at 2^63 is out of scope.
    next_ticket: u64,
    /// Insertion-ordered so a drain resumes simultaneously-due entries in
    /// registration order.
    pending: IndexMap<u64, WakeDescriptor>,
}

/// Table mapping tickets to wake descriptors for one host instance.
#[derive(Default)]
pub struct WakeRegistry {
    inner: Mutex<Entries>,
}

/// Batch of entries matured by one drain.
pub type DueBatch = SmallVec<[(Ticket, WakeDescriptor); 4]>;

impl WakeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry and return its ticket.
    pub fn register(
        &self,
        descriptor: WakeDescriptor,
    ) -> Ticket {
        let mut inner = self.inner.lock();
        let ticket = Ticket(inner.next_ticket);
        inner.next_ticket += 1;
        inner.pending.insert(ticket.0, descriptor);
        ticket
    }

    /// Atomically remove and return every entry with `wake_at <= now`.
    ///
    /// No entry is returned twice and none is silently skipped; entries
    /// registered while a drain is in progress are picked up no later than
    /// the next call.
    pub fn drain_due(
        &self,
        now: Seconds,
    ) -> DueBatch {
        let mut inner = self.inner.lock();
        let due: SmallVec<[u64; 4]> = inner
            .pending
            .iter()
            .filter(|(_, entry)| entry.wake_at <= now)
            .map(|(ticket, _)| *ticket)
            .collect();

        let mut batch = DueBatch::new();
        for ticket in due {
            if let Some(entry) = inner.pending.shift_remove(&ticket) {
                batch.push((Ticket(ticket), entry));
            }
        }
        batch
    }

    /// Abandon all pending entries without resuming them. Teardown only.
    pub fn discard_all(&self) {
        let dropped = {
            let mut inner = self.inner.lock();
            std::mem::take(&mut inner.pending)
        };
        if !dropped.is_empty() {
            tracing::debug!("discarded {} pending wake(s) at teardown", dropped.len());
        }
    }

    /// Number of pending entries.
    pub fn pending(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Whether no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}

impl fmt::Debug for WakeRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WakeRegistry")
            .field("next_ticket", &inner.next_ticket)
            .field("pending", &inner.pending.len())
            .finish()
    }
}
