//! Background polling loop that wakes due entries.
//!
//! One driver services every live host instance. Each tick it snapshots the
//! clock once, drains every registry, and dispatches the matured entries by
//! resume mode. Per-entry failures are isolated: a misbehaving context never
//! prevents other due entries, other instances, or future ticks.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::runtime::clock::{self, Seconds};
use crate::runtime::context::Resumption;
use crate::runtime::errors::ClockFault;
use crate::runtime::instance::{InstanceId, InstanceRegistry};
use crate::runtime::wake::{ResumeMode, Ticket, WakeDescriptor};

/// Driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Poll interval. Bounds wake latency without busy-spinning.
    pub tick: Duration,
    /// Name for the driver thread.
    pub thread_name: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1),
            thread_name: "wake-driver".to_string(),
        }
    }
}

/// Time source polled once per driver tick.
pub type ClockSource = fn() -> Result<Seconds, ClockFault>;

/// Single background loop resuming matured wakes across all instances.
///
/// `start` is idempotent and `stop` is safe from any thread at any time,
/// including a signal handler: it is a single atomic store, observed by the
/// loop within one tick. Restart after stop is supported.
pub struct SchedulerDriver {
    instances: Arc<InstanceRegistry>,
    config: DriverConfig,
    clock: ClockSource,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SchedulerDriver {
    /// Create a stopped driver polling `instances`.
    pub fn new(instances: Arc<InstanceRegistry>) -> Self {
        Self::with_config(instances, DriverConfig::default())
    }

    /// Create a stopped driver with custom configuration.
    pub fn with_config(
        instances: Arc<InstanceRegistry>,
        config: DriverConfig,
    ) -> Self {
        Self::with_clock(instances, config, clock::now)
    }

    /// Create a stopped driver reading time through `clock` instead of the
    /// system clock.
    pub fn with_clock(
        instances: Arc<InstanceRegistry>,
        config: DriverConfig,
        clock: ClockSource,
    ) -> Self {
        Self {
            instances,
            config,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Start the polling loop. A second start while running is a no-op.
    pub fn start(&self) {
        let mut slot = self.handle.lock();
        if self.running.load(Ordering::SeqCst) {
            return;
        }
        // A previous loop may still be finishing its last tick; let it exit
        // fully before the flag flips back to running.
        if let Some(previous) = slot.take() {
            let _ = previous.join();
        }
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let instances = self.instances.clone();
        let tick = self.config.tick;
        let clock = self.clock;
        let worker = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || Self::run_loop(&running, &instances, tick, clock))
            .expect("Failed to spawn driver thread");
        *slot = Some(worker);
    }

    /// Request the loop to stop. Atomic-only, callable from a signal
    /// handler; the loop observes it within one tick and resumes nothing
    /// further from that point on.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop and wait for the loop to exit. Not signal-safe.
    pub fn shutdown(&self) {
        self.stop();
        if let Some(worker) = self.handle.lock().take() {
            let _ = worker.join();
        }
    }

    /// Whether the loop is (being) run.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Poll interval.
    pub fn tick(&self) -> Duration {
        self.config.tick
    }

    fn run_loop(
        running: &AtomicBool,
        instances: &InstanceRegistry,
        tick: Duration,
        clock: ClockSource,
    ) {
        tracing::debug!("scheduler driver started");
        while running.load(Ordering::SeqCst) {
            // One time snapshot per tick; every drain and every delivered
            // elapsed value uses it.
            let now = match clock() {
                Ok(now) => now,
                Err(fault) => {
                    tracing::error!("clock read failed, stopping driver: {}", fault);
                    running.store(false, Ordering::SeqCst);
                    break;
                }
            };

            for instance in instances.snapshot() {
                for (ticket, entry) in instance.registry().drain_due(now) {
                    Self::dispatch(instance.id(), ticket, entry, now);
                }
            }

            thread::sleep(tick);
        }
        tracing::debug!("scheduler driver stopped");
    }

    fn dispatch(
        instance: InstanceId,
        ticket: Ticket,
        entry: WakeDescriptor,
        now: Seconds,
    ) {
        let outcome = match entry.mode {
            ResumeMode::Resume => {
                let value = if entry.deliver_elapsed {
                    Resumption::Elapsed(now - entry.started_at)
                } else {
                    Resumption::Empty
                };
                entry.context.resume(&entry.parent, value)
            }
            ResumeMode::Invoke => entry.context.invoke(&entry.parent),
        };

        if let Err(fault) = outcome {
            tracing::warn!(
                "{} wake of ticket {} failed: {}",
                instance,
                ticket.value(),
                fault
            );
            entry.parent.report(fault);
        }
    }
}

impl fmt::Debug for SchedulerDriver {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SchedulerDriver")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for SchedulerDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
