//! Deferred-resume task scheduling runtime
//!
//! One [`HostInstance`] per sandboxed interpreter root, each owning a
//! [`WakeRegistry`] of suspended execution contexts. A single background
//! [`SchedulerDriver`] polls every live instance once per tick and resumes
//! entries whose wake time has passed. The script-facing primitives live in
//! [`suspend`]; cooperative cancellation in [`interrupt`].

pub mod clock;
pub mod context;
pub mod driver;
pub mod errors;
pub mod host;
pub mod instance;
pub mod interrupt;
pub mod suspend;
pub mod wake;

pub use clock::Seconds;
pub use context::{
    CallbackContext, ContextRef, IdentityLevel, ParkedWaiter, Resumption, RootContext,
    ScriptContext, WaitGate,
};
pub use driver::{ClockSource, DriverConfig, SchedulerDriver};
pub use errors::{ClockFault, ContextFault, SuspendError, UsageError};
pub use host::ScriptHost;
pub use instance::{HostInstance, InstanceId, InstanceRegistry};
pub use interrupt::{CancelToken, InterruptBridge};
pub use suspend::{delay, wait, WaitOutcome};
pub use wake::{ResumeMode, Ticket, WakeDescriptor, WakeRegistry};

#[cfg(test)]
mod tests;
