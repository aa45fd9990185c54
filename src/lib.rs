//! Rill Embedded-Scripting Runtime
//!
//! Timed suspension and deferred resumption for scripts embedded in a host
//! process. Scripts call `wait(seconds)` to suspend themselves and resume
//! automatically, or `delay(seconds, callback)` to schedule a callback
//! without blocking the caller. A single background driver services any
//! number of independently-sandboxed interpreter instances.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rill::runtime::{suspend, IdentityLevel, RootContext, ScriptHost};
//!
//! let host = ScriptHost::new();
//! host.start_scheduler();
//!
//! let root = Arc::new(RootContext::new(IdentityLevel::DEFAULT));
//! let instance = host.create_instance(root);
//!
//! // Schedule a callback half a second from now; the caller keeps running.
//! let caller = instance.root().clone();
//! suspend::delay(&instance, &caller, 0.5, || {
//!     println!("half a second later");
//!     Ok(())
//! })
//! .unwrap();
//! ```
//!
//! The interpreter itself (compilation, bytecode execution, REPL) is an
//! external collaborator reached through the [`runtime::ScriptContext`] seam.

#![doc(html_root_url = "https://docs.rs/rill")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

pub use runtime::{
    CancelToken, ContextRef, HostInstance, IdentityLevel, InstanceRegistry, InterruptBridge,
    ResumeMode, Resumption, RootContext, SchedulerDriver, ScriptContext, ScriptHost, Ticket,
    WakeRegistry,
};

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime name
pub const NAME: &str = "Rill";
