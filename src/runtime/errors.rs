//! Scheduler errors

use thiserror::Error;

/// Invalid arguments to `wait`/`delay`, reported synchronously to the
/// calling context. Scheduler state is unaffected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UsageError {
    #[error("duration must be non-negative, got {0}")]
    NegativeDuration(f64),

    #[error("duration must be a finite number")]
    NonFiniteDuration,
}

/// Faults raised while waking or running an execution context.
///
/// Never escalated to the driver loop; each fault is reported into the
/// entry's parent context and surfaced the next time that context's error
/// state is observed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContextFault {
    #[error("context is no longer resumable")]
    Detached,

    #[error("context was already started")]
    AlreadyStarted,

    #[error("cannot resume a context that was never suspended")]
    NotSuspended,

    #[error("Execution interrupted")]
    Interrupted,

    #[error("script error: {0}")]
    Script(String),
}

/// Clock read failure. Fatal to the driver loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockFault {
    #[error("system clock reads before the unix epoch")]
    BeforeEpoch,
}

/// Anything `wait`/`delay` can report to their caller.
#[derive(Debug, Error)]
pub enum SuspendError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Clock(#[from] ClockFault),

    #[error(transparent)]
    Context(#[from] ContextFault),
}
