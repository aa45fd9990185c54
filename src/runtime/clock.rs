//! Time source for wake scheduling.
//!
//! All scheduling math is done in fractional seconds since the unix epoch,
//! matching the precision scripts see from the `tick()` global.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::runtime::errors::ClockFault;

/// Wall-clock seconds with sub-millisecond resolution.
pub type Seconds = f64;

/// Read the current time.
///
/// Fails only when the system clock reads before the unix epoch; the driver
/// treats that as fatal and stops cleanly rather than resume entries against
/// an inconsistent timeline.
pub fn now() -> Result<Seconds, ClockFault> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .map_err(|_| ClockFault::BeforeEpoch)
}
