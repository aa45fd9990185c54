//! Runtime unit tests
//!
//! Covers the wake registry, driver loop, suspension primitives, contexts,
//! and the interrupt bridge.
