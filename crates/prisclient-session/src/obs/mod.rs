//! Session observability.
//!
//! The engine never logs through a global: every state transition, rejection,
//! and transport error is reported to an injected [`Observer`]. The default
//! [`TracingObserver`] forwards to `tracing`; [`MeteredObserver`] additionally
//! keeps Prometheus-compatible counters in a shared [`SessionMetrics`].

pub mod metrics;
pub mod observer;

pub use metrics::{MeteredObserver, SessionMetrics};
pub use observer::{Direction, Level, Observer, SessionEvent, TracingObserver};
