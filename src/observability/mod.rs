//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle manager produces:
//!     → tracing events (structured logs)
//!     → ServerEvent stream → MetricsListener (per server instance)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The listener factory is a capability injected into the server, so
//!   callers can substitute their own observability sink
//! - Metric updates are cheap (atomic increments in the facade)

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsListener, MetricsListenerFactory, MetricsRecorderFactory, ServerEvent};
