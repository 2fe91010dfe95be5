//! Reusable TCP server lifecycle manager.
//!
//! Binds a TCP listener on a configured port, frames traffic through a
//! caller-supplied wire pipeline, dispatches each accepted connection
//! to a caller-supplied handler, reports server and connection events
//! to a caller-supplied metrics listener, and provides deterministic
//! startup/shutdown semantics with injected extension hooks.
//!
//! ```text
//! ServerConfig + PipelineConfigurator + ConnectionHandler
//!     + MetricsListenerFactory (+ LifecycleHooks)
//!         → TcpServer::builder(...).build()
//!         → start(): bind → accept loop → on_start → log
//!         → per connection: permit → FramedConnection → handler task
//!         → stop(): on_stop → stop accepting → drain → release
//! ```

pub mod config;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod server;

pub use config::ServerConfig;
pub use observability::{MetricsListener, MetricsListenerFactory, ServerEvent};
pub use pipeline::{FramedConnection, PipelineConfigurator, RawPipeline, WireCodec};
pub use server::{
    ConnectionHandler, LifecycleHooks, LifecycleState, ServerError, TcpServer, TcpServerBuilder,
};
