//! Server lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Caller supplies:
//!     config + pipeline configurator + connection handler
//!         + metrics listener factory + optional hooks
//!     → builder (validation, no I/O)
//!     → TcpServer (created)
//!     → start(): bind → accept loop → on_start hook → log
//!     → stop(): on_stop hook → stop accepting → drain → release
//! ```
//!
//! # Design Decisions
//! - Extension via injected hooks rather than inheritance
//! - State held as a tagged enum so the live handle cannot be observed
//!   outside the started state

pub mod error;
pub mod handler;
pub mod hooks;
pub mod lifecycle;

pub use error::ServerError;
pub use handler::ConnectionHandler;
pub use hooks::{HookError, LifecycleHooks, NoHooks};
pub use lifecycle::{LifecycleState, TcpServer, TcpServerBuilder};
