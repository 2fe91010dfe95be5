//! Lifecycle extension hooks.
//!
//! Server variants extend startup and shutdown without touching the
//! core state machine by supplying an implementation of
//! [`LifecycleHooks`] at construction. Both methods default to no-ops,
//! so a variant overrides only what it needs.

/// Error type returned by lifecycle hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Extension points invoked around the core lifecycle transitions.
pub trait LifecycleHooks: Send + Sync {
    /// Called once per `start`, after the listener is bound and
    /// accepting. An error propagates to the `start` caller.
    fn on_start(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once per `stop`, before the listener is released, so
    /// dependent resources can be torn down first. An error is logged
    /// and never blocks shutdown.
    fn on_stop(&self) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks that do nothing; the default when none are supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl LifecycleHooks for NoHooks {}
