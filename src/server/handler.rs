//! Connection handler capability.

use std::io;

use futures_util::future::BoxFuture;

use crate::pipeline::FramedConnection;

/// Strategy invoked once per accepted connection.
///
/// The handler owns the framed connection for its lifetime; returning
/// (or erroring) closes the socket. Handlers run on their own tokio
/// task, decoupled from the thread driving `start`/`stop`.
pub trait ConnectionHandler: Send + Sync {
    fn handle(&self, conn: FramedConnection) -> BoxFuture<'static, io::Result<()>>;
}
