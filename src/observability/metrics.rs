//! Metrics events and listener capabilities.
//!
//! # Responsibilities
//! - Define the server/connection event vocabulary
//! - Define the listener and listener-factory capability traits the
//!   lifecycle manager composes
//! - Provide a recorder implementation backed by the `metrics` facade
//! - Install the Prometheus exposition endpoint
//!
//! # Metrics
//! - `tcp_server_starts_total` (counter): successful starts by server
//! - `tcp_server_stops_total` (counter): completed stops by server
//! - `tcp_connections_total` (counter): accepted connections
//! - `tcp_active_connections` (gauge): currently open connections
//! - `tcp_connection_duration_seconds` (histogram): connection lifetimes
//! - `tcp_accept_errors_total` (counter): failed accepts
//!
//! # Design Decisions
//! - Low-overhead updates (atomic operations in the facade)
//! - Every series labeled with the server name
//! - The exporter is installed by the binary, never by the library core

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Observable event in the life of a server or one of its connections.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// The listener is bound and accepting.
    Started { port: u16 },
    /// A connection was accepted.
    ConnectionOpened { peer: SocketAddr },
    /// A connection handler finished and the socket closed.
    ConnectionClosed { peer: SocketAddr, duration: Duration },
    /// An accept call failed; the server keeps running.
    AcceptFailed,
    /// The listener was released.
    Stopped,
}

/// Observer attached to one server instance.
pub trait MetricsListener: Send + Sync {
    fn on_event(&self, event: &ServerEvent);
}

/// Strategy producing the observer for a server instance.
pub trait MetricsListenerFactory: Send + Sync {
    fn create(&self, server_name: &str) -> Arc<dyn MetricsListener>;
}

/// Listener factory recording events to the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorderFactory;

impl MetricsListenerFactory for MetricsRecorderFactory {
    fn create(&self, server_name: &str) -> Arc<dyn MetricsListener> {
        Arc::new(MetricsRecorder {
            server: server_name.to_string(),
        })
    }
}

struct MetricsRecorder {
    server: String,
}

impl MetricsListener for MetricsRecorder {
    fn on_event(&self, event: &ServerEvent) {
        let server = self.server.clone();
        match event {
            ServerEvent::Started { .. } => {
                counter!("tcp_server_starts_total", "server" => server).increment(1);
            }
            ServerEvent::ConnectionOpened { .. } => {
                counter!("tcp_connections_total", "server" => server.clone()).increment(1);
                gauge!("tcp_active_connections", "server" => server).increment(1.0);
            }
            ServerEvent::ConnectionClosed { duration, .. } => {
                gauge!("tcp_active_connections", "server" => server.clone()).decrement(1.0);
                histogram!("tcp_connection_duration_seconds", "server" => server)
                    .record(duration.as_secs_f64());
            }
            ServerEvent::AcceptFailed => {
                counter!("tcp_accept_errors_total", "server" => server).increment(1);
            }
            ServerEvent::Stopped => {
                counter!("tcp_server_stops_total", "server" => server).increment(1);
            }
        }
    }
}

/// Install the Prometheus exporter on the given address.
///
/// Failure to install is logged, not fatal: the server runs without an
/// exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}
