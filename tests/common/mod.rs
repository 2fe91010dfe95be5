//! Shared utilities for lifecycle integration tests.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use tcp_host::server::HookError;
use tcp_host::{
    ConnectionHandler, FramedConnection, LifecycleHooks, MetricsListener, MetricsListenerFactory,
    RawPipeline, ServerConfig, ServerEvent, TcpServer, TcpServerBuilder,
};

/// Handler that writes every received frame back to the peer.
pub struct EchoHandler;

impl ConnectionHandler for EchoHandler {
    fn handle(&self, mut conn: FramedConnection) -> BoxFuture<'static, io::Result<()>> {
        async move {
            while let Some(frame) = conn.recv().await? {
                conn.send(&frame).await?;
            }
            Ok(())
        }
        .boxed()
    }
}

/// Shared, cloneable record of every event a server emitted.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ServerEvent>>>,
}

impl EventLog {
    pub fn snapshot(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event kinds in emission order, for compact assertions.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.snapshot()
            .iter()
            .map(|e| match e {
                ServerEvent::Started { .. } => "started",
                ServerEvent::ConnectionOpened { .. } => "connection_opened",
                ServerEvent::ConnectionClosed { .. } => "connection_closed",
                ServerEvent::AcceptFailed => "accept_failed",
                ServerEvent::Stopped => "stopped",
            })
            .collect()
    }
}

/// Metrics listener factory that appends every event to an [`EventLog`].
pub struct LoggingFactory(pub EventLog);

impl MetricsListenerFactory for LoggingFactory {
    fn create(&self, _server_name: &str) -> Arc<dyn MetricsListener> {
        Arc::new(LoggingListener(self.0.clone()))
    }
}

struct LoggingListener(EventLog);

impl MetricsListener for LoggingListener {
    fn on_event(&self, event: &ServerEvent) {
        self.0.events.lock().unwrap().push(event.clone());
    }
}

/// Hooks that count invocations and optionally probe the listener port.
#[derive(Clone, Default)]
pub struct CountingHooks {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    /// When set, each hook records whether a TCP connect to this port
    /// succeeded at the moment the hook ran.
    pub probe_port: Option<u16>,
    pub start_saw_listener: Arc<AtomicUsize>,
    pub stop_saw_listener: Arc<AtomicUsize>,
}

impl CountingHooks {
    fn probe(&self, seen: &AtomicUsize) {
        if let Some(port) = self.probe_port {
            if std::net::TcpStream::connect(("127.0.0.1", port)).is_ok() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl LifecycleHooks for CountingHooks {
    fn on_start(&self) -> Result<(), HookError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.probe(&self.start_saw_listener);
        Ok(())
    }

    fn on_stop(&self) -> Result<(), HookError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.probe(&self.stop_saw_listener);
        Ok(())
    }
}

/// Config bound to loopback, suitable for tests.
pub fn loopback_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.transport.bind_host = "127.0.0.1".to_string();
    config
}

/// Builder for an echo server on loopback with an event log attached.
pub fn echo_server(port: u16, events: &EventLog) -> TcpServerBuilder {
    TcpServer::builder("echo")
        .config(loopback_config())
        .port(port)
        .pipeline(RawPipeline)
        .handler(EchoHandler)
        .metrics_factory(LoggingFactory(events.clone()))
}
