//! Server lifecycle manager.
//!
//! # Responsibilities
//! - Own the created → started → stopped state machine
//! - Bind the listener and run the accept loop
//! - Compose the injected pipeline configurator, connection handler,
//!   and metrics listener factory around each connection
//! - Invoke lifecycle hooks at the documented points
//!
//! # Design Decisions
//! - The live socket exists only inside the `Started` state variant, so
//!   a handle can never be observed in any other state
//! - `start`/`stop` take `&mut self`: exactly one lifecycle controller
//!   at a time, enforced by the borrow checker
//! - Stop waits for the accept loop to drain in-flight connections and
//!   imposes no drain timeout of its own

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::{MetricsListener, MetricsListenerFactory, ServerEvent};
use crate::pipeline::{FramedConnection, PipelineConfigurator};
use crate::server::error::ServerError;
use crate::server::handler::ConnectionHandler;
use crate::server::hooks::{LifecycleHooks, NoHooks};

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Started,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Started => "started",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Live resources owned between a successful start and a stop.
struct ServerHandle {
    port: u16,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    events: Arc<dyn MetricsListener>,
}

enum ServerState {
    Created,
    Started(ServerHandle),
    Stopped,
}

/// A TCP server composed from caller-supplied capabilities.
///
/// Binds a listener on the configured port, frames traffic through the
/// injected pipeline, dispatches each accepted connection to the
/// injected handler on its own task, and reports every server and
/// connection event to the injected metrics listener.
///
/// `start` and `stop` are each intended to be called once, by a single
/// lifecycle controller; calling `start` twice is not guarded here.
pub struct TcpServer {
    name: String,
    config: Arc<ServerConfig>,
    requested_port: u16,
    bind_host: IpAddr,
    pipeline: Arc<dyn PipelineConfigurator>,
    handler: Arc<dyn ConnectionHandler>,
    metrics: Arc<dyn MetricsListenerFactory>,
    hooks: Arc<dyn LifecycleHooks>,
    state: ServerState,
}

impl fmt::Debug for TcpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpServer")
            .field("name", &self.name)
            .field("requested_port", &self.requested_port)
            .field("bind_host", &self.bind_host)
            .finish_non_exhaustive()
    }
}

impl TcpServer {
    /// Start building a server. `name` identifies the variant in logs
    /// and diagnostics.
    pub fn builder(name: impl Into<String>) -> TcpServerBuilder {
        TcpServerBuilder {
            name: name.into(),
            config: None,
            port: 0,
            pipeline: None,
            handler: None,
            metrics: None,
            hooks: Arc::new(NoHooks),
        }
    }

    /// Bind the listener and begin accepting connections.
    ///
    /// On success the server transitions to started and the structured
    /// start event is logged with the OS-confirmed port (which may
    /// differ from the requested port when 0 was requested). On bind
    /// failure the state remains created.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        let listener = Listener::bind(
            self.bind_host,
            self.requested_port,
            self.config.transport.max_connections,
        )
        .await
        .map_err(|e| match e {
            ListenerError::Bind { port, source } => ServerError::Bind { port, source },
            ListenerError::Accept(source) => ServerError::Bind {
                port: self.requested_port,
                source,
            },
        })?;

        let local_addr = listener.local_addr();
        let port = local_addr.port();
        let events = self.metrics.create(&self.name);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.pipeline),
            Arc::clone(&self.handler),
            Arc::clone(&events),
            shutdown_rx,
        ));

        self.state = ServerState::Started(ServerHandle {
            port,
            local_addr,
            shutdown: shutdown_tx,
            accept_task,
            events: Arc::clone(&events),
        });
        events.on_event(&ServerEvent::Started { port });

        self.hooks.on_start().map_err(ServerError::StartupHook)?;

        tracing::info!(
            server = %self.name,
            port,
            codec = %self.config.transport.codec,
            "starting TCP server"
        );
        Ok(())
    }

    /// Release the listener and drain in-flight connections.
    ///
    /// Safe to call in any state: without a live listener this is a
    /// no-op (beyond the shutdown hook). Failures during shutdown are
    /// logged and never surfaced; the handle is released regardless.
    pub async fn stop(&mut self) {
        if let Err(e) = self.hooks.on_stop() {
            tracing::warn!(server = %self.name, error = %e, "shutdown hook failed");
        }

        if !matches!(self.state, ServerState::Started(_)) {
            tracing::debug!(server = %self.name, "stop requested with no live listener");
            return;
        }
        let ServerState::Started(handle) =
            std::mem::replace(&mut self.state, ServerState::Stopped)
        else {
            unreachable!()
        };

        let _ = handle.shutdown.send(true);
        match handle.accept_task.await {
            Ok(()) => {
                tracing::info!(server = %self.name, port = handle.port, "stopped TCP server");
            }
            Err(e) => {
                tracing::info!(
                    server = %self.name,
                    port = handle.port,
                    error = %e,
                    "TCP server shutdown interrupted"
                );
            }
        }
        handle.events.on_event(&ServerEvent::Stopped);
    }

    /// The OS-confirmed bound port.
    ///
    /// Only defined while started; otherwise returns
    /// [`ServerError::NotBound`].
    pub fn bound_port(&self) -> Result<u16, ServerError> {
        match &self.state {
            ServerState::Started(handle) => Ok(handle.port),
            _ => Err(ServerError::NotBound),
        }
    }

    /// The full bound socket address, subject to the same contract as
    /// [`TcpServer::bound_port`].
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        match &self.state {
            ServerState::Started(handle) => Ok(handle.local_addr),
            _ => Err(ServerError::NotBound),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        match self.state {
            ServerState::Created => LifecycleState::Created,
            ServerState::Started(_) => LifecycleState::Started,
            ServerState::Stopped => LifecycleState::Stopped,
        }
    }

    /// The variant name this server was built with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable summary; total in every state.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TcpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ServerState::Started(handle) => {
                write!(f, "{{server={}, port={}}}", self.name, handle.port)
            }
            _ => write!(f, "{{server={}, port=N/A}}", self.name),
        }
    }
}

/// Builder for [`TcpServer`].
///
/// The pipeline configurator, connection handler, metrics listener
/// factory, and config are required; `build` rejects a missing one
/// with a configuration error before any I/O happens.
pub struct TcpServerBuilder {
    name: String,
    config: Option<Arc<ServerConfig>>,
    port: u16,
    pipeline: Option<Arc<dyn PipelineConfigurator>>,
    handler: Option<Arc<dyn ConnectionHandler>>,
    metrics: Option<Arc<dyn MetricsListenerFactory>>,
    hooks: Arc<dyn LifecycleHooks>,
}

impl TcpServerBuilder {
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Requested bind port; 0 (the default) asks the OS for an
    /// ephemeral port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn pipeline(mut self, pipeline: impl PipelineConfigurator + 'static) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    pub fn handler(mut self, handler: impl ConnectionHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn metrics_factory(mut self, factory: impl MetricsListenerFactory + 'static) -> Self {
        self.metrics = Some(Arc::new(factory));
        self
    }

    pub fn hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Validate collaborators and produce a server in the created
    /// state. Performs no I/O.
    pub fn build(self) -> Result<TcpServer, ServerError> {
        let config = self
            .config
            .ok_or(ServerError::Configuration("missing server config"))?;
        let pipeline = self
            .pipeline
            .ok_or(ServerError::Configuration("missing pipeline configurator"))?;
        let handler = self
            .handler
            .ok_or(ServerError::Configuration("missing connection handler"))?;
        let metrics = self.metrics.ok_or(ServerError::Configuration(
            "missing metrics listener factory",
        ))?;
        let bind_host = config
            .transport
            .bind_host
            .parse::<IpAddr>()
            .map_err(|_| ServerError::Configuration("transport.bind_host is not an IP address"))?;

        Ok(TcpServer {
            name: self.name,
            config,
            requested_port: self.port,
            bind_host,
            pipeline,
            handler,
            metrics,
            hooks: self.hooks,
            state: ServerState::Created,
        })
    }
}

/// Accept connections until the shutdown signal, then drop the listener
/// and wait for in-flight handlers to finish.
async fn accept_loop(
    listener: Listener,
    pipeline: Arc<dyn PipelineConfigurator>,
    handler: Arc<dyn ConnectionHandler>,
    events: Arc<dyn MetricsListener>,
    mut shutdown: watch::Receiver<bool>,
) {
    let tracker = ConnectionTracker::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    events.on_event(&ServerEvent::ConnectionOpened { peer });
                    let guard = tracker.track();
                    let conn = FramedConnection::new(stream, pipeline.configure(), peer);
                    let handler = Arc::clone(&handler);
                    let events = Arc::clone(&events);
                    tokio::spawn(async move {
                        let opened = Instant::now();
                        if let Err(e) = handler.handle(conn).await {
                            tracing::debug!(peer = %peer, error = %e, "connection handler error");
                        }
                        events.on_event(&ServerEvent::ConnectionClosed {
                            peer,
                            duration: opened.elapsed(),
                        });
                        drop(guard);
                        drop(permit);
                    });
                }
                Err(e) => {
                    events.on_event(&ServerEvent::AcceptFailed);
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }

    // Release the port before draining so new connections are refused
    // while in-flight work finishes.
    drop(listener);
    tracker.drained().await;
}
