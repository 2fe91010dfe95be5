//! Integration tests for the server lifecycle manager.

use std::io;
use std::sync::atomic::Ordering;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tcp_host::server::HookError;
use tcp_host::{
    ConnectionHandler, FramedConnection, LifecycleHooks, LifecycleState, ServerError, TcpServer,
};

mod common;

use common::{echo_server, loopback_config, CountingHooks, EchoHandler, EventLog, LoggingFactory};

#[tokio::test]
async fn ephemeral_port_round_trip() {
    let events = EventLog::default();
    let mut server = echo_server(0, &events).build().unwrap();

    server.start().await.unwrap();

    let port = server.bound_port().unwrap();
    assert_ne!(port, 0);
    assert_eq!(server.state(), LifecycleState::Started);
    assert!(server.describe().contains(&format!("port={}", port)));

    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn fixed_port_is_reported_verbatim() {
    let events = EventLog::default();
    let mut server = echo_server(28901, &events).build().unwrap();

    server.start().await.unwrap();

    assert_eq!(server.bound_port().unwrap(), 28901);
    assert_eq!(server.describe(), "{server=echo, port=28901}");

    server.stop().await;
}

#[tokio::test]
async fn occupied_port_fails_with_bind_error() {
    // Hold the port with a plain listener first.
    let occupant = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupant.local_addr().unwrap().port();

    let events = EventLog::default();
    let mut server = echo_server(port, &events).build().unwrap();

    let err = server.start().await.unwrap_err();
    match err {
        ServerError::Bind { port: reported, .. } => assert_eq!(reported, port),
        other => panic!("expected bind error, got {other:?}"),
    }

    // No partial started state is observable.
    assert_eq!(server.state(), LifecycleState::Created);
    assert_eq!(server.describe(), "{server=echo, port=N/A}");
    assert!(matches!(server.bound_port(), Err(ServerError::NotBound)));
    assert!(events.snapshot().is_empty());

    // Stopping the never-started instance is still safe.
    server.stop().await;
}

#[tokio::test]
async fn stop_before_start_is_a_noop() {
    let events = EventLog::default();
    let hooks = CountingHooks::default();
    let mut server = echo_server(0, &events)
        .hooks(hooks.clone())
        .build()
        .unwrap();

    server.stop().await;

    // Shutdown hook ran, but the transport shutdown path did not.
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 1);
    assert!(events.snapshot().is_empty());
    assert_eq!(server.state(), LifecycleState::Created);
}

#[tokio::test]
async fn double_stop_is_idempotent() {
    let events = EventLog::default();
    let hooks = CountingHooks::default();
    let mut server = echo_server(0, &events)
        .hooks(hooks.clone())
        .build()
        .unwrap();

    server.start().await.unwrap();
    server.stop().await;
    server.stop().await;

    assert_eq!(server.state(), LifecycleState::Stopped);
    assert!(matches!(server.bound_port(), Err(ServerError::NotBound)));
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 2);

    let stopped = events.kinds().iter().filter(|k| **k == "stopped").count();
    assert_eq!(stopped, 1);
}

#[tokio::test]
async fn port_is_released_after_stop() {
    let events = EventLog::default();
    let mut server = echo_server(0, &events).build().unwrap();

    server.start().await.unwrap();
    let port = server.bound_port().unwrap();
    server.stop().await;

    let refused = TcpStream::connect(("127.0.0.1", port)).await;
    assert!(refused.is_err());
}

#[tokio::test]
async fn hooks_run_once_per_transition_with_listener_live() {
    let hooks = CountingHooks {
        probe_port: Some(28902),
        ..CountingHooks::default()
    };
    let events = EventLog::default();
    let mut server = echo_server(28902, &events)
        .hooks(hooks.clone())
        .build()
        .unwrap();

    server.start().await.unwrap();
    assert_eq!(hooks.starts.load(Ordering::SeqCst), 1);
    // The socket was already accepting when on_start ran.
    assert_eq!(hooks.start_saw_listener.load(Ordering::SeqCst), 1);

    server.stop().await;
    assert_eq!(hooks.stops.load(Ordering::SeqCst), 1);
    // on_stop ran before the listener was released.
    assert_eq!(hooks.stop_saw_listener.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn metrics_listener_observes_event_sequence() {
    let events = EventLog::default();
    let mut server = echo_server(0, &events).build().unwrap();

    server.start().await.unwrap();
    let port = server.bound_port().unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    // Reading the echo guarantees the connection was accepted and
    // handled before we ask for shutdown.
    client.read_exact(&mut buf).await.unwrap();
    drop(client);

    // Stop drains the in-flight connection, so the close event must
    // precede the stop event.
    server.stop().await;

    assert_eq!(
        events.kinds(),
        vec!["started", "connection_opened", "connection_closed", "stopped"]
    );
}

struct FailingStartHooks;

impl LifecycleHooks for FailingStartHooks {
    fn on_start(&self) -> Result<(), HookError> {
        Err("dependent resource unavailable".into())
    }
}

#[tokio::test]
async fn startup_hook_failure_propagates() {
    let events = EventLog::default();
    let mut server = echo_server(0, &events)
        .hooks(FailingStartHooks)
        .build()
        .unwrap();

    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ServerError::StartupHook(_)));

    // The bind already succeeded; the caller decides what to do with
    // the running listener. Stopping still works cleanly.
    assert_eq!(server.state(), LifecycleState::Started);
    server.stop().await;
    assert_eq!(server.state(), LifecycleState::Stopped);
}

/// Handler that waits for the peer to close before finishing, used to
/// hold a connection in flight across a stop request.
struct SlowCloseHandler;

impl ConnectionHandler for SlowCloseHandler {
    fn handle(&self, mut conn: FramedConnection) -> BoxFuture<'static, io::Result<()>> {
        async move {
            while conn.recv().await?.is_some() {}
            Ok(())
        }
        .boxed()
    }
}

#[tokio::test]
async fn stop_waits_for_in_flight_connection() {
    let events = EventLog::default();
    let mut server = TcpServer::builder("echo")
        .config(loopback_config())
        .pipeline(tcp_host::RawPipeline)
        .handler(SlowCloseHandler)
        .metrics_factory(LoggingFactory(events.clone()))
        .build()
        .unwrap();

    server.start().await.unwrap();
    let port = server.bound_port().unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.write_all(b"hold").await.unwrap();

    // Give the accept loop a chance to hand the connection off, then
    // release the client while stop is draining.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let stopper = tokio::spawn(async move {
        server.stop().await;
        server
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    drop(client);

    let server = stopper.await.unwrap();
    assert_eq!(server.state(), LifecycleState::Stopped);

    let kinds = events.kinds();
    assert_eq!(kinds.last(), Some(&"stopped"));
    assert!(kinds.contains(&"connection_closed"));
}

#[tokio::test]
async fn builder_requires_every_collaborator() {
    let err = TcpServer::builder("echo")
        .config(loopback_config())
        .pipeline(tcp_host::RawPipeline)
        .handler(EchoHandler)
        .build()
        .unwrap_err();
    assert!(matches!(err, ServerError::Configuration(_)));
}
