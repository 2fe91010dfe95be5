//! Framed connection transport.
//!
//! Bridges a raw `TcpStream` with the codec produced by the pipeline
//! configurator: bytes are accumulated into a read buffer and decoded
//! incrementally; outgoing frames are encoded and written whole.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::net::ConnectionId;
use crate::pipeline::WireCodec;

/// A framed, message-oriented view of one accepted connection.
///
/// Handed to the connection handler, which owns it for the connection's
/// lifetime. Dropping it closes the socket.
pub struct FramedConnection {
    stream: TcpStream,
    codec: Box<dyn WireCodec>,
    peer: SocketAddr,
    id: ConnectionId,
    read_buf: Vec<u8>,
}

impl FramedConnection {
    pub(crate) fn new(stream: TcpStream, codec: Box<dyn WireCodec>, peer: SocketAddr) -> Self {
        Self {
            stream,
            codec,
            peer,
            id: ConnectionId::new(),
            read_buf: Vec::with_capacity(4096),
        }
    }

    /// Peer address of this connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Unique ID of this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Receive the next decoded frame.
    ///
    /// Returns `Ok(None)` on clean EOF. An EOF that leaves undecodable
    /// bytes in the buffer is reported as `UnexpectedEof`.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.read_buf)? {
                return Ok(Some(frame));
            }

            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                if self.read_buf.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-frame",
                ));
            }
        }
    }

    /// Encode and send one frame.
    pub async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut out = Vec::with_capacity(frame.len());
        self.codec.encode(frame, &mut out)?;
        self.stream.write_all(&out).await?;
        self.stream.flush().await
    }

    /// Shut down the write half, signalling EOF to the peer.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
