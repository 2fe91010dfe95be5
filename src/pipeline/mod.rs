//! Wire pipeline capability traits and the framed connection transport.
//!
//! The server core never interprets wire bytes itself. A caller-supplied
//! [`PipelineConfigurator`] describes how raw bytes become application
//! frames (and back) by producing one [`WireCodec`] per accepted
//! connection; the core wraps stream and codec into a
//! [`FramedConnection`] and hands that to the connection handler.

pub mod framed;

use std::io;

pub use framed::FramedConnection;

/// Incremental frame codec over raw stream bytes.
///
/// `decode` is called with all bytes received so far that no previous
/// call consumed; it removes a complete frame from the front of `src`
/// and returns it, or returns `None` to ask for more bytes.
pub trait WireCodec: Send {
    /// Extract the next complete frame from `src`, if any.
    fn decode(&mut self, src: &mut Vec<u8>) -> io::Result<Option<Vec<u8>>>;

    /// Append the wire encoding of `item` to `dst`.
    fn encode(&mut self, item: &[u8], dst: &mut Vec<u8>) -> io::Result<()>;
}

/// Strategy describing how raw bytes become application frames.
///
/// One codec instance is produced per accepted connection, so codecs
/// may keep per-connection decode state.
pub trait PipelineConfigurator: Send + Sync {
    fn configure(&self) -> Box<dyn WireCodec>;
}

/// Codec that passes raw bytes through without framing.
///
/// Decoding yields all bytes available in the buffer. Encoding copies
/// the input bytes directly into the output buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl RawCodec {
    pub fn new() -> Self {
        Self
    }
}

impl WireCodec for RawCodec {
    fn decode(&mut self, src: &mut Vec<u8>) -> io::Result<Option<Vec<u8>>> {
        if src.is_empty() {
            Ok(None)
        } else {
            Ok(Some(std::mem::take(src)))
        }
    }

    fn encode(&mut self, item: &[u8], dst: &mut Vec<u8>) -> io::Result<()> {
        dst.extend_from_slice(item);
        Ok(())
    }
}

/// Pipeline configurator for the pass-through codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPipeline;

impl PipelineConfigurator for RawPipeline {
    fn configure(&self) -> Box<dyn WireCodec> {
        Box::new(RawCodec::new())
    }
}
