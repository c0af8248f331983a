//! Per-peer session driving.
//!
//! A session owns the inbound side of one connection: a [`FrameMerger`]
//! and an [`EthProtocolHandler`]. Frames are processed one at a time in
//! arrival order. Reassembly state never outlives the session: whatever
//! ends [`Session::run`], open contexts are dropped before it returns.
//!
//! ```text
//! reader ── FrameCodec ── FrameMerger ── EthProtocolHandler ── PeerSession
//!                                                                  │
//! writer ── FrameCodec ── FrameSplitter ─────── spawn_writer ◄─────┘
//! ```

mod channel;

use std::time::Instant;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::config::EthConfig;
use crate::error::{P2pError, P2pResult};
use crate::eth::EthProtocolHandler;
use crate::rlpx::{FrameCodec, FrameMerger, FrameSplitter, Packet};

pub use channel::{ChannelSession, PeerSession};

/// Inbound side of one peer connection.
pub struct Session<S: PeerSession> {
    merger: FrameMerger,
    handler: EthProtocolHandler<S>,
    max_frame_size: usize,
}

impl<S: PeerSession> Session<S> {
    /// Create a session around a handler.
    pub fn new(handler: EthProtocolHandler<S>, config: &EthConfig) -> Self {
        Self {
            merger: FrameMerger::new(config.max_packet_size, config.max_open_contexts),
            handler,
            max_frame_size: config.max_inbound_frame_size(),
        }
    }

    /// Process one whole frame.
    pub fn on_frame(&mut self, frame: &[u8]) -> P2pResult<()> {
        let Some(packet) = self.merger.merge(frame)? else {
            return Ok(());
        };

        if packet.protocol_type != self.handler.protocol_type() {
            return Err(P2pError::ProtocolViolation(format!(
                "packet for capability {} on a session serving {}",
                packet.protocol_type,
                self.handler.protocol_type()
            )));
        }
        self.handler.handle_incoming(packet)
    }

    /// Read frames until the stream ends or the first error.
    ///
    /// Every error ends the session; pool rejections never reach here
    /// because the handler logs them itself.
    pub async fn run<R>(&mut self, reader: R) -> P2pResult<()>
    where
        R: AsyncRead + Unpin,
    {
        let started = Instant::now();
        let mut frames = FramedRead::new(reader, FrameCodec::new(self.max_frame_size));

        let result = loop {
            let frame = match frames.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            };

            if let Err(e) = self.on_frame(&frame) {
                break Err(e);
            }
        };

        if let Err(e) = &result {
            tracing::debug!(peer = %self.handler.peer_id(), error = %e, "Session failed");
        }
        self.teardown(started);
        result
    }

    /// Protocol handler.
    pub fn handler(&self) -> &EthProtocolHandler<S> {
        &self.handler
    }

    /// Mutable protocol handler, for sending.
    pub fn handler_mut(&mut self) -> &mut EthProtocolHandler<S> {
        &mut self.handler
    }

    /// Chunked packets currently being reassembled.
    pub fn open_contexts(&self) -> usize {
        self.merger.open_contexts()
    }

    fn teardown(&mut self, started: Instant) {
        let dropped = self.merger.clear();
        tracing::debug!(
            peer = %self.handler.peer_id(),
            dropped_contexts = dropped,
            messages = self.handler.counter(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Session closed"
        );
    }
}

/// Spawn a task writing queued packets to `writer` as frames.
///
/// The task ends when every sender of `rx` is dropped, shutting the writer
/// down, or on the first write error.
pub fn spawn_writer<W>(
    writer: W,
    mut rx: mpsc::UnboundedReceiver<Packet>,
    mut splitter: FrameSplitter,
) -> JoinHandle<P2pResult<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sink = FramedWrite::new(writer, FrameCodec::new(splitter.max_frame_size()));

        while let Some(packet) = rx.recv().await {
            for frame in splitter.split(&packet)? {
                sink.feed(frame).await?;
            }
            sink.flush().await?;
        }

        sink.close().await?;
        Ok::<(), P2pError>(())
    })
}
