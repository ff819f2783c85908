//! Reassembly of frames from an arbitrarily chunked byte stream.
//!
//! The transport hands over bytes in whatever pieces it likes. Each call to
//! [`Demultiplexer::ingest`] drains every complete frame from the unconsumed
//! bytes and carries only the undigested suffix over to the next call.

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{find_delimiter, Frame, FrameConfig, FrameView, DELIMITER, HEADER_SIZE, MARKER};
use crate::error::{FrameError, Result};

/// Receives every frame the demultiplexer reassembles, in stream order.
///
/// Payload slices borrow the demultiplexer's buffers and are only valid for
/// the duration of the call. Copy them to keep them.
pub trait FrameSink {
    fn on_binary_frame(&mut self, payload: &[u8]);

    fn on_text_frame(&mut self, payload: &[u8]);
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn on_binary_frame(&mut self, payload: &[u8]) {
        (**self).on_binary_frame(payload);
    }

    fn on_text_frame(&mut self, payload: &[u8]) {
        (**self).on_text_frame(payload);
    }
}

/// Collects owned copies of every frame.
impl FrameSink for Vec<Frame> {
    fn on_binary_frame(&mut self, payload: &[u8]) {
        self.push(FrameView::Binary(payload).to_owned_frame());
    }

    fn on_text_frame(&mut self, payload: &[u8]) {
        self.push(FrameView::Text(payload).to_owned_frame());
    }
}

impl FrameSink for VecDeque<Frame> {
    fn on_binary_frame(&mut self, payload: &[u8]) {
        self.push_back(FrameView::Binary(payload).to_owned_frame());
    }

    fn on_text_frame(&mut self, payload: &[u8]) {
        self.push_back(FrameView::Text(payload).to_owned_frame());
    }
}

/// A sink made of one closure per frame kind.
pub struct Handlers<B, T> {
    on_binary: B,
    on_text: T,
}

impl<B, T> Handlers<B, T>
where
    B: FnMut(&[u8]),
    T: FnMut(&[u8]),
{
    pub fn new(on_binary: B, on_text: T) -> Self {
        Self { on_binary, on_text }
    }
}

impl<B, T> FrameSink for Handlers<B, T>
where
    B: FnMut(&[u8]),
    T: FnMut(&[u8]),
{
    fn on_binary_frame(&mut self, payload: &[u8]) {
        (self.on_binary)(payload);
    }

    fn on_text_frame(&mut self, payload: &[u8]) {
        (self.on_text)(payload);
    }
}

/// Extract one frame from the front of `buf`.
///
/// Returns the frame and the number of bytes it occupies on the wire, or
/// `None` when `buf` does not start with a complete frame yet.
pub fn extract_frame(buf: &[u8]) -> Option<(FrameView<'_>, usize)> {
    if *buf.first()? == MARKER {
        // Header alone is never enough, even when it announces an empty payload.
        if buf.len() <= HEADER_SIZE {
            return None;
        }
        let len = u32::from_be_bytes(buf[1..HEADER_SIZE].try_into().ok()?) as usize;
        let payload = buf[HEADER_SIZE..].get(..len)?;
        return Some((FrameView::Binary(payload), HEADER_SIZE + len));
    }

    let end = find_delimiter(buf)?;
    Some((FrameView::Text(&buf[..end]), end + DELIMITER.len()))
}

/// Hand every complete frame at the front of `working` to `sink`.
///
/// Returns `(bytes consumed, frames emitted)`.
fn drain<S: FrameSink + ?Sized>(working: &[u8], sink: &mut S) -> (usize, u64) {
    let mut cursor = 0usize;
    let mut frames = 0u64;

    while let Some((frame, wire_size)) = extract_frame(&working[cursor..]) {
        trace!(
            kind = frame.kind().as_str(),
            payload_len = frame.payload().len(),
            offset = cursor,
            "frame reassembled"
        );
        match frame {
            FrameView::Binary(payload) => sink.on_binary_frame(payload),
            FrameView::Text(payload) => sink.on_text_frame(payload),
        }
        cursor += wire_size;
        frames += 1;
    }

    (cursor, frames)
}

/// Running totals kept by a [`Demultiplexer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Bytes passed to `ingest`.
    pub bytes_received: u64,
    /// Bytes attributed to emitted frames (framing included).
    pub bytes_consumed: u64,
    /// Bytes dropped because the backlog limit was exceeded.
    pub bytes_discarded: u64,
    pub frames_emitted: u64,
}

/// Stateful frame demultiplexer.
///
/// Feed chunks in delivery order with [`ingest`](Self::ingest); every frame
/// completed by a chunk is handed to the sink before the call returns.
/// Not reentrant: the sink must not feed the same demultiplexer.
pub struct Demultiplexer<S> {
    sink: S,
    backlog: BytesMut,
    config: FrameConfig,
    stats: DemuxStats,
}

impl<S: FrameSink> Demultiplexer<S> {
    /// Create a demultiplexer with default configuration (unbounded backlog).
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, FrameConfig::default())
    }

    /// Create a demultiplexer with explicit configuration.
    pub fn with_config(sink: S, config: FrameConfig) -> Self {
        Self {
            sink,
            backlog: BytesMut::new(),
            config,
            stats: DemuxStats::default(),
        }
    }

    /// Push the next chunk of the stream.
    ///
    /// Empty chunks are a no-op. Incomplete trailing bytes are kept and
    /// retried on the next call. Without a configured `max_backlog` this
    /// never fails; with one, exceeding it discards the backlog and returns
    /// [`FrameError::BacklogOverflow`] after the frames of this chunk have
    /// been delivered.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.stats.bytes_received += chunk.len() as u64;

        let (consumed, frames) = if self.backlog.is_empty() {
            let (consumed, frames) = drain(chunk, &mut self.sink);
            let rest = &chunk[consumed..];
            if !rest.is_empty() {
                debug!(carried = rest.len(), "buffering incomplete frame");
                self.backlog.extend_from_slice(rest);
            }
            (consumed, frames)
        } else {
            self.backlog.extend_from_slice(chunk);
            let (consumed, frames) = drain(&self.backlog, &mut self.sink);
            if consumed > 0 {
                self.backlog.advance(consumed);
            }
            if !self.backlog.is_empty() {
                debug!(carried = self.backlog.len(), "buffering incomplete frame");
            }
            (consumed, frames)
        };

        self.stats.bytes_consumed += consumed as u64;
        self.stats.frames_emitted += frames;
        self.enforce_backlog_limit()
    }

    fn enforce_backlog_limit(&mut self) -> Result<()> {
        let Some(max) = self.config.max_backlog else {
            return Ok(());
        };
        let size = self.backlog.len();
        if size <= max {
            return Ok(());
        }

        warn!(size, max, "backlog limit exceeded, discarding buffered bytes");
        self.stats.bytes_discarded += size as u64;
        self.backlog.clear();
        Err(FrameError::BacklogOverflow { size, max })
    }
}

impl<S> Demultiplexer<S> {
    /// Bytes received but not yet attributed to a frame.
    pub fn backlog(&self) -> &[u8] {
        &self.backlog
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn has_backlog(&self) -> bool {
        !self.backlog.is_empty()
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the demultiplexer and return the sink. Any backlog is dropped.
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Update the backlog limit for subsequent calls.
    pub fn set_max_backlog(&mut self, max_backlog: Option<usize>) {
        self.config.max_backlog = max_backlog;
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
