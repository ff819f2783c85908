//! `tokio_util` codec adapter for `FramedRead` / `FramedWrite`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{Frame, FrameConfig, FrameKind, Value, HEADER_SIZE};
use crate::demux::extract_frame;
use crate::error::{FrameError, Result};

/// Frame codec for async streams.
///
/// Decoding runs the same extraction step as [`crate::Demultiplexer`] over
/// the framed read buffer, splitting payloads off without copying.
#[derive(Debug, Clone, Default)]
pub struct DemuxCodec {
    config: FrameConfig,
}

impl DemuxCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn enforce_backlog_limit(&self, src: &mut BytesMut) -> Result<()> {
        match self.config.max_backlog {
            Some(max) if src.len() > max => {
                let size = src.len();
                warn!(size, max, "backlog limit exceeded, discarding buffered bytes");
                src.clear();
                Err(FrameError::BacklogOverflow { size, max })
            }
            _ => Ok(()),
        }
    }

    fn check_payload_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.max_payload_size,
            });
        }
        Ok(())
    }
}

impl Decoder for DemuxCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let (kind, payload_len, wire_size) = match extract_frame(src) {
            Some((view, wire_size)) => (view.kind(), view.payload().len(), wire_size),
            None => {
                self.enforce_backlog_limit(src)?;
                return Ok(None);
            }
        };

        let mut raw = src.split_to(wire_size);
        let frame = match kind {
            FrameKind::Binary => {
                raw.advance(HEADER_SIZE);
                Frame::Binary(raw.freeze())
            }
            FrameKind::Text => {
                raw.truncate(payload_len);
                Frame::Text(raw.freeze())
            }
        };
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed { pending: buf.len() }),
        }
    }
}

impl Encoder<Frame> for DemuxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        if let Frame::Binary(payload) = &item {
            self.check_payload_size(payload.len())?;
        }
        item.encode(dst)
    }
}

impl Encoder<Value> for DemuxCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<()> {
        if let Value::Binary(payload) = &item {
            self.check_payload_size(payload.len())?;
        }
        item.encode(dst)
    }
}
