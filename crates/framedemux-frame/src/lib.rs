//! Streaming demultiplexer for an unframed byte transport.
//!
//! Two kinds of message share one stream:
//! - Binary frames: a `0x24` marker byte, a 4-byte big-endian payload length,
//!   then the payload
//! - Text frames: the payload followed by `CR LF CR LF`
//!
//! Feed chunks to a [`Demultiplexer`] as they arrive, however the transport
//! split them; each complete frame reaches the [`FrameSink`] exactly once,
//! in order.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod demux;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::DemuxCodec;
pub use codec::{
    encode_binary, encode_fixed, encode_text, encode_values, encoded_len, pack, FixedLayout,
    Frame, FrameConfig, FrameKind, FrameView, Value, DELIMITER, HEADER_SIZE, MARKER,
};
pub use demux::{extract_frame, DemuxStats, Demultiplexer, FrameSink, Handlers};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
