//! Reassemble binary and text frames from arbitrarily chunked byte streams.
//!
//! framedemux turns a transport that gives no message boundaries back into a
//! sequence of length-prefixed binary frames and delimiter-terminated text
//! frames, no matter how the bytes were split on the way.
//!
//! # Crate Structure
//!
//! - [`frame`]: Wire codec, streaming demultiplexer, blocking reader/writer
//!   and the async codec (behind `async` feature)
//! - [`hexdump`]: Fixed-width hex dump used to inspect raw streams

/// Re-export frame types.
pub mod frame {
    pub use framedemux_frame::*;
}

pub mod hexdump;
