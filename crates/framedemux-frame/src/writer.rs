use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{
    encode_binary, encode_fixed, encode_text, FixedLayout, Frame, FrameConfig, Value,
};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        match frame {
            Frame::Binary(payload) => self.send_binary(payload),
            Frame::Text(payload) => {
                self.buf.clear();
                encode_text(payload, &mut self.buf)?;
                self.write_buffered()
            }
        }
    }

    /// Encode and send an opaque binary payload.
    pub fn send_binary(&mut self, payload: &[u8]) -> Result<()> {
        self.check_payload_size(payload.len())?;

        self.buf.clear();
        encode_binary(payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and send a text frame.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.buf.clear();
        encode_text(text.as_bytes(), &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and send a fixed-layout value as a binary frame.
    pub fn send_value<V: FixedLayout>(&mut self, value: V) -> Result<()> {
        self.check_payload_size(V::SIZE)?;

        self.buf.clear();
        encode_fixed(value, &mut self.buf);
        self.write_buffered()
    }

    /// Encode and send a sequence of values, flushing once at the end.
    pub fn send_values(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            if let Value::Binary(payload) = value {
                self.check_payload_size(payload.len())?;
            }
        }

        self.buf.clear();
        crate::codec::encode_values(values, &mut self.buf)?;
        self.write_buffered()
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

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => {
                    return Err(FrameError::ConnectionClosed {
                        pending: self.buf.len() - offset,
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum binary payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
