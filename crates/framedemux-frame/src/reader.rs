use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::codec::{Frame, FrameConfig};
use crate::demux::Demultiplexer;
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally, so callers always get complete frames.
/// A single read can complete several frames; they are queued and returned
/// one per call.
pub struct FrameReader<T> {
    inner: T,
    demux: Demultiplexer<VecDeque<Frame>>,
    chunk: Vec<u8>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        let chunk = vec![0u8; config.read_chunk_size.max(1)];
        Self {
            inner,
            demux: Demultiplexer::with_config(VecDeque::new(), config),
            chunk,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached; its
    /// `pending` count is non-zero if the stream stopped mid-frame.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.demux.sink_mut().pop_front() {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed {
                    pending: self.demux.backlog_len(),
                });
            }

            self.demux.ingest(&self.chunk[..read])?;
        }
    }

    /// Bytes of an incomplete frame currently buffered.
    pub fn pending_bytes(&self) -> usize {
        self.demux.backlog_len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the backlog limit for subsequent reads.
    pub fn set_max_backlog(&mut self, max_backlog: Option<usize>) {
        self.demux.set_max_backlog(max_backlog);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.demux.config()
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames until a clean EOF; a stream cut mid-frame ends with an error.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed { pending: 0 }) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_binary, encode_text, pack, FixedLayout, MARKER};
    use crate::values;

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_binary(b"hello", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame, Frame::binary(&b"hello"[..]));
    }

    #[test]
    fn read_multiple_frames() {
        let wire = pack(&values!["one", 2u16, "three"]).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!(f1, Frame::text(&b"one"[..]));
        assert_eq!(u16::from_le_slice(f2.payload()), Some(2));
        assert_eq!(f3, Frame::text(&b"three"[..]));
    }

    #[test]
    fn read_frame_with_large_payload() {
        let payload = vec![0xAB; 64 * 1024];
        let mut wire = BytesMut::new();
        encode_binary(&payload, &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.payload().as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let wire = pack(&values!["slow", 123_456_789i64]).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        assert_eq!(reader.read_frame().unwrap(), Frame::text(&b"slow"[..]));
        let frame = reader.read_frame().unwrap();
        assert_eq!(i64::from_le_slice(frame.payload()), Some(123_456_789));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed { pending: 0 }));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let partial = vec![MARKER, 0, 0, 0, 16, b'o', b'n', b'l', b'y'];

        let mut reader = FrameReader::new(Cursor::new(partial));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed { pending: 9 }));
    }

    #[test]
    fn iterator_stops_at_clean_eof() {
        let wire = pack(&values!["a", "b", 1u8]).unwrap();
        let reader = FrameReader::new(Cursor::new(wire.to_vec()));

        let frames: Vec<Frame> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn iterator_reports_truncated_tail() {
        let mut wire = BytesMut::new();
        encode_text(b"complete", &mut wire).unwrap();
        wire.extend_from_slice(b"dangling");

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        assert!(matches!(reader.next(), Some(Ok(Frame::Text(_)))));
        assert!(matches!(
            reader.next(),
            Some(Err(FrameError::ConnectionClosed { pending: 8 }))
        ));
    }

    #[test]
    fn backlog_limit_in_stream() {
        let cfg = FrameConfig {
            max_backlog: Some(16),
            read_chunk_size: 8,
            ..FrameConfig::default()
        };
        let garbage = vec![b'x'; 64];
        let mut reader = FrameReader::with_config(Cursor::new(garbage), cfg);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::BacklogOverflow { max: 16, .. }));
    }

    #[test]
    fn small_read_chunks_queue_frames() {
        let wire = pack(&values!["x", "y", "z"]).unwrap();
        let cfg = FrameConfig {
            read_chunk_size: 3,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);

        for expected in [b"x", b"y", b"z"] {
            assert_eq!(reader.read_frame().unwrap(), Frame::text(expected.to_vec()));
        }
        assert_eq!(reader.pending_bytes(), 0);
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_text("ping").unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame, Frame::text(&b"ping"[..]));
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let reader = FrameReader::new(right);
        let reader = Arc::new(Mutex::new(reader));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u32 {
                    let frame = reader.lock().unwrap().read_frame().unwrap();
                    if expected % 2 == 0 {
                        assert_eq!(u32::from_le_slice(frame.payload()), Some(expected));
                    } else {
                        assert_eq!(frame.payload().as_ref(), format!("msg-{expected}").as_bytes());
                    }
                }
            })
        };

        for i in 0..64u32 {
            if i % 2 == 0 {
                writer.send_value(i).unwrap();
            } else {
                writer.send_text(&format!("msg-{i}")).unwrap();
            }
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert!(reader.config().max_backlog.is_none());
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let wire = pack(&values!["ok"]).unwrap();

        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = pack(&values!["ok"]).unwrap();

        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire.to_vec()),
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame, Frame::text(&b"ok"[..]));
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
