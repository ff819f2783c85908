use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// First byte of every binary frame ('$').
pub const MARKER: u8 = 0x24;

/// Terminator of every text frame: CR LF CR LF.
pub const DELIMITER: [u8; 4] = [0x0D, 0x0A, 0x0D, 0x0A];

/// Size of the big-endian length field that follows the marker.
pub const LENGTH_SIZE: usize = 4;

/// Binary frame header: marker (1) + length (4) = 5 bytes.
pub const HEADER_SIZE: usize = 1 + LENGTH_SIZE;

/// Largest payload the length field can announce.
pub const MAX_BINARY_PAYLOAD: usize = u32::MAX as usize;

/// The two kinds of frame carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Binary,
    Text,
}

impl FrameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Binary => "binary",
            FrameKind::Text => "text",
        }
    }
}

/// A reassembled frame that owns its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Length-prefixed opaque payload.
    Binary(Bytes),
    /// Payload that was terminated by [`DELIMITER`] (delimiter excluded).
    Text(Bytes),
}

impl Frame {
    /// Create a binary frame.
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Frame::Binary(payload.into())
    }

    /// Create a text frame.
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Frame::Text(payload.into())
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Binary(_) => FrameKind::Binary,
            Frame::Text(_) => FrameKind::Text,
        }
    }

    pub fn payload(&self) -> &Bytes {
        match self {
            Frame::Binary(payload) | Frame::Text(payload) => payload,
        }
    }

    pub fn into_payload(self) -> Bytes {
        match self {
            Frame::Binary(payload) | Frame::Text(payload) => payload,
        }
    }

    /// The total wire size of this frame (framing + payload).
    pub fn wire_size(&self) -> usize {
        match self {
            Frame::Binary(payload) => HEADER_SIZE + payload.len(),
            Frame::Text(payload) => payload.len() + DELIMITER.len(),
        }
    }

    /// Append the wire encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Frame::Binary(payload) => encode_binary(payload, dst),
            Frame::Text(payload) => encode_text(payload, dst),
        }
    }
}

/// A frame borrowed from the demultiplexer's working buffer.
///
/// Only valid for the duration of the sink callback; use
/// [`FrameView::to_owned_frame`] to keep it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameView<'a> {
    Binary(&'a [u8]),
    Text(&'a [u8]),
}

impl<'a> FrameView<'a> {
    pub fn kind(&self) -> FrameKind {
        match self {
            FrameView::Binary(_) => FrameKind::Binary,
            FrameView::Text(_) => FrameKind::Text,
        }
    }

    pub fn payload(&self) -> &'a [u8] {
        match *self {
            FrameView::Binary(payload) | FrameView::Text(payload) => payload,
        }
    }

    pub fn to_owned_frame(&self) -> Frame {
        match *self {
            FrameView::Binary(payload) => Frame::Binary(Bytes::copy_from_slice(payload)),
            FrameView::Text(payload) => Frame::Text(Bytes::copy_from_slice(payload)),
        }
    }
}

/// Encode a binary frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────────┬─────────────────┐
/// │ Marker (1B)│ Length       │ Payload         │
/// │ 0x24 '$'   │ (4B BE)      │ (Length bytes)  │
/// └────────────┴──────────────┴─────────────────┘
/// ```
///
/// The payload must not be empty: a bare header is never enough for the
/// demultiplexer to emit a frame.
pub fn encode_binary(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_BINARY_PAYLOAD,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(MARKER);
    dst.put_u32(len);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a text frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────────────┐
/// │ Payload (N bytes)│ 0x0D 0x0A 0x0D 0x0A  │
/// └──────────────────┴──────────────────────┘
/// ```
pub fn encode_text(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    validate_text(payload)?;
    dst.reserve(payload.len() + DELIMITER.len());
    dst.put_slice(payload);
    dst.put_slice(&DELIMITER);
    Ok(())
}

/// Encode a fixed-layout value as a binary frame.
pub fn encode_fixed<T: FixedLayout>(value: T, dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + T::SIZE);
    dst.put_u8(MARKER);
    dst.put_u32(T::SIZE as u32);
    value.put_le(dst);
}

/// Check that a text payload decodes back to itself once framed.
pub fn validate_text(payload: &[u8]) -> Result<()> {
    if payload.first() == Some(&MARKER) {
        return Err(FrameError::InvalidText {
            reason: "starts with the binary marker byte",
        });
    }
    if find_delimiter(payload).is_some() {
        return Err(FrameError::InvalidText {
            reason: "contains the frame delimiter",
        });
    }

    // A trailing CR LF pairs up with the first half of the delimiter.
    let tail = &payload[payload.len().saturating_sub(DELIMITER.len() - 1)..];
    let mut joined = Vec::with_capacity(tail.len() + DELIMITER.len());
    joined.extend_from_slice(tail);
    joined.extend_from_slice(&DELIMITER);
    if find_delimiter(&joined) != Some(tail.len()) {
        return Err(FrameError::InvalidText {
            reason: "ends with a partial frame delimiter",
        });
    }
    Ok(())
}

/// Position of the first [`DELIMITER`] in `haystack`.
pub fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

/// Values with a fixed-size byte representation, encodable as binary frames.
///
/// Types without a fixed layout (heap-backed, trait objects) cannot
/// implement this, so encoding them as binary does not compile.
pub trait FixedLayout: Copy {
    /// Encoded payload size in bytes.
    const SIZE: usize;

    /// Append the little-endian representation to `dst`.
    fn put_le(self, dst: &mut BytesMut);

    /// Decode a payload produced by [`FixedLayout::put_le`].
    fn from_le_slice(src: &[u8]) -> Option<Self>;
}

macro_rules! fixed_layout_numeric {
    ($($ty:ty),* $(,)?) => {$(
        impl FixedLayout for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn put_le(self, dst: &mut BytesMut) {
                dst.put_slice(&self.to_le_bytes());
            }

            fn from_le_slice(src: &[u8]) -> Option<Self> {
                Some(<$ty>::from_le_bytes(src.try_into().ok()?))
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::fixed(value)
            }
        }
    )*};
}

fixed_layout_numeric!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64);

impl FixedLayout for bool {
    const SIZE: usize = 1;

    fn put_le(self, dst: &mut BytesMut) {
        dst.put_u8(u8::from(self));
    }

    fn from_le_slice(src: &[u8]) -> Option<Self> {
        match src {
            [0] => Some(false),
            [1] => Some(true),
            _ => None,
        }
    }
}

impl FixedLayout for char {
    const SIZE: usize = 4;

    fn put_le(self, dst: &mut BytesMut) {
        dst.put_u32_le(u32::from(self));
    }

    fn from_le_slice(src: &[u8]) -> Option<Self> {
        char::from_u32(u32::from_le_slice(src)?)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::fixed(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::fixed(value)
    }
}

/// One entry of a stream being built for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Sent as a binary frame with this payload.
    Binary(Bytes),
    /// Sent as a text frame.
    Text(String),
}

impl Value {
    /// Binary value carrying the fixed-size representation of `value`.
    pub fn fixed<T: FixedLayout>(value: T) -> Self {
        let mut buf = BytesMut::with_capacity(T::SIZE);
        value.put_le(&mut buf);
        Value::Binary(buf.freeze())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn wire_size(&self) -> usize {
        match self {
            Value::Binary(payload) => HEADER_SIZE + payload.len(),
            Value::Text(text) => text.len() + DELIMITER.len(),
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Value::Binary(payload) => encode_binary(payload, dst),
            Value::Text(text) => encode_text(text.as_bytes(), dst),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Frame> for Value {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Binary(payload) => Value::Binary(payload),
            Frame::Text(payload) => Value::Text(String::from_utf8_lossy(&payload).into_owned()),
        }
    }
}

/// Total wire size of `values` once encoded back to back.
pub fn encoded_len(values: &[Value]) -> usize {
    values.iter().map(Value::wire_size).sum()
}

/// Encode `values` back to back, one frame per value.
///
/// On error `dst` keeps the frames encoded before the offending value.
pub fn encode_values(values: &[Value], dst: &mut BytesMut) -> Result<()> {
    dst.reserve(encoded_len(values));
    for value in values {
        value.encode(dst)?;
    }
    Ok(())
}

/// Encode `values` into a fresh buffer.
pub fn pack(values: &[Value]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(encoded_len(values));
    encode_values(values, &mut buf)?;
    Ok(buf.freeze())
}

/// Default chunk size for blocking and async reads: 8 KiB.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Configuration shared by the demultiplexer, reader and writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest backlog tolerated before the stream is declared corrupt.
    /// `None` (the default) buffers without bound.
    pub max_backlog: Option<usize>,
    /// Largest binary payload the writer accepts. Default: the length field limit.
    pub max_payload_size: usize,
    /// Bytes requested per `read` call by [`crate::FrameReader`].
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_backlog: None,
            max_payload_size: MAX_BINARY_PAYLOAD,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Build a `Vec<Value>` from anything convertible into [`Value`].
///
/// ```
/// use framedemux_frame::{pack, values};
///
/// let wire = pack(&values!["456", 0x0A0B_0C0D_i32, 2.72f32, 42u32]).unwrap();
/// assert_eq!(wire.len(), 7 + 9 + 9 + 9);
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_layout() {
        let mut buf = BytesMut::new();
        encode_binary(b"abc", &mut buf).unwrap();

        assert_eq!(buf.as_ref(), &[0x24, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_length_is_big_endian() {
        let mut buf = BytesMut::new();
        encode_binary(&vec![0u8; 0x0102], &mut buf).unwrap();

        assert_eq!(&buf[..HEADER_SIZE], &[MARKER, 0x00, 0x00, 0x01, 0x02]);
        assert_eq!(buf.len(), HEADER_SIZE + 0x0102);
    }

    #[test]
    fn test_text_layout() {
        let mut buf = BytesMut::new();
        encode_text(b"hi", &mut buf).unwrap();

        assert_eq!(buf.as_ref(), b"hi\r\n\r\n");
    }

    #[test]
    fn test_empty_text_is_just_the_delimiter() {
        let mut buf = BytesMut::new();
        encode_text(b"", &mut buf).unwrap();

        assert_eq!(buf.as_ref(), &DELIMITER);
    }

    #[test]
    fn test_fixed_i64() {
        let mut buf = BytesMut::new();
        encode_fixed(123_456_789i64, &mut buf);

        assert_eq!(buf.len(), HEADER_SIZE + 8);
        assert_eq!(&buf[..HEADER_SIZE], &[MARKER, 0, 0, 0, 8]);
        assert_eq!(i64::from_le_slice(&buf[HEADER_SIZE..]), Some(123_456_789));
    }

    #[test]
    fn test_fixed_matches_value_encoding() {
        let mut direct = BytesMut::new();
        encode_fixed(2.72f32, &mut direct);

        let packed = pack(&[Value::fixed(2.72f32)]).unwrap();
        assert_eq!(direct.as_ref(), packed.as_ref());
    }

    #[test]
    fn test_from_le_slice_rejects_wrong_size() {
        assert_eq!(u32::from_le_slice(&[1, 2, 3]), None);
        assert_eq!(bool::from_le_slice(&[2]), None);
        assert_eq!(char::from_le_slice(&0xD800u32.to_le_bytes()), None);
        assert_eq!(char::from_le_slice(&u32::from('a').to_le_bytes()), Some('a'));
    }

    #[test]
    fn test_empty_binary_payload_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_binary(b"", &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::EmptyPayload));
        assert!(buf.is_empty());

        let err = pack(&[Value::text("a"), Value::Binary(Bytes::new())]).unwrap_err();
        assert!(matches!(err, FrameError::EmptyPayload));
    }

    #[test]
    fn test_text_with_delimiter_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_text(b"one\r\n\r\ntwo", &mut buf).unwrap_err();

        assert!(matches!(err, FrameError::InvalidText { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_text_with_partial_delimiter_tail_rejected() {
        for payload in [&b"x\r\n"[..], b"\r\n", b"\n\r\n"] {
            assert!(
                validate_text(payload).is_err(),
                "{payload:?} should be rejected"
            );
        }
        assert!(validate_text(b"x\r").is_ok());
        assert!(validate_text(b"x\n").is_ok());
        assert!(validate_text(b"x\r\n\r").is_ok());
    }

    #[test]
    fn test_text_starting_with_marker_rejected() {
        let err = validate_text(b"$5.00").unwrap_err();
        assert!(matches!(err, FrameError::InvalidText { .. }));
        assert!(validate_text(b"costs $5.00").is_ok());
    }

    #[test]
    fn test_text_scenario_length() {
        let wire = pack(&values!["123456", "789123456123456"]).unwrap();

        assert_eq!(wire.len(), 6 + 4 + 15 + 4);
        assert_eq!(find_delimiter(&wire), Some(6));
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let values = values!["456", 0x0A0B_0C0D_i32, 2.72f32, 3.5f64, 'a', 42u32, true];
        let wire = pack(&values).unwrap();

        assert_eq!(wire.len(), encoded_len(&values));
    }

    #[test]
    fn test_encode_values_stops_at_invalid_value() {
        let values = vec![Value::fixed(1u8), Value::text("bad\r\n\r\n"), Value::fixed(2u8)];
        let mut buf = BytesMut::new();

        assert!(encode_values(&values, &mut buf).is_err());
        assert_eq!(buf.len(), HEADER_SIZE + 1);
    }

    #[test]
    fn test_frame_wire_size() {
        assert_eq!(Frame::binary(&b"test"[..]).wire_size(), HEADER_SIZE + 4);
        assert_eq!(Frame::text(&b"test"[..]).wire_size(), 4 + DELIMITER.len());
    }

    #[test]
    fn test_frame_encode_and_view_round_trip() {
        let frame = Frame::text(&b"hello"[..]);
        let mut buf = BytesMut::new();
        frame.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), frame.wire_size());

        let view = FrameView::Text(&buf[..5]);
        assert_eq!(view.kind(), FrameKind::Text);
        assert_eq!(view.to_owned_frame(), frame);
    }
}
