//! Length-prefixed binary framing.
//!
//! Every frame on the wire is a fixed 5-byte big-endian header followed by
//! the payload:
//!
//! ```text
//! +---------+----------------------+-----------------+
//! | command |   payload length     |     payload     |
//! |  1 byte |  4 bytes, u32 BE     |  length bytes   |
//! +---------+----------------------+-----------------+
//! ```
//!
//! The codec is pure: [`encode`] and [`decode`] hold no state, and any
//! buffering of partially received bytes is the caller's job.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::WireError;

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 5;

/// Largest payload the 4-byte length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// One decoded wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw command byte. Unknown values are carried through untouched.
    pub command: u8,
    /// Frame body.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(command: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// Declared payload length as it appears in the header.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Encode this frame, header included.
    pub fn encode(&self) -> Result<Bytes, WireError> {
        encode(u32::from(self.command), &self.payload)
    }
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: u8,
    pub length: u32,
}

impl Header {
    /// Parse a header from exactly [`HEADER_SIZE`] bytes.
    ///
    /// Slicing is fixed-width and the length is unsigned, so there is no
    /// malformed header to reject once five bytes are present.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            command: bytes[0],
            length: u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
        }
    }

    /// Payload length as a buffer size.
    pub fn payload_len(&self) -> usize {
        self.length as usize
    }
}

/// Encode `command` and `payload` into a single frame.
///
/// The command is taken wider than a byte so callers holding an untyped
/// integer get [`WireError::InvalidCommand`] instead of silent truncation.
pub fn encode(command: u32, payload: &[u8]) -> Result<Bytes, WireError> {
    let command = u8::try_from(command).map_err(|_| WireError::InvalidCommand(command))?;
    let length = payload_length(payload.len())?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u8(command);
    buf.put_u32(length);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Check that a payload of `len` bytes fits the header's length field.
pub fn payload_length(len: usize) -> Result<u32, WireError> {
    u32::try_from(len).map_err(|_| WireError::PayloadTooLarge(len))
}

/// Try to decode one frame from the front of `buffer`.
///
/// Returns `(None, buffer)` with the buffer untouched when the header or the
/// declared payload has not fully arrived yet. Otherwise returns the frame and
/// whatever follows it.
pub fn decode(buffer: &[u8]) -> (Option<Frame>, &[u8]) {
    let Some(header_bytes) = buffer.first_chunk::<HEADER_SIZE>() else {
        return (None, buffer);
    };
    let header = Header::parse(header_bytes);

    let end = match HEADER_SIZE.checked_add(header.payload_len()) {
        Some(end) if end <= buffer.len() => end,
        _ => return (None, buffer),
    };

    let frame = Frame {
        command: header.command,
        payload: Bytes::copy_from_slice(&buffer[HEADER_SIZE..end]),
    };
    (Some(frame), &buffer[end..])
}

/// Decode every complete frame at the front of `buffer`.
///
/// Returns the frames in order and the trailing bytes of any incomplete frame.
pub fn decode_all(mut buffer: &[u8]) -> (Vec<Frame>, &[u8]) {
    let mut frames = Vec::new();
    while let (Some(frame), rest) = decode(buffer) {
        frames.push(frame);
        buffer = rest;
    }
    (frames, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_writes_big_endian_header() {
        let bytes = encode(2, b"abc").unwrap();
        assert_eq!(&bytes[..], &[2, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn encode_rejects_out_of_range_command() {
        match encode(256, b"x") {
            Err(WireError::InvalidCommand(256)) => {}
            other => panic!("expected InvalidCommand, got {other:?}"),
        }
        assert!(encode(255, b"").is_ok());
        assert!(encode(0, b"").is_ok());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn payload_length_rejects_oversized() {
        assert_eq!(payload_length(MAX_PAYLOAD_LEN).unwrap(), u32::MAX);
        match payload_length(MAX_PAYLOAD_LEN + 1) {
            Err(WireError::PayloadTooLarge(len)) => assert_eq!(len, MAX_PAYLOAD_LEN + 1),
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_leaves_empty_remainder() {
        for (command, payload) in [(1u8, &b"{\"id\":\"t1\"}"[..]), (3, b""), (255, b"\0\xff")] {
            let bytes = encode(u32::from(command), payload).unwrap();
            let (frame, rest) = decode(&bytes);
            let frame = frame.expect("complete frame");
            assert_eq!(frame.command, command);
            assert_eq!(&frame.payload[..], payload);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn every_strict_prefix_is_incomplete() {
        let bytes = encode(1, b"hello world").unwrap();
        for cut in 0..bytes.len() {
            let prefix = &bytes[..cut];
            let (frame, rest) = decode(prefix);
            assert!(frame.is_none(), "prefix of {cut} bytes decoded");
            assert_eq!(rest, prefix);
        }
    }

    #[test]
    fn concatenated_frames_decode_in_order() {
        let mut stream = Vec::new();
        for i in 0u8..4 {
            stream.extend_from_slice(&encode(u32::from(i), &vec![i; usize::from(i)]).unwrap());
        }

        let mut buffer = &stream[..];
        let mut seen = Vec::new();
        while let (Some(frame), rest) = decode(buffer) {
            seen.push(frame.command);
            assert_eq!(frame.len(), usize::from(frame.command));
            buffer = rest;
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn decode_all_keeps_trailing_partial_frame() {
        let mut stream = encode(1, b"one").unwrap().to_vec();
        let second = encode(2, b"two").unwrap();
        stream.extend_from_slice(&second[..6]);

        let (frames, rest) = decode_all(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], Frame::new(1, &b"one"[..]));
        assert_eq!(rest, &second[..6]);
    }

    #[test]
    fn header_declaring_huge_length_waits_for_more() {
        let buffer = [1u8, 0xff, 0xff, 0xff, 0xff, 0, 0];
        let (frame, rest) = decode(&buffer);
        assert!(frame.is_none());
        assert_eq!(rest, &buffer[..]);
    }
}
