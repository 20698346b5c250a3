//! MLLP envelope codec — byte-level state machine for HL7 frames.
//!
//! MLLP wraps each message as `0x0B <payload> 0x1C 0x0D`. Frames can split
//! across TCP segments, so the decoder operates byte-by-byte and handles
//! partial reads correctly. Every completed frame or framing error fully
//! resets the decoder: one bad frame never corrupts the next.

use std::collections::VecDeque;
use std::io::Read;
use std::time::{Duration, Instant};

use crate::MllpError;

/// Start-of-block byte (vertical tab).
pub const START_BLOCK: u8 = 0x0B;
/// End-of-block byte (file separator).
pub const END_BLOCK: u8 = 0x1C;
/// Trailer byte immediately after the end-of-block.
pub const TRAILER: u8 = 0x0D;

/// Default maximum frame size (1 MiB). Typical HL7 messages are a few KB;
/// this guard prevents runaway accumulation from a misbehaving peer.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Internal state of the decoder.
enum DecoderState {
    /// Waiting for a start-of-block; skip any garbage between frames.
    WaitStart,
    /// Inside a frame — collecting payload bytes until the end-of-block.
    Accumulate,
    /// End-of-block seen; the next byte must be the trailer.
    WaitTrailer,
}

/// Incremental MLLP frame decoder.
///
/// Feed it raw bytes as they arrive; completed payloads queue up and come
/// back out of [`MllpDecoder::next_frame`]. A framing violation is
/// reported once and the decoder resets to hunt for the next
/// start-of-block.
pub struct MllpDecoder {
    state: DecoderState,
    payload: Vec<u8>,
    ready: VecDeque<Vec<u8>>,
    max_frame_size: usize,
}

impl MllpDecoder {
    /// A fresh decoder with the given per-frame size limit.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            state: DecoderState::WaitStart,
            payload: Vec::with_capacity(1024),
            ready: VecDeque::new(),
            max_frame_size,
        }
    }

    /// Whether the decoder is between frames with nothing buffered.
    ///
    /// A connection that closes while the decoder is idle ended cleanly; a
    /// close mid-frame did not.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecoderState::WaitStart) && self.ready.is_empty()
    }

    /// Consume a chunk of raw bytes, queueing any frames it completes.
    ///
    /// The whole chunk is always consumed: a framing violation resets the
    /// decoder and scanning resumes within the same chunk, so a well-formed
    /// frame that arrived alongside a bad one still queues. The first error
    /// encountered is returned after the chunk is processed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), MllpError> {
        let mut first_error = None;
        for &byte in bytes {
            if let Err(err) = self.push(byte)
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Pop the oldest completed frame payload, if any.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }

    fn push(&mut self, byte: u8) -> Result<(), MllpError> {
        match (&self.state, byte) {
            (DecoderState::WaitStart, START_BLOCK) => {
                self.payload.clear();
                self.state = DecoderState::Accumulate;
            }
            (DecoderState::WaitStart, _) => {
                // Garbage between frames (stray CR/LF, keepalive noise).
            }
            (DecoderState::Accumulate, END_BLOCK) => {
                self.state = DecoderState::WaitTrailer;
            }
            (DecoderState::Accumulate, byte) => {
                if self.payload.len() >= self.max_frame_size {
                    let size = self.payload.len() + 1;
                    self.reset();
                    return Err(MllpError::FrameTooLarge {
                        size,
                        max: self.max_frame_size,
                    });
                }
                self.payload.push(byte);
            }
            (DecoderState::WaitTrailer, TRAILER) => {
                self.ready.push_back(std::mem::take(&mut self.payload));
                self.state = DecoderState::WaitStart;
            }
            (DecoderState::WaitTrailer, other) => {
                self.reset();
                return Err(MllpError::Framing {
                    details: format!("expected 0x0D after end-of-block, got {other:#04x}"),
                });
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.state = DecoderState::WaitStart;
        self.payload.clear();
    }
}

/// Wrap a payload in the MLLP envelope.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 3);
    out.push(START_BLOCK);
    out.extend_from_slice(payload);
    out.push(END_BLOCK);
    out.push(TRAILER);
    out
}

/// Read from a stream until the decoder yields one complete frame.
///
/// The stream must already have a short read timeout set; this loop turns
/// those periodic `WouldBlock`/`TimedOut` wakeups into a wall-clock
/// deadline check. A zero-length read means the peer closed.
pub(crate) fn read_frame(
    stream: &mut impl Read,
    decoder: &mut MllpDecoder,
    timeout: Duration,
) -> Result<Vec<u8>, MllpError> {
    let start = Instant::now();
    let deadline = start
        .checked_add(timeout)
        .unwrap_or_else(|| start + Duration::from_secs(86400));
    let mut buf = [0u8; 4096];

    loop {
        if let Some(frame) = decoder.next_frame() {
            return Ok(frame);
        }
        if Instant::now() >= deadline {
            return Err(MllpError::ReadTimeout);
        }

        match stream.read(&mut buf) {
            Ok(0) => return Err(MllpError::ConnectionClosed),
            Ok(n) => {
                let fed = decoder.feed(&buf[..n]);
                // A frame completed in this chunk outranks a framing error
                // elsewhere in it; the frame is what the caller is waiting on.
                if let Some(frame) = decoder.next_frame() {
                    return Ok(frame);
                }
                fed?;
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                if Instant::now() >= deadline {
                    return Err(MllpError::ReadTimeout);
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) => return Err(MllpError::ReadFailed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode_all(decoder: &mut MllpDecoder) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(frame) = decoder.next_frame() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn single_frame() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        decoder.feed(&encode(b"MSH|^~\\&|A")).unwrap();
        assert_eq!(decode_all(&mut decoder), vec![b"MSH|^~\\&|A".to_vec()]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn byte_at_a_time() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        for byte in encode(b"MSH|data") {
            decoder.feed(&[byte]).unwrap();
        }
        assert_eq!(decode_all(&mut decoder), vec![b"MSH|data".to_vec()]);
    }

    #[test]
    fn back_to_back_frames() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        let mut wire = encode(b"one");
        wire.extend_from_slice(&encode(b"two"));
        decoder.feed(&wire).unwrap();
        assert_eq!(
            decode_all(&mut decoder),
            vec![b"one".to_vec(), b"two".to_vec()]
        );
    }

    #[test]
    fn garbage_between_frames_is_skipped() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        let mut wire = b"\r\nnoise".to_vec();
        wire.extend_from_slice(&encode(b"payload"));
        wire.extend_from_slice(b"\r\n");
        decoder.feed(&wire).unwrap();
        assert_eq!(decode_all(&mut decoder), vec![b"payload".to_vec()]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn empty_payload_frame() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        decoder.feed(&encode(b"")).unwrap();
        assert_eq!(decode_all(&mut decoder), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn bad_trailer_errors_then_recovers() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        let result = decoder.feed(&[START_BLOCK, b'X', END_BLOCK, b'!']);
        assert!(matches!(result, Err(MllpError::Framing { .. })));
        assert!(decoder.is_idle());

        // The very next well-formed frame decodes fine.
        decoder.feed(&encode(b"next")).unwrap();
        assert_eq!(decode_all(&mut decoder), vec![b"next".to_vec()]);
    }

    #[test]
    fn frame_after_error_in_same_chunk_still_decodes() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        let mut wire = vec![START_BLOCK, b'X', END_BLOCK, b'!'];
        wire.extend_from_slice(&encode(b"next"));
        let result = decoder.feed(&wire);
        assert!(matches!(result, Err(MllpError::Framing { .. })));
        assert_eq!(decode_all(&mut decoder), vec![b"next".to_vec()]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut decoder = MllpDecoder::new(16);
        let result = decoder.feed(&encode(&[b'X'; 64]));
        assert!(matches!(
            result,
            Err(MllpError::FrameTooLarge { max: 16, .. })
        ));
        assert!(decoder.is_idle());
    }

    #[test]
    fn frame_at_exact_max_size() {
        let mut decoder = MllpDecoder::new(16);
        decoder.feed(&encode(&[b'X'; 16])).unwrap();
        assert_eq!(decoder.next_frame().unwrap().len(), 16);
    }

    #[test]
    fn encode_shape() {
        let wire = encode(b"AB");
        assert_eq!(wire, vec![START_BLOCK, b'A', b'B', END_BLOCK, TRAILER]);
    }

    #[test]
    fn read_frame_from_stream() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        let mut cursor = Cursor::new(encode(b"hello"));
        let frame = read_frame(&mut cursor, &mut decoder, Duration::from_secs(1)).unwrap();
        assert_eq!(frame, b"hello");
    }

    #[test]
    fn read_frame_reports_close_mid_frame() {
        let mut decoder = MllpDecoder::new(DEFAULT_MAX_FRAME_SIZE);
        let mut cursor = Cursor::new(vec![START_BLOCK, b'p', b'a', b'r', b't']);
        let result = read_frame(&mut cursor, &mut decoder, Duration::from_secs(1));
        assert!(matches!(result, Err(MllpError::ConnectionClosed)));
        assert!(!decoder.is_idle());
    }
}
