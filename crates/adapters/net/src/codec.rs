//! Frame codec for the feed wire protocol.
//!
//! A frame is `0x02 ... 0x03`; everything between the markers is one
//! record. Bytes outside a frame are noise and dropped; an unterminated
//! frame is retained until the next read. Records arrive in ISO-8859-1
//! and are transcoded to UTF-8 (every byte maps to the code point of the
//! same value, so `b as char` is exact).

/// Frame start marker (STX).
pub const FRAME_START: u8 = 0x02;
/// Frame end marker (ETX).
pub const FRAME_END: u8 = 0x03;

/// Initial receive-buffer capacity; the buffer grows geometrically.
const SEED_CAPACITY: usize = 64;

/// Accumulates feed bytes and yields complete records.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(SEED_CAPACITY),
        }
    }

    /// Number of buffered (unprocessed) bytes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Discard any partially received frame.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Feed `bytes` in and collect every complete record, transcoded to
    /// UTF-8. Empty records are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut records = Vec::new();
        let mut rest = self.buf.as_slice();
        loop {
            let Some(start) = rest.iter().position(|&b| b == FRAME_START) else {
                // Nothing but noise; drop it all.
                rest = &[];
                break;
            };
            let body = &rest[start + 1..];
            let Some(end) = body.iter().position(|&b| b == FRAME_END) else {
                // Unterminated frame: keep from the start marker on.
                rest = &rest[start..];
                break;
            };
            if end > 0 {
                records.push(latin1_to_utf8(&body[..end]));
            }
            rest = &body[end + 1..];
        }

        self.buf = rest.to_vec();
        records
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Transcode ISO-8859-1 bytes to a UTF-8 string.
#[must_use]
pub fn latin1_to_utf8(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Wrap `payload` in frame markers for the wire.
#[must_use]
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(FRAME_START);
    out.extend_from_slice(payload);
    out.push(FRAME_END);
    out
}
