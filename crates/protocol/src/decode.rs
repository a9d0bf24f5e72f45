//! Incremental envelope decoding
//!
//! The agent stream has no length prefix; envelopes are delimited only by
//! JSON itself. [`EnvelopeDecoder`] buffers raw bytes from the socket and
//! yields complete envelopes as they become parseable, leaving partial
//! trailing data in place for the next read.

use bytes::{Buf, BytesMut};

use crate::DEFAULT_MAX_ENVELOPE_SIZE;
use crate::envelope::Envelope;
use crate::error::{DecodeError, Result};

/// Incremental decoder for the agent envelope stream
///
/// Feed raw socket bytes with [`feed`](Self::feed), then drain complete
/// envelopes with [`next_envelope`](Self::next_envelope). A partial
/// envelope at the end of the buffer is not an error; it simply yields
/// `None` until more bytes arrive.
#[derive(Debug)]
pub struct EnvelopeDecoder {
    buf: BytesMut,
    max_envelope_size: usize,
}

impl EnvelopeDecoder {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_ENVELOPE_SIZE)
    }

    /// Create a decoder with a custom per-envelope size cap
    pub fn with_limit(max_envelope_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(8 * 1024),
            max_envelope_size,
        }
    }

    /// Append raw bytes read from the connection
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered, not-yet-consumed bytes
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Try to decode the next complete envelope
    ///
    /// Returns `Ok(None)` when the buffer holds no complete envelope yet.
    /// A malformed stream or an envelope above the size cap is fatal to
    /// the connection.
    pub fn next_envelope(&mut self) -> Result<Option<Envelope>> {
        self.skip_whitespace();
        if self.buf.is_empty() {
            return Ok(None);
        }

        let mut stream = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Envelope>();
        match stream.next() {
            Some(Ok(envelope)) => {
                let consumed = stream.byte_offset();
                self.buf.advance(consumed);
                Ok(Some(envelope))
            }
            Some(Err(e)) if e.is_eof() => {
                if self.buf.len() > self.max_envelope_size {
                    return Err(DecodeError::Oversized {
                        limit: self.max_envelope_size,
                    });
                }
                Ok(None)
            }
            Some(Err(e)) => Err(DecodeError::Malformed(e)),
            None => Ok(None),
        }
    }

    /// Envelopes may be separated by arbitrary whitespace (newlines from
    /// line-oriented agents); strip it so it never counts against the
    /// size cap.
    fn skip_whitespace(&mut self) {
        let n = self
            .buf
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .count();
        if n > 0 {
            self.buf.advance(n);
        }
    }
}

impl Default for EnvelopeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod tests;
