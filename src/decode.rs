//! Lenient UTF-8 decoding of the serial byte stream
//!
//! Serial output is decoded chunk by chunk as it arrives, but a multi-byte
//! character can straddle two reads. The decoder holds back an incomplete
//! trailing sequence until the next chunk completes it, so the text emitted
//! for a stream never depends on where the reads happened to split it.
//!
//! Malformed input never fails the run. Each maximal invalid subsequence is
//! handled according to [`InvalidBytes`]: replaced with U+FFFD (the same
//! substitution `String::from_utf8_lossy` makes) or dropped.

use serde::Deserialize;

/// What to do with bytes that are not valid UTF-8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvalidBytes {
    /// Substitute U+FFFD REPLACEMENT CHARACTER
    #[default]
    Replace,
    /// Silently omit the offending bytes
    Drop,
}

/// Streaming lenient decoder
#[derive(Debug, Default)]
pub struct LenientDecoder {
    policy: InvalidBytes,
    pending: Vec<u8>,
}

impl LenientDecoder {
    pub fn new(policy: InvalidBytes) -> Self {
        Self {
            policy,
            pending: Vec::new(),
        }
    }

    /// Decode the next chunk of the stream.
    ///
    /// Returns all text that can be decided on so far. Up to three bytes of
    /// an unfinished character may be retained for the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let policy = self.policy;
        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    if let Ok(valid) = std::str::from_utf8(valid) {
                        out.push_str(valid);
                    }
                    match e.error_len() {
                        Some(len) => {
                            if policy == InvalidBytes::Replace {
                                out.push(char::REPLACEMENT_CHARACTER);
                            }
                            rest = &after[len..];
                        }
                        // Truncated sequence at the end: wait for more input
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    /// Flush whatever is still held back once the stream has ended.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return String::new();
        }

        match self.policy {
            InvalidBytes::Replace => String::from_utf8_lossy(&pending).into_owned(),
            InvalidBytes::Drop => String::new(),
        }
    }

    /// Number of bytes held back waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
