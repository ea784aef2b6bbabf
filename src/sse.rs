use bytes::BytesMut;
use tracing::warn;

/// Reassembles logical lines from arbitrarily chunked bytes.
///
/// Splitting happens on raw bytes, so a multi-byte character cut in half by
/// the transport is whole again before decoding. There is no line length cap.
#[derive(Debug, Default)]
pub struct LineReader {
    pending: BytesMut,
    /// Prefix of `pending` already known to contain no newline.
    scanned: usize,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the `\n`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();

        while let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line = self.pending.split_to(end + 1);
            self.scanned = 0;
            if let Some(text) = decode(&line[..end]) {
                lines.push(text);
            }
        }
        self.scanned = self.pending.len();

        lines
    }

    /// Flush the trailing fragment at end of stream, if there is one.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        decode(&rest)
    }

    /// Bytes buffered waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_string()),
        Err(e) => {
            warn!(error = %e, len = bytes.len(), "dropping sse line with invalid utf-8");
            None
        }
    }
}
