//! Reassembles newline-terminated lines from arbitrarily chunked bytes.

/// Buffers partial lines between transport chunks.
///
/// Bytes without a trailing newline are kept until the next chunk (or
/// [`LineSplitter::finish`]) completes them. A `\r` before the newline is
/// dropped, and invalid UTF-8 is replaced rather than rejected.
#[derive(Debug, Default)]
pub struct LineSplitter {
    partial: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let mut line = std::mem::take(&mut self.partial);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                lines.push(String::from_utf8_lossy(&line).into_owned());
            } else {
                self.partial.push(byte);
            }
        }
        lines
    }

    /// Flush an unterminated trailing line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.partial);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }
}
