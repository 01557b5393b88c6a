//! Output buffer for an expect session.
//!
//! Device output is accumulated with ANSI escape codes stripped, and
//! completion markers are plain substrings searched with `memchr::memmem`.
//! Callers take a [`Mark`] before a step or an action and search only the
//! output that arrived after it.

use memchr::memmem;

/// A position in the buffer, taken with [`OutputBuffer::mark`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mark(usize);

/// Accumulated session output.
#[derive(Debug)]
pub struct OutputBuffer {
    buffer: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// The current end of the buffer.
    pub fn mark(&self) -> Mark {
        Mark(self.buffer.len())
    }

    /// Bytes received after `mark`.
    pub fn since(&self, mark: Mark) -> &[u8] {
        &self.buffer[mark.0.min(self.buffer.len())..]
    }

    /// Output after `mark` as text (lossy UTF-8 conversion).
    pub fn text_since(&self, mark: Mark) -> String {
        String::from_utf8_lossy(self.since(mark)).into_owned()
    }

    /// Whether `needle` occurs in the output after `mark`.
    pub fn contains_since(&self, mark: Mark, needle: &str) -> bool {
        memmem::find(self.since(mark), needle.as_bytes()).is_some()
    }

    /// Whether anything arrived after `mark`.
    pub fn has_output_since(&self, mark: Mark) -> bool {
        !self.since(mark).is_empty()
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop everything received so far. Marks taken before clearing must
    /// not be reused.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}
