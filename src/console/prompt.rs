//! Prompt buffer for console input

/// Maximum number of visible characters on the prompt line
pub const PROMPT_SIZE: usize = 14;

/// Bytes accepted into the prompt
pub const PRINTABLE: core::ops::RangeInclusive<u8> = 0x20..=0x7E;

/// Command line being typed.
///
/// Only printable ASCII is ever stored, so the contents are always valid UTF-8.
pub struct PromptBuffer {
    buf: [u8; PROMPT_SIZE],
    len: usize,
}

impl PromptBuffer {
    /// Create empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0u8; PROMPT_SIZE],
            len: 0,
        }
    }

    /// Append a printable character.
    ///
    /// Returns `false` if the byte was dropped (not printable or buffer full).
    pub fn push(&mut self, c: u8) -> bool {
        if !PRINTABLE.contains(&c) || self.len >= PROMPT_SIZE {
            return false;
        }
        self.buf[self.len] = c;
        self.len += 1;
        true
    }

    /// Remove last character
    pub fn backspace(&mut self) {
        if self.len > 0 {
            self.len -= 1;
            self.buf[self.len] = 0;
        }
    }

    /// Zero the buffer
    pub fn clear(&mut self) {
        self.buf = [0u8; PROMPT_SIZE];
        self.len = 0;
    }

    /// Get buffer as string slice
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == PROMPT_SIZE
    }
}

impl Default for PromptBuffer {
    fn default() -> Self {
        Self::new()
    }
}
