//! Line body rendering.
//!
//! Pure helpers that turn prefixes, payloads and escape codes into text.
//! The logger glues them together under its lock.

use core::fmt::{self, Write};

use super::error::LogError;

/// Terminal sequence that erases from the cursor to the end of the line.
pub const ERASE_LINE: &str = "\x1B[K";

/// Foreground color start sequence: `ESC[<n>m`.
pub fn color_code(out: &mut impl Write, color: u8) -> fmt::Result {
    write!(out, "\x1B[{}m", color)
}

/// Fixed-width prefix column.
///
/// The prefix is cut to `max_len` characters and followed by `:` (unless it
/// is empty), then padded with spaces to `max_len + 2` columns.
pub fn write_prefix(out: &mut impl Write, prefix: &str, max_len: usize) -> fmt::Result {
    let mut written = 0;
    for c in prefix.chars().take(max_len) {
        out.write_char(c)?;
        written += 1;
    }
    if written > 0 {
        out.write_char(':')?;
        written += 1;
    }
    for _ in written..max_len + 2 {
        out.write_char(' ')?;
    }
    Ok(())
}

/// Two spaces per indent level.
pub fn write_indent(out: &mut impl Write, indent: u8) -> fmt::Result {
    for _ in 0..indent {
        out.write_str("  ")?;
    }
    Ok(())
}

/// Uppercase hex bytes separated by single spaces.
pub fn write_hex(out: &mut impl Write, data: &[u8]) -> fmt::Result {
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.write_char(' ')?;
        }
        write!(out, "{:02X}", byte)?;
    }
    Ok(())
}

/// `prefix<id>`, used by modules that run several channels.
pub fn build_prefix(prefix: &str, id: impl fmt::Display) -> String {
    format!("{}<{}>", prefix, id)
}

/// Capacity-limited formatting target.
///
/// Keeps whatever fits and remembers how much was asked for in total, so an
/// overflow can be reported with the size that would have been needed.
pub struct BoundedWriter {
    buf: String,
    capacity: usize,
    required: usize,
}

impl BoundedWriter {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            capacity,
            required: 0,
        }
    }

    /// Text that fit into the buffer.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// A message must leave one byte of room, so `required == capacity`
    /// already counts as too large.
    pub fn overflowed(&self) -> bool {
        self.required >= self.capacity
    }

    pub fn finish(self) -> Result<String, (String, LogError)> {
        if self.overflowed() {
            let err = LogError::BufferOverflow {
                capacity: self.capacity,
                required: self.required,
            };
            Err((self.buf, err))
        } else {
            Ok(self.buf)
        }
    }
}

impl Write for BoundedWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let start = self.required;
        self.required += s.len();
        let limit = self.capacity.saturating_sub(1);
        if start < limit {
            for c in s.chars() {
                if self.buf.len() + c.len_utf8() > limit {
                    break;
                }
                self.buf.push(c);
            }
        }
        Ok(())
    }
}

/// Render `args` into at most `capacity - 1` bytes.
///
/// On overflow the error carries the truncated text so the caller can still
/// print what fit before escalating.
pub fn format_bounded(
    capacity: usize,
    args: fmt::Arguments<'_>,
) -> Result<String, (String, LogError)> {
    let mut writer = BoundedWriter::new(capacity);
    let _ = writer.write_fmt(args);
    writer.finish()
}
