//! Logger error types

/// Errors detected while rendering a log line.
///
/// None of these are returned to log callers: the logger reports them itself
/// (error line or fatal error). The bounded formatter exposes them so the
/// escalation point stays explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    /// L01: formatted message does not fit the message buffer
    BufferOverflow { capacity: usize, required: usize },
    /// L02: indent change would leave 0..=MAX_INDENT
    IndentOutOfRange { current: u8, requested: i16 },
}

impl LogError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::BufferOverflow { .. } => "L01",
            Self::IndentOutOfRange { .. } => "L02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::BufferOverflow { .. } => "BufferOverflow: increase message capacity",
            Self::IndentOutOfRange { .. } => "Indent error!",
        }
    }
}

impl core::fmt::Display for LogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferOverflow { capacity, required } => write!(
                f,
                "{}: {} ({} bytes needed, {} available)",
                self.code(),
                self.message(),
                required,
                capacity
            ),
            Self::IndentOutOfRange { current, requested } => write!(
                f,
                "{}: {} (at {}, requested {})",
                self.code(),
                self.message(),
                current,
                requested
            ),
        }
    }
}
