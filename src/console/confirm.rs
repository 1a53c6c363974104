//! Key-repeat counter for destructive actions.
//!
//! The operator confirms by pressing the same key several times in a row.
//! Only printable bytes count: a newline between presses keeps the run, any
//! other printable byte starts a new one.

use super::prompt::PRINTABLE;
use crate::logging::Logger;

#[derive(Debug, Default, Clone, Copy)]
pub struct RepeatCounter {
    last: Option<u8>,
    count: u8,
}

impl RepeatCounter {
    pub const fn new() -> Self {
        Self { last: None, count: 0 }
    }

    /// Record a received byte. Non-printable bytes are skipped.
    pub fn feed(&mut self, byte: u8) {
        if !PRINTABLE.contains(&byte) {
            return;
        }
        if self.last == Some(byte) {
            self.count = self.count.saturating_add(1);
        } else {
            self.last = Some(byte);
            self.count = 1;
        }
    }

    /// How often `key` was received in a row, counting the latest printable
    /// byte. Zero unless `key` is that byte.
    pub fn repeats_of(&self, key: u8) -> u8 {
        if self.last == Some(key) {
            self.count
        } else {
            0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// What a module sees of the console while it handles a command.
pub struct CommandContext<'a> {
    logger: &'a Logger,
    repeats: &'a RepeatCounter,
}

impl<'a> CommandContext<'a> {
    pub fn new(logger: &'a Logger, repeats: &'a RepeatCounter) -> Self {
        Self { logger, repeats }
    }

    pub fn logger(&self) -> &'a Logger {
        self.logger
    }

    /// Gate for destructive actions.
    ///
    /// Returns `true` (not yet confirmed) until `key` has been received
    /// `repeats` times in a row, telling the operator how many more are needed.
    pub fn confirmation(&self, key: u8, repeats: u8, action: &str) -> bool {
        let seen = self.repeats.repeats_of(key);
        if seen >= repeats {
            return false;
        }
        self.logger.log_fmt(
            "",
            format_args!(
                "repeat \"{}\" {}x to trigger \"{}\"",
                key as char,
                repeats - seen,
                action
            ),
        );
        true
    }
}
