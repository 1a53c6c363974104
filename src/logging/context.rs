//! Per-execution-context rendering state.
//!
//! Each core gets its own color and indent so that one core changing its
//! color never bleeds into the lines of the other. The table lives outside
//! the output lock; every context only ever writes its own slot.

use core::sync::atomic::{AtomicU8, Ordering};

use super::error::LogError;

/// Number of execution contexts (CPU cores) tracked by the logger.
pub const MAX_CONTEXTS: usize = 2;

/// Deepest allowed indent level.
pub const MAX_INDENT: u8 = 10;

/// Identifier of an execution context (the CPU core id on the device).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContextId(u8);

impl ContextId {
    /// Core 0.
    pub const PRIMARY: ContextId = ContextId(0);
    /// Core 1.
    pub const SECONDARY: ContextId = ContextId(1);

    /// Context of the CPU core with index `core`, `None` for anything that
    /// is not a core number (e.g. FreeRTOS `tskNO_AFFINITY`).
    pub fn from_core(core: i32) -> Option<Self> {
        let id = u8::try_from(core).ok()?;
        ((id as usize) < MAX_CONTEXTS).then_some(Self(id))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Marker printed in front of a line when core markers are enabled.
    pub fn marker(self) -> &'static str {
        if self.0 == 0 {
            "0_> "
        } else {
            "_1> "
        }
    }
}

/// Color and indent of one execution context.
pub struct ContextState {
    color: AtomicU8,
    indent: AtomicU8,
}

impl ContextState {
    pub const fn new() -> Self {
        Self {
            color: AtomicU8::new(0),
            indent: AtomicU8::new(0),
        }
    }

    #[inline]
    pub fn color(&self) -> u8 {
        self.color.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_color(&self, color: u8) {
        self.color.store(color, Ordering::Relaxed);
    }

    #[inline]
    pub fn indent(&self) -> u8 {
        self.indent.load(Ordering::Relaxed)
    }

    /// Move the indent by `delta`, rejecting anything outside 0..=MAX_INDENT.
    pub fn shift_indent(&self, delta: i16) -> Result<u8, LogError> {
        let current = self.indent();
        let requested = current as i16 + delta;
        self.set_indent_checked(current, requested)
    }

    /// Set an absolute indent, rejecting values above MAX_INDENT.
    pub fn set_indent(&self, indent: u8) -> Result<u8, LogError> {
        self.set_indent_checked(self.indent(), indent as i16)
    }

    fn set_indent_checked(&self, current: u8, requested: i16) -> Result<u8, LogError> {
        if !(0..=MAX_INDENT as i16).contains(&requested) {
            return Err(LogError::IndentOutOfRange { current, requested });
        }
        self.indent.store(requested as u8, Ordering::Relaxed);
        Ok(requested as u8)
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self::new()
    }
}

/// One `ContextState` per execution context.
pub struct ContextTable {
    slots: [ContextState; MAX_CONTEXTS],
}

impl ContextTable {
    pub const fn new() -> Self {
        const EMPTY: ContextState = ContextState::new();
        Self {
            slots: [EMPTY; MAX_CONTEXTS],
        }
    }

    #[inline]
    pub fn get(&self, id: ContextId) -> &ContextState {
        &self.slots[id.index()]
    }
}

impl Default for ContextTable {
    fn default() -> Self {
        Self::new()
    }
}
