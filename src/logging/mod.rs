//! Line logger for the debug console.
//!
//! # Line envelope
//!
//! ```text
//! lock ─▶ erase prompt ─▶ color ─▶ core marker ─▶ body
//!                                                  │
//!                  message | prefix+indent+message | prefix+indent+hex
//!                                                  │
//!                      unlock ◀─ prompt ◀─ \r\n ◀─ reset
//! ```
//!
//! The prompt the operator is typing is erased before every line and drawn
//! again after it, so it stays on the bottom row while log output scrolls
//! above it.
//!
//! # Rules
//!
//! - All transport writes happen while holding the output lock.
//! - The lock is reentrant: a thread already holding it (through
//!   [`Logger::mutex_block`]) can keep logging without deadlock.
//! - Color and indent belong to the calling execution context, never shared.

use core::cell::{Cell, RefCell};
use core::fmt::{self, Write};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::platform::{Platform, FATAL_SYSTEM};
use crate::transport::Transport;

pub mod bridge;
pub mod context;
pub mod error;
pub mod render;

pub use bridge::install;
pub use context::{ContextId, ContextState, ContextTable, MAX_CONTEXTS, MAX_INDENT};
pub use error::LogError;
pub use log::Level;
pub use render::{build_prefix, format_bounded};

/// Line terminator, as serial terminals expect it.
pub const LINE_END: &str = "\r\n";

/// Terminal foreground colors used by the firmware.
pub mod color {
    pub const NONE: u8 = 0;
    pub const RED: u8 = 31;
    pub const YELLOW: u8 = 33;
    pub const MAGENTA: u8 = 35;
    pub const GREY: u8 = 90;
    pub const BRIGHT_YELLOW: u8 = 93;
}

/// Color used for lines of the given level.
pub const fn level_color(level: Level) -> u8 {
    match level {
        Level::Error => color::RED,
        Level::Warn => color::YELLOW,
        Level::Info => color::NONE,
        Level::Debug => color::GREY,
        Level::Trace => color::MAGENTA,
    }
}

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Prefix column width, excluding the `:` and padding space.
    pub max_prefix_len: usize,
    /// Size of the buffer formatted messages are rendered into.
    pub message_capacity: usize,
    /// Print `0_> ` / `_1> ` in front of lines on dual-core hardware.
    pub show_core: bool,
    /// Maintain the prompt line. Off for transports without a terminal
    /// (RTT, log capture).
    pub interactive: bool,
    /// Prefixes whose trace lines are emitted. Empty disables tracing.
    pub trace_filters: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_prefix_len: 24,
            message_capacity: 256,
            show_core: false,
            interactive: true,
            trace_filters: Vec::new(),
        }
    }
}

/// State behind the output lock.
struct Output {
    transport: RefCell<Box<dyn Transport>>,
    /// Last prompt handed over by the console.
    prompt: RefCell<String>,
    /// Characters of the prompt currently drawn on screen.
    last_prompt_len: Cell<usize>,
}

impl Output {
    fn emit(&self, s: &str) {
        self.transport.borrow_mut().write(s.as_bytes());
    }
}

struct Sink<'a>(&'a Output);

impl Write for Sink<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.emit(s);
        Ok(())
    }
}

/// Holds the output lock across several log calls.
///
/// Lines from other execution contexts wait until the block is released,
/// so a multi-line report is never interleaved.
#[must_use = "the lock is released as soon as the block is dropped"]
pub struct LogBlock<'a> {
    guard: ReentrantMutexGuard<'a, Output>,
}

impl LogBlock<'_> {
    fn output(&self) -> &Output {
        &self.guard
    }

    /// Release the lock (same as dropping the block).
    pub fn unblock(self) {}

    /// End the scope opened by [`Logger::begin`].
    pub fn end(self) {}
}

pub struct Logger {
    output: ReentrantMutex<Output>,
    contexts: ContextTable,
    platform: Arc<dyn Platform>,
    config: LoggerConfig,
}

impl Logger {
    pub fn new(
        transport: impl Transport + 'static,
        platform: Arc<dyn Platform>,
        config: LoggerConfig,
    ) -> Self {
        Self {
            output: ReentrantMutex::new(Output {
                transport: RefCell::new(Box::new(transport)),
                prompt: RefCell::new(String::new()),
                last_prompt_len: Cell::new(0),
            }),
            contexts: ContextTable::new(),
            platform,
            config,
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Enter the output scope. Recursive: nesting on one thread is fine.
    pub fn begin(&self) -> LogBlock<'_> {
        LogBlock {
            guard: self.output.lock(),
        }
    }

    /// Keep the output to the calling thread until the block is dropped.
    pub fn mutex_block(&self) -> LogBlock<'_> {
        self.begin()
    }

    fn state(&self) -> &ContextState {
        self.contexts.get(self.platform.current_context())
    }

    /// Set the color of the calling context (0 = none).
    pub fn color(&self, color: u8) {
        self.state().set_color(color);
    }

    pub fn current_color(&self) -> u8 {
        self.state().color()
    }

    pub fn indent(&self) -> u8 {
        self.state().indent()
    }

    pub fn indent_up(&self) {
        if let Err(err) = self.state().shift_indent(1) {
            self.report(err);
        }
    }

    pub fn indent_down(&self) {
        if let Err(err) = self.state().shift_indent(-1) {
            self.report(err);
        }
    }

    pub fn set_indent(&self, indent: u8) {
        if let Err(err) = self.state().set_indent(indent) {
            self.report(err);
        }
    }

    fn report(&self, err: LogError) {
        self.log_colored(color::RED, "Logger", format_args!("{}", err.message()));
    }

    /// Whether trace lines with this prefix pass the configured filters.
    pub fn trace_enabled(&self, prefix: &str) -> bool {
        self.config.trace_filters.iter().any(|f| prefix.starts_with(f.as_str()))
    }

    /// Plain message, no prefix column.
    pub fn log(&self, message: &str) {
        self.line(|out, _| out.write_str(message));
    }

    pub fn log_with_prefix(&self, prefix: &str, message: &str) {
        self.line(|out, indent| {
            self.write_prefix(out, prefix, indent)?;
            out.write_str(message)
        });
    }

    /// Formatted message with prefix column.
    ///
    /// A message that does not fit `message_capacity` is a build
    /// misconfiguration: the part that fits is printed, then the platform
    /// fatal error handler takes over.
    pub fn log_fmt(&self, prefix: &str, args: fmt::Arguments<'_>) {
        self.formatted(Some(prefix), args);
    }

    /// Formatted message without prefix column.
    pub fn log_values(&self, args: fmt::Arguments<'_>) {
        self.formatted(None, args);
    }

    pub fn log_hex(&self, data: &[u8]) {
        self.line(|out, _| render::write_hex(out, data));
    }

    pub fn log_hex_with_prefix(&self, prefix: &str, data: &[u8]) {
        self.line(|out, indent| {
            self.write_prefix(out, prefix, indent)?;
            render::write_hex(out, data)
        });
    }

    /// Log one line in `color`, then restore the context's previous color.
    pub fn log_colored(&self, color: u8, prefix: &str, args: fmt::Arguments<'_>) {
        let state = self.state();
        let previous = state.color();
        state.set_color(color);
        self.log_fmt(prefix, args);
        state.set_color(previous);
    }

    pub fn log_hex_colored(&self, color: u8, prefix: &str, data: &[u8]) {
        let state = self.state();
        let previous = state.color();
        state.set_color(color);
        self.log_hex_with_prefix(prefix, data);
        state.set_color(previous);
    }

    /// Entry point of the level macros and the `log` facade bridge.
    pub fn log_level(&self, level: Level, prefix: &str, args: fmt::Arguments<'_>) {
        if level == Level::Trace && !self.trace_enabled(prefix) {
            return;
        }
        self.log_colored(level_color(level), prefix, args);
    }

    /// Store the console's current input and draw it on the prompt line.
    pub fn print_prompt(&self, prompt: &str) {
        let scope = self.begin();
        let out = scope.output();
        *out.prompt.borrow_mut() = prompt.to_string();
        self.redraw_prompt(out);
        out.transport.borrow_mut().flush();
    }

    pub fn flush(&self) {
        self.begin().output().transport.borrow_mut().flush();
    }

    fn formatted(&self, prefix: Option<&str>, args: fmt::Arguments<'_>) {
        // Fatal escalation must follow its truncated line directly.
        let _block = self.mutex_block();

        let (message, overflow) = match format_bounded(self.config.message_capacity, args) {
            Ok(message) => (message, None),
            Err((partial, err)) => (partial, Some(err)),
        };

        self.line(|out, indent| {
            if let Some(prefix) = prefix {
                self.write_prefix(out, prefix, indent)?;
            }
            out.write_str(&message)
        });

        if let Some(err) = overflow {
            self.platform.fatal_error(FATAL_SYSTEM, err.message());
        }
    }

    fn write_prefix(&self, out: &mut Sink<'_>, prefix: &str, indent: u8) -> fmt::Result {
        render::write_prefix(out, prefix, self.config.max_prefix_len)?;
        render::write_indent(out, indent)
    }

    fn line(&self, body: impl FnOnce(&mut Sink<'_>, u8) -> fmt::Result) {
        let scope = self.begin();
        let out = scope.output();
        let context = self.platform.current_context();
        let state = self.contexts.get(context);
        let color = state.color();
        let mut sink = Sink(out);

        self.before_log(out, &mut sink, context, color);
        let _ = body(&mut sink, state.indent());
        self.after_log(out, &mut sink, color);
        scope.end();
    }

    fn before_log(&self, out: &Output, sink: &mut Sink<'_>, context: ContextId, color: u8) {
        self.clear_previous_line(out);
        if color != color::NONE {
            let _ = render::color_code(sink, color);
        }
        if self.config.show_core && self.platform.capabilities().dual_core {
            out.emit(context.marker());
        }
    }

    fn after_log(&self, out: &Output, sink: &mut Sink<'_>, color: u8) {
        if color != color::NONE {
            let _ = render::color_code(sink, color::NONE);
        }
        out.emit(LINE_END);
        self.redraw_prompt(out);
        out.transport.borrow_mut().flush();
    }

    fn clear_previous_line(&self, out: &Output) {
        if !self.config.interactive {
            return;
        }
        let erase = "\x08".repeat(out.last_prompt_len.replace(0));
        out.emit(&erase);
        out.emit(render::ERASE_LINE);
    }

    fn redraw_prompt(&self, out: &Output) {
        if !self.config.interactive {
            return;
        }
        self.clear_previous_line(out);
        let prompt = out.prompt.borrow();
        out.emit(&prompt);
        out.last_prompt_len.set(prompt.len());
    }
}

/// Log an error line (red) with prefix.
///
/// # Example
///
/// ```ignore
/// log_error!(logger, "Flash", "erase failed at 0x{:08X}", offset);
/// ```
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $prefix:expr, $($arg:tt)*) => {
        $logger.log_level($crate::logging::Level::Error, $prefix, format_args!($($arg)*))
    };
}

/// Log a warning line (yellow) with prefix.
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $prefix:expr, $($arg:tt)*) => {
        $logger.log_level($crate::logging::Level::Warn, $prefix, format_args!($($arg)*))
    };
}

/// Log an info line (no color) with prefix.
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $prefix:expr, $($arg:tt)*) => {
        $logger.log_level($crate::logging::Level::Info, $prefix, format_args!($($arg)*))
    };
}

/// Log a debug line (grey) with prefix.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $prefix:expr, $($arg:tt)*) => {
        $logger.log_level($crate::logging::Level::Debug, $prefix, format_args!($($arg)*))
    };
}

/// Log a trace line, only if the prefix matches a trace filter.
#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $prefix:expr, $($arg:tt)*) => {
        $logger.log_level($crate::logging::Level::Trace, $prefix, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Capabilities, PlatformCall, SimPlatform};
    use crate::transport::MemoryTransport;

    fn logger_with(config: LoggerConfig) -> (Logger, MemoryTransport, Arc<SimPlatform>) {
        let capture = MemoryTransport::new();
        let platform = Arc::new(SimPlatform::new());
        let logger = Logger::new(capture.clone(), platform.clone(), config);
        (logger, capture, platform)
    }

    fn quiet() -> LoggerConfig {
        LoggerConfig {
            max_prefix_len: 8,
            interactive: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_line() {
        let (logger, capture, _) = logger_with(quiet());
        logger.log("hello");
        assert_eq!(capture.contents(), "hello\r\n");
    }

    #[test]
    fn test_prefix_and_indent() {
        let (logger, capture, _) = logger_with(quiet());
        logger.indent_up();
        logger.log_with_prefix("KNX", "up");
        assert_eq!(capture.contents(), "KNX:        up\r\n");
    }

    #[test]
    fn test_color_wraps_body() {
        let (logger, capture, _) = logger_with(quiet());
        logger.color(color::RED);
        logger.log("alarm");
        logger.color(color::NONE);
        logger.log("calm");
        assert_eq!(capture.contents(), "\x1B[31malarm\x1B[0m\r\ncalm\r\n");
    }

    #[test]
    fn test_colored_restores_previous_color() {
        let (logger, capture, _) = logger_with(quiet());
        logger.color(color::GREY);
        logger.log_colored(color::RED, "X", format_args!("boom"));
        assert_eq!(logger.current_color(), color::GREY);
        assert!(capture.contents().starts_with("\x1B[31mX:"));
    }

    #[test]
    fn test_indent_error_is_logged_not_applied() {
        let (logger, capture, _) = logger_with(quiet());
        logger.indent_down();
        assert_eq!(logger.indent(), 0);
        assert!(capture.contents().contains("Logger:   Indent error!"));

        capture.take();
        logger.set_indent(10);
        logger.indent_up();
        assert_eq!(logger.indent(), 10);
        assert!(capture.contents().contains("Indent error!"));
    }

    #[test]
    fn test_overflow_is_fatal() {
        let (logger, capture, platform) = logger_with(LoggerConfig {
            message_capacity: 8,
            ..quiet()
        });

        logger.log_values(format_args!("{}", "0123456789"));

        assert_eq!(capture.contents(), "0123456\r\n");
        assert_eq!(
            platform.calls(),
            vec![PlatformCall::FatalError {
                code: FATAL_SYSTEM,
                message: "BufferOverflow: increase message capacity".to_string(),
            }]
        );
    }

    #[test]
    fn test_prompt_is_erased_and_redrawn() {
        let (logger, capture, _) = logger_with(LoggerConfig {
            max_prefix_len: 8,
            ..Default::default()
        });

        logger.print_prompt("inf");
        assert_eq!(capture.take(), "\x1B[Kinf");

        logger.log("line");
        assert_eq!(capture.take(), "\x08\x08\x08\x1B[Kline\r\n\x1B[Kinf");
    }

    #[test]
    fn test_core_marker_on_dual_core() {
        let capture = MemoryTransport::new();
        let platform = Arc::new(SimPlatform::new().with_capabilities(Capabilities {
            dual_core: true,
            maintenance: false,
        }));
        let logger = Logger::new(
            capture.clone(),
            platform,
            LoggerConfig {
                show_core: true,
                ..quiet()
            },
        );

        logger.log("x");
        assert_eq!(capture.contents(), "0_> x\r\n");
    }

    #[test]
    fn test_trace_filters() {
        let (logger, capture, _) = logger_with(LoggerConfig {
            trace_filters: vec!["Dali".to_string()],
            ..quiet()
        });

        crate::log_trace!(logger, "Logic<3>", "hidden");
        assert_eq!(capture.contents(), "");

        crate::log_trace!(logger, "Dali<1>", "shown {}", 1);
        assert!(capture.contents().contains("shown 1"));
    }

    #[test]
    fn test_nested_block_does_not_deadlock() {
        let (logger, capture, _) = logger_with(quiet());
        let outer = logger.mutex_block();
        {
            let _inner = logger.mutex_block();
            logger.log("a");
        }
        logger.log("b");
        outer.unblock();
        assert_eq!(capture.contents(), "a\r\nb\r\n");
    }

    #[test]
    fn test_begin_end_scope_nests() {
        let (logger, capture, _) = logger_with(quiet());
        let scope = logger.begin();
        logger.log("inside");
        logger.mutex_block().unblock();
        scope.end();
        logger.log("after");
        assert_eq!(capture.contents(), "inside\r\nafter\r\n");
    }
}
