//! Confirmation gate tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use knx_console::console::{CommandContext, Console, ConsoleConfig, Dispatch};
use knx_console::logging::{Logger, LoggerConfig};
use knx_console::platform::SimPlatform;
use knx_console::transport::MemoryTransport;
use knx_console::Module;

fn make_console() -> (Console, MemoryTransport) {
    let capture = MemoryTransport::new();
    let platform = Arc::new(SimPlatform::new());
    let logger = Arc::new(Logger::new(
        capture.clone(),
        platform.clone(),
        LoggerConfig {
            interactive: false,
            ..Default::default()
        },
    ));
    (Console::new(logger, platform, ConsoleConfig::default()), capture)
}

#[test]
fn test_confirmation_counts_down() {
    let (mut console, capture) = make_console();

    assert!(console.confirmation(b'y', 3, "nuke all"));
    assert!(capture.take().contains("repeat \"y\" 3x to trigger \"nuke all\""));

    console.process_byte(b'y');
    assert!(console.confirmation(b'y', 3, "nuke all"));
    assert!(capture.take().contains("repeat \"y\" 2x to trigger"));

    console.process_byte(b'y');
    assert!(console.confirmation(b'y', 3, "nuke all"));
    assert!(capture.take().contains("repeat \"y\" 1x to trigger"));

    console.process_byte(b'y');
    assert!(!console.confirmation(b'y', 3, "nuke all"));
    assert_eq!(capture.take(), "");
}

#[test]
fn test_other_byte_restarts_run() {
    let (mut console, capture) = make_console();

    console.process_byte(b'y');
    console.process_byte(b'y');
    console.process_byte(b'n');
    assert!(console.confirmation(b'y', 2, "restart"));
    assert!(capture.take().contains("repeat \"y\" 2x"));

    console.process_byte(b'y');
    console.process_byte(b'y');
    assert!(!console.confirmation(b'y', 2, "restart"));
}

#[test]
fn test_zero_repeats_never_blocks() {
    let (console, capture) = make_console();
    assert!(!console.confirmation(b'y', 0, "noop"));
    assert_eq!(capture.contents(), "");
}

#[test]
fn test_newlines_do_not_break_the_run() {
    let (mut console, capture) = make_console();

    for _ in 0..3 {
        console.process_byte(b'y');
        console.process_byte(b'\n');
    }
    capture.take();

    assert!(!console.confirmation(b'y', 3, "nuke all"));
    assert_eq!(capture.contents(), "");
}

/// Module with a destructive `wipe` command, confirmed by typing `y` lines.
struct Wiper {
    pending: bool,
    wipes: Arc<AtomicUsize>,
}

impl Module for Wiper {
    fn name(&self) -> &str {
        "Wiper"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn process_command(&mut self, cmd: &str, context: &CommandContext<'_>) -> bool {
        match cmd {
            "wipe" => {
                self.pending = context.confirmation(b'y', 3, "wipe");
                true
            }
            "y" if self.pending => {
                if !context.confirmation(b'y', 3, "wipe") {
                    self.pending = false;
                    self.wipes.fetch_add(1, Ordering::SeqCst);
                    context.logger().log_with_prefix("Wiper", "wiped");
                }
                true
            }
            _ => false,
        }
    }
}

fn type_line(console: &mut Console, line: &[u8]) -> Option<Dispatch> {
    let mut last = None;
    for byte in line.iter().chain(b"\n") {
        last = console.process_byte(*byte);
    }
    last
}

#[test]
fn test_module_confirms_over_typed_lines() {
    let (mut console, capture) = make_console();
    let wipes = Arc::new(AtomicUsize::new(0));
    console.register(Box::new(Wiper {
        pending: false,
        wipes: wipes.clone(),
    }));

    assert_eq!(type_line(&mut console, b"wipe"), Some(Dispatch::Module(0)));
    assert!(capture.take().contains("repeat \"y\" 3x to trigger \"wipe\""));

    type_line(&mut console, b"y");
    assert!(capture.take().contains("repeat \"y\" 2x to trigger \"wipe\""));

    type_line(&mut console, b"y");
    assert!(capture.take().contains("repeat \"y\" 1x to trigger \"wipe\""));
    assert_eq!(wipes.load(Ordering::SeqCst), 0);

    assert_eq!(type_line(&mut console, b"y"), Some(Dispatch::Module(0)));
    assert_eq!(wipes.load(Ordering::SeqCst), 1);
    let out = capture.take();
    assert!(out.contains("wiped"));
    assert!(!out.contains("repeat"));

    // Confirmed once; a further `y` is no longer the module's
    assert_eq!(type_line(&mut console, b"y"), Some(Dispatch::Unknown));
}

#[test]
fn test_other_key_between_lines_restarts_confirmation() {
    let (mut console, capture) = make_console();
    let wipes = Arc::new(AtomicUsize::new(0));
    console.register(Box::new(Wiper {
        pending: false,
        wipes: wipes.clone(),
    }));

    type_line(&mut console, b"wipe");
    type_line(&mut console, b"y");
    type_line(&mut console, b"y");
    capture.take();

    // "wipe" ends in `e`, so the run of `y` starts over
    type_line(&mut console, b"wipe");
    assert!(capture.take().contains("repeat \"y\" 3x"));
    assert_eq!(wipes.load(Ordering::SeqCst), 0);
}
