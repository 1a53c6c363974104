//! # knx-console
//!
//! Serial debug console and line logger for KNX device firmware.
//!
//! ## Architecture
//!
//! ```text
//! UART RX ──▶ Console ──▶ built-ins / modules ──▶ Logger ──▶ UART TX
//!             (prompt)                            (lock, per-core color/indent)
//! ```
//!
//! - The console turns bytes into command lines and dispatches them
//! - The logger owns the output; every line is rendered under one reentrant lock
//! - Hardware and KNX stack access goes through [`platform::Platform`]

pub mod console;
pub mod logging;
pub mod module;
pub mod platform;
pub mod transport;

pub use console::{Console, ConsoleConfig, Dispatch};
pub use logging::{Logger, LoggerConfig};
pub use module::Module;
pub use platform::Platform;
