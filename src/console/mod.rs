//! Serial debug console
//!
//! Polled from the firmware main loop - no dedicated task.
//! One byte per poll, exact-match commands, no argument parsing.

pub mod console;
pub mod commands;
pub mod confirm;
pub mod erase;
pub mod prompt;

pub use commands::{command_names, find, Builtin, CommandDescriptor, COMMANDS};
pub use confirm::{CommandContext, RepeatCounter};
pub use console::{banner, print_help_line, rule, Console, ConsoleConfig, Dispatch, VERSION};
pub use erase::EraseMode;
pub use prompt::{PromptBuffer, PROMPT_SIZE};
