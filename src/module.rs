//! Firmware modules as seen by the console.
//!
//! Modules are registered with the console in a fixed order. The console
//! offers them every command it does not know itself, and asks them for
//! their section of the `info` and `help` reports.

use crate::console::CommandContext;
use crate::logging::Logger;

pub trait Module: Send {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Try to handle `cmd`. Returns `true` if the command was consumed.
    ///
    /// Output goes through `context.logger()`; destructive commands can ask
    /// the operator first with `context.confirmation(..)`.
    fn process_command(&mut self, cmd: &str, context: &CommandContext<'_>) -> bool {
        let _ = (cmd, context);
        false
    }

    /// Module-specific lines for the `info` report.
    fn show_informations(&self, logger: &Logger) {
        let _ = logger;
    }

    /// Module-specific rows for the `help` report (see [`crate::console::print_help_line`]).
    fn show_help(&self, logger: &Logger) {
        let _ = logger;
    }
}
