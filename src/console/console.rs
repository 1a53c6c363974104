//! Main console struct integrating all components

use std::sync::Arc;

use super::commands::{self, Builtin, COMMANDS};
use super::confirm::{CommandContext, RepeatCounter};
use super::erase;
use super::prompt::PromptBuffer;
use crate::log_error;
use crate::logging::{color, Logger};
use crate::module::Module;
use crate::platform::Platform;
use crate::transport::ByteSource;

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// Width of report banners and separator rules
pub const BANNER_WIDTH: usize = 80;

const BACKSPACE: u8 = 0x08;
const NEWLINE: u8 = b'\n';

/// Minimum `sleep` duration
const SLEEP_MS: u32 = 20_000;

/// Console configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Color of the report headlines
    pub headline_color: u8,
    /// Hardware watchdog period; `sleep` outlasts it so the watchdog can be tested.
    pub watchdog_max_period_ms: Option<u32>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            headline_color: color::BRIGHT_YELLOW,
            watchdog_max_period_ms: None,
        }
    }
}

/// Who handled a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Builtin(Builtin),
    /// Index of the module in registration order
    Module(usize),
    Unknown,
}

/// Console state machine
pub struct Console {
    prompt: PromptBuffer,
    repeats: RepeatCounter,
    modules: Vec<Box<dyn Module>>,
    logger: Arc<Logger>,
    platform: Arc<dyn Platform>,
    config: ConsoleConfig,
}

impl Console {
    /// Create new console
    pub fn new(logger: Arc<Logger>, platform: Arc<dyn Platform>, config: ConsoleConfig) -> Self {
        Self {
            prompt: PromptBuffer::new(),
            repeats: RepeatCounter::new(),
            modules: Vec::new(),
            logger,
            platform,
            config,
        }
    }

    /// Add a module; modules are asked in registration order.
    pub fn register(&mut self, module: Box<dyn Module>) {
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[Box<dyn Module>] {
        &self.modules
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Text typed so far
    pub fn prompt(&self) -> &str {
        self.prompt.as_str()
    }

    /// Process at most one pending input byte.
    ///
    /// Returns `true` if a byte was consumed.
    pub fn poll(&mut self, source: &mut dyn ByteSource) -> bool {
        match source.read_byte() {
            Some(byte) => {
                self.process_byte(byte);
                true
            }
            None => false,
        }
    }

    /// Process a single input byte
    ///
    /// Returns Some(dispatch) if a command line was completed.
    pub fn process_byte(&mut self, byte: u8) -> Option<Dispatch> {
        self.repeats.feed(byte);
        let mut dispatched = None;

        match byte {
            NEWLINE => {
                let line = self.prompt.as_str().to_owned();

                // Keep the submitted line in the scrollback, without a
                // stale prompt drawn under the command's output.
                self.logger.print_prompt("");
                self.logger.log(&line);

                if !line.is_empty() {
                    dispatched = Some(self.dispatch(&line));
                }
                self.prompt.clear();
            }
            BACKSPACE => self.prompt.backspace(),
            _ => {
                self.prompt.push(byte);
            }
        }

        self.logger.print_prompt(self.prompt.as_str());
        dispatched
    }

    /// Run a command line: built-ins first, then modules in order.
    pub fn dispatch(&mut self, cmd: &str) -> Dispatch {
        if let Some(descriptor) = commands::find(cmd, self.platform.capabilities()) {
            self.run(descriptor.command);
            return Dispatch::Builtin(descriptor.command);
        }

        let context = CommandContext::new(&self.logger, &self.repeats);
        if let Some(index) = self
            .modules
            .iter_mut()
            .position(|module| module.process_command(cmd, &context))
        {
            return Dispatch::Module(index);
        }

        self.logger.log_fmt("Console", format_args!("unknown command {}", cmd));
        Dispatch::Unknown
    }

    fn run(&self, command: Builtin) {
        match command {
            Builtin::Info => self.show_informations(),
            Builtin::Help => self.show_help(),
            Builtin::Prog => self.platform.toggle_prog_mode(),
            Builtin::Sleep => self.sleep(),
            Builtin::Restart => {
                self.platform.delay(20);
                self.platform.restart();
            }
            Builtin::Fatal => self.platform.fatal_error(5, "Test with 5x blinking"),
            Builtin::PowerLoss => self.platform.trigger_save_pin(),
            Builtin::Save => self.platform.save(),
            Builtin::Files => self.show_filesystem(),
            Builtin::Bootloader => self.platform.reset_to_bootloader(),
            Builtin::Nuke(mode) => erase::erase(mode, &self.logger, self.platform.as_ref()),
        }
    }

    /// See [`CommandContext::confirmation`].
    pub fn confirmation(&self, key: u8, repeats: u8, action: &str) -> bool {
        CommandContext::new(&self.logger, &self.repeats).confirmation(key, repeats, action)
    }

    pub fn sleep_time(&self) -> u32 {
        match self.config.watchdog_max_period_ms {
            Some(period) => period.saturating_add(1).max(SLEEP_MS),
            None => SLEEP_MS,
        }
    }

    pub fn sleep(&self) {
        self.logger.log("sleep up to 20 seconds");
        self.platform.delay(self.sleep_time());
    }

    fn headline(&self, title: &str) {
        self.logger.color(self.config.headline_color);
        self.logger.log(&banner(title));
        self.logger.color(color::NONE);
    }

    /// Device and module information report
    pub fn show_informations(&self) {
        let logger = &*self.logger;
        let _block = logger.mutex_block();
        let info = self.platform.device_info();
        let caps = self.platform.capabilities();
        let rule = rule();

        logger.log("");
        self.headline("Information");
        logger.log_fmt("KNX Address", format_args!("{}", info.human_individual_address()));
        logger.log_fmt(
            "Application (ETS)",
            format_args!(
                "Number: {}  Version: {}  Configured: {}",
                info.human_application_number(),
                info.human_application_version(),
                info.configured as u8
            ),
        );
        logger.log_fmt(
            "Firmware",
            format_args!(
                "Number: {}  Version: {}  Name: {}",
                info.human_firmware_number(),
                info.human_firmware_version(),
                info.firmware_name
            ),
        );
        logger.log_fmt(
            "Serial number",
            format_args!("00FA:{:08X}", self.platform.unique_serial_number()),
        );
        if let Some(board) = &info.board {
            logger.log_fmt("Board", format_args!("{}", board));
        }

        let cpu_mode = if caps.dual_core { "Dual-Core" } else { "Single-Core" };
        match self.platform.cpu_temperature() {
            Some(temp) => logger.log_fmt(
                "CPU-Mode",
                format_args!("{} (Temperature {:.1} °C)", cpu_mode, temp),
            ),
            None => logger.log_fmt("CPU-Mode", format_args!("{}", cpu_mode)),
        }
        logger.log_fmt(
            "Free memory",
            format_args!(
                "{:.2} KiB (min. {:.2} KiB)",
                self.platform.free_memory() as f32 / 1024.0,
                self.platform.free_memory_min() as f32 / 1024.0
            ),
        );

        logger.log(&rule);
        logger.log_fmt("Module", format_args!("Console"));
        logger.log_fmt("Version", format_args!("{}", env!("CARGO_PKG_VERSION")));
        for module in &self.modules {
            logger.log(&rule);
            logger.log_fmt("Module", format_args!("{}", module.name()));
            logger.log_fmt("Version", format_args!("{}", module.version()));
            module.show_informations(logger);
        }
        logger.log(&rule);
        logger.log("");
    }

    /// Command overview, built-ins followed by each module's commands
    pub fn show_help(&self) {
        let logger = &*self.logger;
        let _block = logger.mutex_block();
        let caps = self.platform.capabilities();

        logger.log("");
        self.headline("Help");
        for command in COMMANDS.iter().filter(|c| c.available(caps)) {
            print_help_line(logger, command.name, command.brief);
        }
        logger.log("");

        for module in &self.modules {
            module.show_help(logger);
            logger.log("");
        }
    }

    /// Recursive listing of the data filesystem
    pub fn show_filesystem(&self) {
        let _block = self.logger.mutex_block();
        self.logger.log("");
        self.headline("Filesystem");
        self.show_filesystem_directory("/");
    }

    fn show_filesystem_directory(&self, path: &str) {
        let logger = &*self.logger;
        logger.log_fmt("Filesystem", format_args!("{}", path));

        let entries = match self.platform.list_directory(path) {
            Ok(entries) => entries,
            Err(err) => {
                log_error!(logger, "Filesystem", "{}: {}", path, err);
                return;
            }
        };

        for entry in entries {
            let full = format!("{}{}", path, entry.name);
            if entry.is_dir {
                self.show_filesystem_directory(&format!("{}/", full));
            } else {
                logger.log_fmt("Filesystem", format_args!("{} ({} bytes)", full, entry.size));
            }
        }
    }

    /// Print welcome banner
    pub fn print_banner(&self) {
        self.logger.log(VERSION);
        self.logger.log("Type 'help' for commands.");
        self.logger.print_prompt(self.prompt.as_str());
    }
}

/// `| command | description |` row of the help report.
pub fn print_help_line(logger: &Logger, command: &str, description: &str) {
    logger.log_values(format_args!("| {} | {} |", command, description));
}

/// `════ title ════` padded to BANNER_WIDTH columns.
pub fn banner(title: &str) -> String {
    const LEAD: usize = 24;
    let tail = BANNER_WIDTH.saturating_sub(LEAD + title.chars().count() + 2);
    format!("{} {} {}", "═".repeat(LEAD), title, "═".repeat(tail))
}

/// Separator between report sections
pub fn rule() -> String {
    "─".repeat(BANNER_WIDTH)
}
