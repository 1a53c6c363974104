//! Built-in command table

use super::erase::EraseMode;
use crate::platform::Capabilities;

/// Built-in console commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Info,
    Help,
    Prog,
    Sleep,
    Restart,
    Fatal,
    PowerLoss,
    Save,
    Files,
    Bootloader,
    Nuke(EraseMode),
}

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    /// Short form accepted in addition to `name`
    pub alias: Option<&'static str>,
    pub brief: &'static str,
    pub command: Builtin,
    /// Needs filesystem/flash maintenance support
    pub maintenance: bool,
}

impl CommandDescriptor {
    /// Exact, case-sensitive match on name or alias
    pub fn matches(&self, cmd: &str) -> bool {
        self.name == cmd || self.alias == Some(cmd)
    }

    pub fn available(&self, caps: Capabilities) -> bool {
        !self.maintenance || caps.maintenance
    }
}

const fn cmd(name: &'static str, brief: &'static str, command: Builtin) -> CommandDescriptor {
    CommandDescriptor {
        name,
        alias: None,
        brief,
        command,
        maintenance: false,
    }
}

const fn aliased(
    name: &'static str,
    alias: &'static str,
    brief: &'static str,
    command: Builtin,
) -> CommandDescriptor {
    CommandDescriptor {
        alias: Some(alias),
        ..cmd(name, brief, command)
    }
}

const fn maintenance(
    name: &'static str,
    brief: &'static str,
    command: Builtin,
) -> CommandDescriptor {
    CommandDescriptor {
        maintenance: true,
        ..cmd(name, brief, command)
    }
}

/// All built-in commands, in help order
pub static COMMANDS: &[CommandDescriptor] = &[
    aliased("help", "h", "Show this help", Builtin::Help),
    aliased("info", "i", "Show device information", Builtin::Info),
    maintenance("files", "Show files", Builtin::Files),
    cmd("restart", "Restart the device", Builtin::Restart),
    cmd("prog", "Toggle the ProgMode", Builtin::Prog),
    cmd("save", "Save data in Flash", Builtin::Save),
    cmd("sleep", "Sleep for up to 20 seconds", Builtin::Sleep),
    cmd("fatal", "Trigger a FatalError", Builtin::Fatal),
    cmd("powerloss", "Trigger a powerloss (SavePin)", Builtin::PowerLoss),
    maintenance("nuke knx", "Erase knx parameters", Builtin::Nuke(EraseMode::KnxFlash)),
    maintenance(
        "nuke openknx",
        "Erase openknx module data",
        Builtin::Nuke(EraseMode::OpenKnxFlash),
    ),
    maintenance("nuke files", "Erase filesystem", Builtin::Nuke(EraseMode::Filesystem)),
    maintenance("nuke all", "Erase all", Builtin::Nuke(EraseMode::All)),
    maintenance("bootloader", "Reset into Bootloader Mode", Builtin::Bootloader),
];

/// Look up a built-in available on hardware with `caps`
pub fn find(cmd: &str, caps: Capabilities) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|c| c.available(caps) && c.matches(cmd))
}

/// Names of the built-ins available on hardware with `caps`
pub fn command_names(caps: Capabilities) -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().filter(move |c| c.available(caps)).map(|c| c.name)
}
