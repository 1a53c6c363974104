//! Hardware and KNX stack collaborators.
//!
//! The console and logger never touch registers directly. Everything that
//! restarts, erases, blinks or measures goes through [`Platform`].
//! Business logic stays in console/logging, the platform is just I/O.

use core::fmt;

use crate::logging::ContextId;

#[cfg(target_os = "espidf")]
pub mod esp;
#[cfg(not(target_os = "espidf"))]
pub mod sim;

#[cfg(target_os = "espidf")]
pub use esp::{EspPlatform, KnxHooks};
#[cfg(not(target_os = "espidf"))]
pub use sim::{PlatformCall, SimPlatform};

/// Fatal error code for system-level misconfiguration.
pub const FATAL_SYSTEM: u8 = 2;

/// Identity of the running device, shown by `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// KNX individual address, raw 16 bit.
    pub individual_address: u16,
    pub application_number: u16,
    /// Application version as programmed by ETS (major in the high nibble).
    pub application_version: u8,
    pub configured: bool,
    pub firmware_number: u16,
    /// Firmware version, major.minor.revision packed as 4.6.6 bits.
    pub firmware_version: u16,
    pub firmware_name: String,
    pub board: Option<String>,
}

impl DeviceInfo {
    /// Individual address as `area.line.device`.
    pub fn human_individual_address(&self) -> String {
        let a = self.individual_address;
        format!("{}.{}.{}", a >> 12, (a >> 8) & 0x0F, a & 0xFF)
    }

    pub fn human_application_number(&self) -> String {
        format!("0x{:04X}", self.application_number)
    }

    pub fn human_application_version(&self) -> String {
        format!("{}.{}", self.application_version >> 4, self.application_version & 0x0F)
    }

    pub fn human_firmware_number(&self) -> String {
        format!("0x{:04X}", self.firmware_number)
    }

    pub fn human_firmware_version(&self) -> String {
        let v = self.firmware_version;
        format!("{}.{}.{}", (v >> 12) & 0x0F, (v >> 6) & 0x3F, v & 0x3F)
    }
}

/// Flash regions that `nuke` may erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    pub knx_offset: u32,
    pub knx_size: u32,
    pub openknx_offset: u32,
    pub openknx_size: u32,
}

/// Bytes at the start of flash wiped by `nuke all` to invalidate the firmware.
pub const FIRMWARE_HEAD_SIZE: u32 = 4096;

impl Default for FlashLayout {
    fn default() -> Self {
        Self {
            knx_offset: 0x0030_0000,
            knx_size: 0x0001_0000,
            openknx_offset: 0x0031_0000,
            openknx_size: 0x0001_0000,
        }
    }
}

/// Feature flags of the hardware the firmware runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Second core is running firmware code (enables core markers).
    pub dual_core: bool,
    /// Filesystem, bootloader entry and flash erase are available.
    pub maintenance: bool,
}

/// One filesystem directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u32,
}

impl DirEntry {
    pub fn file(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// Platform operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// P01: operation not available on this hardware
    Unsupported,
    /// P02: flash erase or filesystem format failed
    Flash(i32),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "P01: not supported"),
            Self::Flash(code) => write!(f, "P02: flash error {}", code),
        }
    }
}

/// Everything the console and logger need from the device.
pub trait Platform: Send + Sync {
    /// Execution context (core) of the caller.
    fn current_context(&self) -> ContextId;

    fn capabilities(&self) -> Capabilities;

    fn device_info(&self) -> DeviceInfo;

    fn flash_layout(&self) -> FlashLayout {
        FlashLayout::default()
    }

    fn restart(&self);

    fn toggle_prog_mode(&self);

    /// Enter the fatal error state, blinking `code` times.
    ///
    /// On the device this does not return.
    fn fatal_error(&self, code: u8, message: &str);

    /// Behave as if the supply voltage dropped (fires the save pin handler).
    fn trigger_save_pin(&self);

    /// Persist in-memory state to flash.
    fn save(&self);

    fn delay(&self, ms: u32);

    /// Free heap in bytes.
    fn free_memory(&self) -> u32;

    /// Lowest free heap seen since boot.
    fn free_memory_min(&self) -> u32;

    /// Die temperature in °C, if the chip has a sensor.
    fn cpu_temperature(&self) -> Option<f32>;

    fn unique_serial_number(&self) -> u32;

    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, PlatformError>;

    fn format_filesystem(&self) -> Result<(), PlatformError>;

    fn erase_flash(&self, offset: u32, size: u32) -> Result<(), PlatformError>;

    fn reset_to_bootloader(&self);

    /// Quiesce the device before a destructive operation. Stops KNX
    /// traffic (LEDs switch with it) and takes the caller off the task
    /// watchdog so a long erase does not reset the device.
    fn enter_maintenance(&self) {}
}
