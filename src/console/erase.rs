//! `nuke` commands: irreversible erase of persistent regions.
//!
//! Always ends with a restart; the device must not keep running on top of
//! the state it just destroyed.

use crate::log_error;
use crate::logging::Logger;
use crate::platform::{Platform, PlatformError, FIRMWARE_HEAD_SIZE};

/// Persistent region targeted by an erase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    /// KNX stack parameters (ETS programming)
    KnxFlash,
    /// Module data owned by the firmware
    OpenKnxFlash,
    /// Data filesystem
    Filesystem,
    /// All of the above plus the head of the firmware image
    All,
}

impl EraseMode {
    /// Whether erasing `self` includes `region`
    pub fn covers(self, region: EraseMode) -> bool {
        self == EraseMode::All || self == region
    }
}

/// Erase the regions selected by `mode`, then restart.
pub fn erase(mode: EraseMode, logger: &Logger, platform: &dyn Platform) {
    platform.enter_maintenance();
    let layout = platform.flash_layout();

    if mode.covers(EraseMode::KnxFlash) {
        logger.log_fmt(
            "Erase",
            format_args!("KNX_FLASH ({} -> {})", layout.knx_offset, layout.knx_size),
        );
        check(logger, platform.erase_flash(layout.knx_offset, layout.knx_size));
    }

    if mode.covers(EraseMode::OpenKnxFlash) {
        logger.log_fmt(
            "Erase",
            format_args!("OPENKNX_FLASH ({} -> {})", layout.openknx_offset, layout.openknx_size),
        );
        check(logger, platform.erase_flash(layout.openknx_offset, layout.openknx_size));
    }

    if mode.covers(EraseMode::Filesystem) {
        logger.log_with_prefix("Erase", "Format Filesystem");
        check(logger, platform.format_filesystem());
    }

    if mode == EraseMode::All {
        logger.log_with_prefix("Erase", "First bytes of Firmware");
        check(logger, platform.erase_flash(0, FIRMWARE_HEAD_SIZE));
    }

    logger.log("Done");
    platform.delay(1000);
    logger.log("Restart device");
    platform.delay(100);
    platform.restart();
}

fn check(logger: &Logger, result: Result<(), PlatformError>) {
    if let Err(err) = result {
        log_error!(logger, "Erase", "{}", err);
    }
}
