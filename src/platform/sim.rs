//! Simulated platform for host runs and tests.
//!
//! Every call is recorded instead of touching hardware. The execution
//! context is per thread, so a test can play "core 0" and "core 1" from two
//! threads.

use std::cell::Cell;
use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::{Capabilities, DeviceInfo, DirEntry, FlashLayout, Platform, PlatformError};
use crate::logging::ContextId;

thread_local! {
    static CONTEXT: Cell<ContextId> = const { Cell::new(ContextId::PRIMARY) };
}

/// A recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Restart,
    ToggleProgMode,
    FatalError { code: u8, message: String },
    TriggerSavePin,
    Save,
    Delay(u32),
    FormatFilesystem,
    EraseFlash { offset: u32, size: u32 },
    ResetToBootloader,
    EnterMaintenance,
}

pub struct SimPlatform {
    capabilities: Capabilities,
    info: DeviceInfo,
    layout: FlashLayout,
    files: BTreeMap<String, Vec<DirEntry>>,
    temperature: Option<f32>,
    real_delays: bool,
    calls: Mutex<Vec<PlatformCall>>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                dual_core: false,
                maintenance: true,
            },
            info: DeviceInfo {
                individual_address: 0x11FF,
                application_number: 0x00A6,
                application_version: 0x01,
                configured: true,
                firmware_number: 0xA600,
                firmware_version: 1 << 12,
                firmware_name: "SIM-KNX".to_string(),
                board: Some("Host simulator".to_string()),
            },
            layout: FlashLayout::default(),
            files: BTreeMap::new(),
            temperature: Some(27.5),
            real_delays: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    /// Sensor reading; `None` behaves like a chip without a sensor.
    pub fn with_temperature(mut self, celsius: Option<f32>) -> Self {
        self.temperature = celsius;
        self
    }

    /// Directory listing returned for `path` (paths end with `/`).
    pub fn with_directory(mut self, path: &str, entries: Vec<DirEntry>) -> Self {
        self.files.insert(path.to_string(), entries);
        self
    }

    /// Actually sleep in `delay` instead of only recording it.
    pub fn with_real_delays(mut self) -> Self {
        self.real_delays = true;
        self
    }

    /// Make the calling thread act as execution context `id`.
    pub fn enter_context(id: ContextId) {
        CONTEXT.with(|c| c.set(id));
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub fn take_calls(&self) -> Vec<PlatformCall> {
        core::mem::take(&mut *self.calls.lock())
    }

    pub fn restart_requested(&self) -> bool {
        self.calls.lock().contains(&PlatformCall::Restart)
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().push(call);
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SimPlatform {
    fn current_context(&self) -> ContextId {
        CONTEXT.with(|c| c.get())
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn flash_layout(&self) -> FlashLayout {
        self.layout
    }

    fn restart(&self) {
        self.record(PlatformCall::Restart);
    }

    fn toggle_prog_mode(&self) {
        self.record(PlatformCall::ToggleProgMode);
    }

    fn fatal_error(&self, code: u8, message: &str) {
        self.record(PlatformCall::FatalError {
            code,
            message: message.to_string(),
        });
    }

    fn trigger_save_pin(&self) {
        self.record(PlatformCall::TriggerSavePin);
    }

    fn save(&self) {
        self.record(PlatformCall::Save);
    }

    fn delay(&self, ms: u32) {
        self.record(PlatformCall::Delay(ms));
        if self.real_delays {
            std::thread::sleep(std::time::Duration::from_millis(ms as u64));
        }
    }

    fn free_memory(&self) -> u32 {
        180 * 1024
    }

    fn free_memory_min(&self) -> u32 {
        150 * 1024
    }

    fn cpu_temperature(&self) -> Option<f32> {
        self.temperature
    }

    fn unique_serial_number(&self) -> u32 {
        0x1234_ABCD
    }

    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, PlatformError> {
        if !self.capabilities.maintenance {
            return Err(PlatformError::Unsupported);
        }
        Ok(self.files.get(path).cloned().unwrap_or_default())
    }

    fn format_filesystem(&self) -> Result<(), PlatformError> {
        self.record(PlatformCall::FormatFilesystem);
        Ok(())
    }

    fn erase_flash(&self, offset: u32, size: u32) -> Result<(), PlatformError> {
        self.record(PlatformCall::EraseFlash { offset, size });
        Ok(())
    }

    fn reset_to_bootloader(&self) {
        self.record(PlatformCall::ResetToBootloader);
    }

    fn enter_maintenance(&self) {
        self.record(PlatformCall::EnterMaintenance);
    }
}
