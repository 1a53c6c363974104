//! ESP-IDF platform.
//!
//! Hardware queries go straight to ESP-IDF. KNX-stack actions (prog mode,
//! save, save pin) are owned by the firmware and injected as [`KnxHooks`].

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::sys as esp_idf_sys;
use esp_idf_svc::sys::soc_periph_temperature_sensor_clk_src_t_TEMPERATURE_SENSOR_CLK_SRC_DEFAULT as TEMP_CLK_SRC_DEFAULT;
use parking_lot::Mutex;

use super::{Capabilities, DeviceInfo, DirEntry, FlashLayout, Platform, PlatformError};
use crate::logging::ContextId;

/// Callbacks into the KNX stack.
#[derive(Clone, Copy)]
pub struct KnxHooks {
    pub toggle_prog_mode: fn(),
    pub save: fn(),
    pub trigger_save_pin: fn(),
    /// Stop KNX traffic and switch LEDs before an erase.
    pub stop_knx: fn(),
    /// Signal a fatal error (LED blink code). Called before the halt loop.
    pub fatal: fn(u8, &str),
}

impl Default for KnxHooks {
    fn default() -> Self {
        fn noop() {}
        fn fatal_noop(_: u8, _: &str) {}
        Self {
            toggle_prog_mode: noop,
            save: noop,
            trigger_save_pin: noop,
            stop_knx: noop,
            fatal: fatal_noop,
        }
    }
}

/// On-die temperature sensor, installed on first use.
struct TempSensor(esp_idf_sys::temperature_sensor_handle_t);

// SAFETY: the handle is only used behind the platform's mutex
unsafe impl Send for TempSensor {}

impl TempSensor {
    fn install() -> Option<Self> {
        let config = esp_idf_sys::temperature_sensor_config_t {
            range_min: -10,
            range_max: 80,
            clk_src: TEMP_CLK_SRC_DEFAULT,
            ..Default::default()
        };
        let mut handle = core::ptr::null_mut();

        unsafe {
            let err = esp_idf_sys::temperature_sensor_install(&config, &mut handle);
            if err != esp_idf_sys::ESP_OK {
                return None;
            }
            if esp_idf_sys::temperature_sensor_enable(handle) != esp_idf_sys::ESP_OK {
                esp_idf_sys::temperature_sensor_uninstall(handle);
                return None;
            }
        }
        Some(Self(handle))
    }

    fn celsius(&self) -> Option<f32> {
        let mut celsius = 0.0f32;
        let err = unsafe { esp_idf_sys::temperature_sensor_get_celsius(self.0, &mut celsius) };
        (err == esp_idf_sys::ESP_OK).then_some(celsius)
    }
}

impl Drop for TempSensor {
    fn drop(&mut self) {
        unsafe {
            esp_idf_sys::temperature_sensor_disable(self.0);
            esp_idf_sys::temperature_sensor_uninstall(self.0);
        }
    }
}

pub struct EspPlatform {
    info: DeviceInfo,
    layout: FlashLayout,
    hooks: KnxHooks,
    /// VFS mount point of the data filesystem.
    fs_root: &'static str,
    temp_sensor: Mutex<Option<TempSensor>>,
}

impl EspPlatform {
    pub fn new(info: DeviceInfo, hooks: KnxHooks) -> Self {
        Self {
            info,
            layout: FlashLayout::default(),
            hooks,
            fs_root: "/storage",
            temp_sensor: Mutex::new(None),
        }
    }

    pub fn with_flash_layout(mut self, layout: FlashLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_fs_root(mut self, root: &'static str) -> Self {
        self.fs_root = root;
        self
    }

    fn fs_path(&self, path: &str) -> String {
        format!("{}{}", self.fs_root, path)
    }
}

impl Platform for EspPlatform {
    fn current_context(&self) -> ContextId {
        // Core executing the caller, not the core its task is pinned to
        let core = unsafe { esp_idf_sys::xPortGetCoreID() };
        ContextId::from_core(core).unwrap_or(ContextId::PRIMARY)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            dual_core: esp_idf_sys::portNUM_PROCESSORS > 1,
            maintenance: true,
        }
    }

    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn flash_layout(&self) -> FlashLayout {
        self.layout
    }

    fn restart(&self) {
        unsafe {
            esp_idf_sys::esp_restart();
        }
    }

    fn toggle_prog_mode(&self) {
        (self.hooks.toggle_prog_mode)();
    }

    fn fatal_error(&self, code: u8, message: &str) {
        (self.hooks.fatal)(code, message);
        loop {
            FreeRtos::delay_ms(1000);
        }
    }

    fn trigger_save_pin(&self) {
        (self.hooks.trigger_save_pin)();
    }

    fn save(&self) {
        (self.hooks.save)();
    }

    fn delay(&self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn free_memory(&self) -> u32 {
        unsafe { esp_idf_sys::esp_get_free_heap_size() }
    }

    fn free_memory_min(&self) -> u32 {
        unsafe { esp_idf_sys::esp_get_minimum_free_heap_size() }
    }

    fn cpu_temperature(&self) -> Option<f32> {
        let mut sensor = self.temp_sensor.lock();
        if sensor.is_none() {
            *sensor = TempSensor::install();
        }
        sensor.as_ref()?.celsius()
    }

    fn unique_serial_number(&self) -> u32 {
        let mut mac = [0u8; 6];
        let err = unsafe { esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
        if err != esp_idf_sys::ESP_OK {
            return 0;
        }
        u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]])
    }

    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, PlatformError> {
        let dir = std::fs::read_dir(self.fs_path(path)).map_err(io_error)?;

        let mut entries = Vec::new();
        for entry in dir.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.metadata() {
                Ok(meta) if meta.is_dir() => entries.push(DirEntry::dir(name)),
                Ok(meta) => entries.push(DirEntry::file(name, meta.len() as u32)),
                Err(_) => {}
            }
        }
        Ok(entries)
    }

    fn format_filesystem(&self) -> Result<(), PlatformError> {
        let root = std::fs::read_dir(self.fs_root).map_err(io_error)?;

        for entry in root.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            result.map_err(io_error)?;
        }
        Ok(())
    }

    fn erase_flash(&self, offset: u32, size: u32) -> Result<(), PlatformError> {
        // SAFETY: null chip selects the default (main) flash chip
        let err =
            unsafe { esp_idf_sys::esp_flash_erase_region(core::ptr::null_mut(), offset, size) };
        if err != esp_idf_sys::ESP_OK {
            return Err(PlatformError::Flash(err));
        }
        Ok(())
    }

    fn reset_to_bootloader(&self) {
        // ESP32-S3 supports forcing download boot via RTC register
        // RTC_CNTL_OPTION1_REG = 0x6000_8128, RTC_CNTL_FORCE_DOWNLOAD_BOOT = BIT(0)
        const RTC_CNTL_OPTION1_REG: u32 = 0x6000_8128;
        const RTC_CNTL_FORCE_DOWNLOAD_BOOT: u32 = 1;

        unsafe {
            core::ptr::write_volatile(
                RTC_CNTL_OPTION1_REG as *mut u32,
                RTC_CNTL_FORCE_DOWNLOAD_BOOT,
            );
            esp_idf_sys::esp_restart();
        }
    }

    fn enter_maintenance(&self) {
        (self.hooks.stop_knx)();
        // Erasing and formatting can outlast the task watchdog period.
        // Not being subscribed (ESP_ERR_NOT_FOUND) is fine.
        unsafe {
            esp_idf_sys::esp_task_wdt_delete(core::ptr::null_mut());
        }
    }
}

fn io_error(err: std::io::Error) -> PlatformError {
    PlatformError::Flash(err.raw_os_error().unwrap_or(-1))
}
