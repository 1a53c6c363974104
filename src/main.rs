//! knx-console - Main entry point
//!
//! On the device: UART0 console polled from the main task.
//! On the host: stdin/stdout against the simulated platform.

use std::sync::Arc;

use knx_console::logging::{self, Logger, LoggerConfig};
use knx_console::{Console, ConsoleConfig};

#[cfg(target_os = "espidf")]
fn main() -> Result<(), esp_idf_svc::sys::EspError> {
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::AnyIOPin;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use knx_console::platform::{DeviceInfo, EspPlatform, KnxHooks};
    use knx_console::transport::{UartConfig, UartTransport};

    esp_idf_svc::sys::link_patches();

    let peripherals = Peripherals::take()?;
    let uart_config = UartConfig::default();

    // SAFETY: the console pins are reserved for UART0 and used nowhere else
    let (tx, rx) = unsafe {
        (
            AnyIOPin::new(uart_config.tx_pin as i32),
            AnyIOPin::new(uart_config.rx_pin as i32),
        )
    };
    let uart = UartTransport::new(peripherals.uart0, tx, rx, &uart_config)?;

    let platform = Arc::new(EspPlatform::new(DeviceInfo::default(), KnxHooks::default()));
    let logger = Arc::new(Logger::new(
        uart.clone(),
        platform.clone(),
        LoggerConfig {
            show_core: true,
            ..Default::default()
        },
    ));
    if logging::install(logger.clone(), log::LevelFilter::Info).is_err() {
        logger.log_with_prefix("Console", "log facade already installed");
    }

    let mut console = Console::new(logger, platform, ConsoleConfig::default());
    console.print_banner();

    let mut input = uart;
    loop {
        if !console.poll(&mut input) {
            FreeRtos::delay_ms(10);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use knx_console::platform::SimPlatform;
    use knx_console::transport::{StdinSource, StdoutTransport};

    let platform = Arc::new(SimPlatform::new().with_real_delays());
    let logger = Arc::new(Logger::new(StdoutTransport, platform.clone(), LoggerConfig::default()));
    if logging::install(logger.clone(), log::LevelFilter::Debug).is_err() {
        logger.log_with_prefix("Console", "log facade already installed");
    }

    let mut console = Console::new(logger, platform.clone(), ConsoleConfig::default());
    console.print_banner();
    log::debug!(target: "Host", "simulated platform ready");

    let mut input = StdinSource::spawn();
    while !platform.restart_requested() {
        if !console.poll(&mut input) {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }
}
