//! Byte transports for the debug console.
//!
//! The logger writes through a [`Transport`], the console reads through a
//! [`ByteSource`]. On the device both are UART0; on the host they are stdio.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32-S3 UART0 TX (GPIO43) ──────▶ USB-UART RX
//! ESP32-S3 UART0 RX (GPIO44) ◀────── USB-UART TX
//!                                     └─▶ PC Serial Monitor
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartDriver};

/// Output side of the debug link.
pub trait Transport: Send {
    /// Write raw bytes. Failures are dropped: there is nowhere left to report them.
    fn write(&mut self, data: &[u8]);

    fn flush(&mut self) {}
}

/// Input side of the debug link.
pub trait ByteSource {
    /// Next received byte, `None` if nothing is pending.
    fn read_byte(&mut self) -> Option<u8>;
}

/// UART configuration for the debug console.
pub struct UartConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
    pub rx_pin: u8,
}

impl Default for UartConfig {
    fn default() -> Self {
        #[cfg(feature = "esp32p4")]
        let (tx_pin, rx_pin) = (37, 38);
        #[cfg(not(feature = "esp32p4"))]
        let (tx_pin, rx_pin) = (43, 44);

        Self {
            baud_rate: 115200,
            tx_pin,
            rx_pin,
        }
    }
}

/// In-memory transport.
///
/// Clones share the same buffer, so one clone can be handed to the logger
/// while another inspects what was written.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    /// Return and forget everything written so far.
    pub fn take(&self) -> String {
        let bytes = core::mem::take(&mut *self.buf.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, data: &[u8]) {
        self.buf.lock().extend_from_slice(data);
    }
}

/// Pre-recorded input, consumed front to back.
#[derive(Default)]
pub struct ScriptedInput {
    bytes: VecDeque<u8>,
}

impl ScriptedInput {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.iter().copied().collect(),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.bytes.extend(bytes.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ByteSource for ScriptedInput {
    fn read_byte(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }
}

/// Host stdout.
#[cfg(not(target_os = "espidf"))]
pub struct StdoutTransport;

#[cfg(not(target_os = "espidf"))]
impl Transport for StdoutTransport {
    fn write(&mut self, data: &[u8]) {
        use std::io::Write;
        let _ = std::io::stdout().write_all(data);
    }

    fn flush(&mut self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

/// Host stdin, read on a helper thread so polling never blocks.
#[cfg(not(target_os = "espidf"))]
pub struct StdinSource {
    rx: std::sync::mpsc::Receiver<u8>,
}

#[cfg(not(target_os = "espidf"))]
impl StdinSource {
    pub fn spawn() -> Self {
        use std::io::Read;

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            for byte in std::io::stdin().bytes() {
                match byte {
                    Ok(b) if tx.send(b).is_ok() => {}
                    _ => break,
                }
            }
        });
        Self { rx }
    }
}

#[cfg(not(target_os = "espidf"))]
impl ByteSource for StdinSource {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }
}

/// UART0 driver shared by logger output and console input.
#[cfg(target_os = "espidf")]
#[derive(Clone)]
pub struct UartTransport {
    driver: Arc<UartDriver<'static>>,
}

// SAFETY: the ESP-IDF UART driver serializes access internally; the logger
// additionally only writes while holding its output lock.
#[cfg(target_os = "espidf")]
unsafe impl Send for UartTransport {}

#[cfg(target_os = "espidf")]
impl UartTransport {
    /// Initialize UART0 for the debug console.
    pub fn new(
        uart: impl Peripheral<P = uart::UART0> + 'static,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'static,
        rx_pin: impl Peripheral<P = impl gpio::InputPin> + 'static,
        config: &UartConfig,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let uart_config = uart::config::Config::default()
            .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

        let driver = UartDriver::new(
            uart,
            tx_pin,
            rx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &uart_config,
        )?;

        Ok(Self {
            driver: Arc::new(driver),
        })
    }
}

#[cfg(target_os = "espidf")]
impl Transport for UartTransport {
    fn write(&mut self, data: &[u8]) {
        let _ = self.driver.write(data);
    }

    fn flush(&mut self) {
        let _ = self.driver.wait_tx_done(esp_idf_svc::hal::delay::BLOCK);
    }
}

#[cfg(target_os = "espidf")]
impl ByteSource for UartTransport {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.driver.read(&mut byte, esp_idf_svc::hal::delay::NON_BLOCK) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
