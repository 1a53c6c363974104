//! `log` facade bridge.
//!
//! Lets drivers and libraries use `log::info!` and friends; their records
//! end up in the same envelope as console output, with the record target as
//! prefix.

use std::sync::Arc;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use super::Logger;

struct LogBridge {
    logger: Arc<Logger>,
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() != Level::Trace || self.logger.trace_enabled(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.logger.log_level(record.level(), record.target(), *record.args());
    }

    fn flush(&self) {
        self.logger.flush();
    }
}

/// Register `logger` as the global `log` backend.
pub fn install(logger: Arc<Logger>, max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge { logger })).map(|()| log::set_max_level(max_level))
}
