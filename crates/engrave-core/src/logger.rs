//! Minimal stderr logger for the batch pipeline.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

struct PipelineLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for PipelineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = writeln!(
            std::io::stderr(),
            "{:>5} +{:.3}s {}",
            record.level(),
            self.started.elapsed().as_secs_f64(),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<PipelineLogger> = OnceLock::new();

/// Install the pipeline logger. A no-op after the first successful call.
pub fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| PipelineLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}
