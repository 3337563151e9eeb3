//! Statistics backends
//!
//! - Console: one `name=value` line per variable
//! - CSV: one row per run appended to `<report_dir>/statistics.csv`

pub mod console;
pub mod csv;

pub use console::ConsoleStatisticsBackend;
pub use csv::CsvStatisticsBackend;

use crate::domain::models::{StatisticsBackendKind, StatisticsConfig};
use crate::domain::ports::StatisticsBackend;

/// Backend selected by the configuration, or `None` when statistics are off.
pub fn backend_from_config(config: &StatisticsConfig) -> Option<Box<dyn StatisticsBackend>> {
    match config.backend {
        StatisticsBackendKind::Console => Some(Box::new(ConsoleStatisticsBackend::stdout())),
        StatisticsBackendKind::Csv => Some(Box::new(CsvStatisticsBackend::new(&config.report_dir))),
        StatisticsBackendKind::None => None,
    }
}
