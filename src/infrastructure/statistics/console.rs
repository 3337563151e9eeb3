use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::domain::errors::StatisticsError;
use crate::domain::models::OutputVariable;
use crate::domain::ports::StatisticsBackend;

/// Dumps output variables as `name=value` lines.
pub struct ConsoleStatisticsBackend {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleStatisticsBackend {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl std::fmt::Debug for ConsoleStatisticsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleStatisticsBackend").finish_non_exhaustive()
    }
}

impl StatisticsBackend for ConsoleStatisticsBackend {
    fn write_data(&self, data: &BTreeMap<String, OutputVariable>) -> Result<(), StatisticsError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("console writer lock poisoned"))?;
        for (name, variable) in data {
            writeln!(writer, "{name}={}", variable.value())?;
        }
        writer.flush()?;
        Ok(())
    }
}
