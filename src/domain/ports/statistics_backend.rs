use std::collections::BTreeMap;

use crate::domain::errors::StatisticsError;
use crate::domain::models::OutputVariable;

/// Destination of the end-of-run statistics row.
pub trait StatisticsBackend: Send + Sync {
    /// Write one row; `data` is keyed (and therefore ordered) by variable name.
    fn write_data(&self, data: &BTreeMap<String, OutputVariable>) -> Result<(), StatisticsError>;
}
