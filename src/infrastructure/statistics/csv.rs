use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::errors::StatisticsError;
use crate::domain::models::OutputVariable;
use crate::domain::ports::StatisticsBackend;

const FILE_NAME: &str = "statistics.csv";

/// Appends one row per run to `<report_dir>/statistics.csv`.
///
/// The header (the sorted variable names) is written when the file is
/// created. Later runs append rows without checking that their columns match.
#[derive(Debug, Clone)]
pub struct CsvStatisticsBackend {
    report_dir: PathBuf,
}

impl CsvStatisticsBackend {
    pub fn new(report_dir: impl AsRef<Path>) -> Self {
        Self {
            report_dir: report_dir.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.report_dir.join(FILE_NAME)
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    fields.map(escape).collect::<Vec<_>>().join(",")
}

impl StatisticsBackend for CsvStatisticsBackend {
    fn write_data(&self, data: &BTreeMap<String, OutputVariable>) -> Result<(), StatisticsError> {
        fs::create_dir_all(&self.report_dir)?;
        let path = self.file_path();
        let is_new = !path.exists();

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            writeln!(file, "{}", row(data.keys().map(String::as_str)))?;
        }
        let values: Vec<String> = data.values().map(|v| v.value().to_string()).collect();
        writeln!(file, "{}", row(values.iter().map(String::as_str)))?;

        tracing::info!(path = %path.display(), columns = data.len(), "Statistics written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(values: &[(&str, &str)]) -> BTreeMap<String, OutputVariable> {
        values
            .iter()
            .map(|(name, value)| ((*name).to_string(), OutputVariable::new(*name, *value)))
            .collect()
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_header_once_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let backend = CsvStatisticsBackend::new(dir.path().join("report"));

        backend.write_data(&data(&[("b", "2"), ("a", "1")])).unwrap();
        backend.write_data(&data(&[("b", "4"), ("a", "3,5")])).unwrap();

        let content = fs::read_to_string(backend.file_path()).unwrap();
        assert_eq!(content, "a,b\n1,2\n\"3,5\",4\n");
    }
}
