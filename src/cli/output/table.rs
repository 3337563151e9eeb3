//! Table output formatting for CLI commands
//!
//! Renders search summaries and generation histories using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::TestCase;
use crate::services::GenerationSummary;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub const fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format `(metric, value)` pairs as a two-column table
    pub fn format_summary(&self, rows: &[(&str, String)]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
        for (metric, value) in rows {
            table.add_row(vec![Cell::new(metric), Cell::new(value)]);
        }
        table.to_string()
    }

    /// Format the per-generation history of a search
    pub fn format_generations(&self, history: &[GenerationSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Gen").add_attribute(Attribute::Bold),
            Cell::new("Fitness").add_attribute(Attribute::Bold),
            Cell::new("Coverage").add_attribute(Attribute::Bold),
            Cell::new("Tests").add_attribute(Attribute::Bold),
            Cell::new("Statements").add_attribute(Attribute::Bold),
        ]);

        for summary in history {
            let coverage = format!("{:.1}%", summary.best_coverage * 100.0);
            let coverage_cell = if self.use_colors {
                Cell::new(coverage).fg(coverage_color(summary.best_coverage))
            } else {
                Cell::new(coverage)
            };
            table.add_row(vec![
                Cell::new(summary.generation),
                Cell::new(format!("{:.4}", summary.best_fitness)),
                coverage_cell,
                Cell::new(summary.best_size),
                Cell::new(summary.best_length),
            ]);
        }
        table.to_string()
    }

    /// One row per statement, with the assertions checked after it
    pub fn format_test_case(&self, index: usize, test_case: &TestCase) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new(format!("test_{index}")).add_attribute(Attribute::Bold),
            Cell::new("Assertions").add_attribute(Attribute::Bold),
        ]);
        for (position, statement) in test_case.statements().iter().enumerate() {
            let assertions = statement
                .assertions()
                .iter()
                .map(|a| format!("assert {a}"))
                .collect::<Vec<_>>()
                .join("\n");
            table.add_row(vec![
                Cell::new(format!("var_{position} = {statement}")),
                Cell::new(assertions),
            ]);
        }
        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(u16::try_from(width).unwrap_or(u16::MAX));
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

fn coverage_color(coverage: f64) -> Color {
    if coverage >= 1.0 {
        Color::Green
    } else if coverage >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    }
}
