//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use suitegen::domain::models::{
    OutputVariable, PrimitiveValue, SearchConfig, Statement, TestCase, ValueType,
};
use suitegen::domain::ports::StatisticsBackend;
use suitegen::StatisticsError;
use tempfile::TempDir;

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Backend that keeps every written row in memory.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    rows: Arc<Mutex<Vec<BTreeMap<String, OutputVariable>>>>,
}

impl RecordingBackend {
    pub fn rows(&self) -> Vec<BTreeMap<String, OutputVariable>> {
        self.rows.lock().unwrap().clone()
    }
}

impl StatisticsBackend for RecordingBackend {
    fn write_data(&self, data: &BTreeMap<String, OutputVariable>) -> Result<(), StatisticsError> {
        self.rows.lock().unwrap().push(data.clone());
        Ok(())
    }
}

/// A small, fully seeded search on the calculator.
pub fn search_config(seed: u64, generations: usize) -> SearchConfig {
    SearchConfig {
        population_size: 6,
        max_generations: Some(generations),
        max_search_time_secs: None,
        // unreachable, so only the generation budget stops the search
        target_coverage: 2.0,
        seed: Some(seed),
        ..SearchConfig::default()
    }
}

fn calculator_type() -> ValueType {
    ValueType::Object("Calculator".to_string())
}

/// `calc = Calculator(); a = lhs; b = rhs; calc.<op>(a, b)`, followed by
/// `calc.output_results()` when `report` is set.
pub fn calculator_call(op: &str, lhs: f64, rhs: f64, report: bool) -> TestCase {
    let mut tc = TestCase::new();
    let calc = tc.add_statement(Statement::call("Calculator", None, vec![], calculator_type()));
    let a = tc.add_statement(Statement::primitive(PrimitiveValue::Float(lhs)));
    let b = tc.add_statement(Statement::primitive(PrimitiveValue::Float(rhs)));
    tc.add_statement(Statement::call(op, Some(calc), vec![a, b], ValueType::Float));
    if report {
        tc.add_statement(Statement::call("output_results", Some(calc), vec![], ValueType::Str));
    }
    tc
}
