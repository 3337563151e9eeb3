use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Named values collected for the end-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RuntimeVariable {
    /// Name of the target under test.
    TargetClass,
    /// Coverage criterion the fitness optimises.
    Criterion,
    /// Seed of the random generator, recorded verbatim.
    RandomSeed,
    /// Wall-clock time of the whole run in nanoseconds.
    TotalTime,
    /// Total number of statements in the best suite.
    Length,
    /// Number of test cases in the best suite.
    Size,
    Coverage,
    Fitness,
    /// Number of generations the search ran.
    Generations,
    /// Number of test case executions.
    Evaluations,
    CoverageTimeline,
    SizeTimeline,
    LengthTimeline,
    FitnessTimeline,
    /// Cumulative number of faulting or failed executions.
    TotalExceptionsTimeline,
}

impl RuntimeVariable {
    pub const ALL: [Self; 15] = [
        Self::TargetClass,
        Self::Criterion,
        Self::RandomSeed,
        Self::TotalTime,
        Self::Length,
        Self::Size,
        Self::Coverage,
        Self::Fitness,
        Self::Generations,
        Self::Evaluations,
        Self::CoverageTimeline,
        Self::SizeTimeline,
        Self::LengthTimeline,
        Self::FitnessTimeline,
        Self::TotalExceptionsTimeline,
    ];

    /// Variables reported when no explicit selection is configured.
    pub const DEFAULT_OUTPUT: [Self; 3] = [Self::TargetClass, Self::Criterion, Self::Coverage];

    /// Stable identifier used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TargetClass => "TARGET_CLASS",
            Self::Criterion => "criterion",
            Self::RandomSeed => "Random_Seed",
            Self::TotalTime => "total_time",
            Self::Length => "Length",
            Self::Size => "Size",
            Self::Coverage => "Coverage",
            Self::Fitness => "Fitness",
            Self::Generations => "Generations",
            Self::Evaluations => "Evaluations",
            Self::CoverageTimeline => "CoverageTimeline",
            Self::SizeTimeline => "SizeTimeline",
            Self::LengthTimeline => "LengthTimeline",
            Self::FitnessTimeline => "FitnessTimeline",
            Self::TotalExceptionsTimeline => "TotalExceptionsTimeline",
        }
    }

    /// Whether the variable accumulates one value per generation.
    pub const fn is_sequence(self) -> bool {
        matches!(
            self,
            Self::CoverageTimeline
                | Self::SizeTimeline
                | Self::LengthTimeline
                | Self::FitnessTimeline
                | Self::TotalExceptionsTimeline
        )
    }

    /// Parse an expanded sequence name such as `CoverageTimeline_2` into the
    /// sequence and its 1-based index.
    pub fn parse_sequence_entry(name: &str) -> Option<(Self, usize)> {
        let (base, index) = name.rsplit_once('_')?;
        let index = index.parse::<usize>().ok().filter(|i| *i >= 1)?;
        let variable = base.parse::<Self>().ok().filter(|v| v.is_sequence())?;
        Some((variable, index))
    }
}

impl fmt::Display for RuntimeVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RuntimeVariable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == s)
            .ok_or_else(|| format!("unknown runtime variable: {s}"))
    }
}

/// Value of an output variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl OutputValue {
    pub fn empty() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for OutputValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for OutputValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u64> for OutputValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for OutputValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OutputValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OutputValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An immutable `(name, value)` pair handed to a statistics backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputVariable {
    name: String,
    value: OutputValue,
}

impl OutputVariable {
    pub fn new(name: impl Into<String>, value: impl Into<OutputValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn value(&self) -> &OutputValue {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for variable in RuntimeVariable::ALL {
            assert_eq!(variable.name().parse::<RuntimeVariable>(), Ok(variable));
        }
        assert!("TARGET".parse::<RuntimeVariable>().is_err());
    }

    #[test]
    fn test_default_output_names() {
        let names: Vec<_> = RuntimeVariable::DEFAULT_OUTPUT
            .iter()
            .map(|v| v.name())
            .collect();
        assert_eq!(names, vec!["TARGET_CLASS", "criterion", "Coverage"]);
    }

    #[test]
    fn test_parse_sequence_entry() {
        assert_eq!(
            RuntimeVariable::parse_sequence_entry("CoverageTimeline_2"),
            Some((RuntimeVariable::CoverageTimeline, 2))
        );
        assert_eq!(RuntimeVariable::parse_sequence_entry("CoverageTimeline_0"), None);
        assert_eq!(RuntimeVariable::parse_sequence_entry("Coverage_2"), None);
        assert_eq!(RuntimeVariable::parse_sequence_entry("Random_Seed"), None);
    }

    #[test]
    fn test_output_value_display() {
        assert_eq!(OutputValue::from(3_usize).to_string(), "3");
        assert_eq!(OutputValue::from(0.5).to_string(), "0.5");
        assert_eq!(OutputValue::empty().to_string(), "");
    }
}
