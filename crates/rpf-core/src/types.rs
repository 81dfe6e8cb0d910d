use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 10x EBITDA) and coverage ratios
pub type Multiple = Decimal;

/// Energy volumes in MWh
pub type Energy = Decimal;

/// Value of a single calculation-object input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Number(Decimal),
    /// Enumerated option, e.g. `"sized"` / `"manual"`
    Choice(String),
}

impl From<Decimal> for InputValue {
    fn from(value: Decimal) -> Self {
        InputValue::Number(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Choice(value.to_string())
    }
}

/// Value produced by a calculation object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Number(Decimal),
    /// Time-indexed values, one per period
    Series(Vec<Decimal>),
    Text(String),
}

impl OutputValue {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            OutputValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[Decimal]> {
        match self {
            OutputValue::Series(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OutputValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Round for presentation. Internal chaining always uses the unrounded value.
    pub fn rounded(&self, dp: u32) -> OutputValue {
        match self {
            OutputValue::Number(v) => OutputValue::Number(v.round_dp(dp)),
            OutputValue::Series(v) => OutputValue::Series(v.iter().map(|x| x.round_dp(dp)).collect()),
            OutputValue::Text(t) => OutputValue::Text(t.clone()),
        }
    }
}

impl From<Decimal> for OutputValue {
    fn from(value: Decimal) -> Self {
        OutputValue::Number(value)
    }
}

impl From<Vec<Decimal>> for OutputValue {
    fn from(value: Vec<Decimal>) -> Self {
        OutputValue::Series(value)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
