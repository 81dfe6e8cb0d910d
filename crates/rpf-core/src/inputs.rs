//! Resolved inputs and dependency bundles handed to each calculation object.
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::object::{CalculationObject, ObjectId};
use crate::types::{InputValue, OutputValue};
use crate::EngineResult;

/// Caller-supplied input values, keyed by object then input id.
pub type Overrides = IndexMap<ObjectId, IndexMap<String, InputValue>>;

/// Outputs produced by one object, keyed by output id.
pub type Outputs = IndexMap<String, OutputValue>;

/// Input values for one object: definition defaults with overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInputs {
    object: ObjectId,
    values: IndexMap<String, InputValue>,
}

impl ObjectInputs {
    pub fn new(object: ObjectId, values: IndexMap<String, InputValue>) -> Self {
        Self { object, values }
    }

    pub fn resolve(
        definition: &CalculationObject,
        overrides: Option<&IndexMap<String, InputValue>>,
    ) -> Self {
        let mut values = IndexMap::new();
        for input in &definition.inputs {
            if let Some(v) = &input.value {
                values.insert(input.id.clone(), v.clone());
            }
        }
        if let Some(over) = overrides {
            for (k, v) in over {
                values.insert(k.clone(), v.clone());
            }
        }
        Self {
            object: definition.id,
            values,
        }
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn set(&mut self, id: &str, value: impl Into<InputValue>) {
        self.values.insert(id.to_string(), value.into());
    }

    /// A required numeric input. Absence is an error, never a silent zero.
    pub fn number(&self, id: &str) -> EngineResult<Decimal> {
        self.optional_number(id)?
            .ok_or_else(|| EngineError::MissingInput {
                object: self.object.to_string(),
                field: id.to_string(),
            })
    }

    pub fn number_or(&self, id: &str, default: Decimal) -> EngineResult<Decimal> {
        Ok(self.optional_number(id)?.unwrap_or(default))
    }

    pub fn optional_number(&self, id: &str) -> EngineResult<Option<Decimal>> {
        match self.values.get(id) {
            None => Ok(None),
            Some(InputValue::Number(v)) => Ok(Some(*v)),
            Some(InputValue::Choice(c)) => Err(self.invalid(id, format!("expected a number, got '{c}'"))),
        }
    }

    pub fn choice_or(&self, id: &str, default: &str) -> EngineResult<String> {
        match self.values.get(id) {
            None => Ok(default.to_string()),
            Some(InputValue::Choice(c)) => Ok(c.clone()),
            Some(InputValue::Number(v)) => Err(self.invalid(id, format!("expected an option, got {v}"))),
        }
    }

    /// A required whole number that may be negative (year indices).
    pub fn integer(&self, id: &str) -> EngineResult<i64> {
        let v = self.number(id)?;
        self.to_integer(id, v)
    }

    /// A required non-negative whole number (durations, counts).
    pub fn count(&self, id: &str) -> EngineResult<u32> {
        let v = self.number(id)?;
        self.to_count(id, v)
    }

    pub fn count_or(&self, id: &str, default: u32) -> EngineResult<u32> {
        match self.optional_number(id)? {
            Some(v) => self.to_count(id, v),
            None => Ok(default),
        }
    }

    pub fn invalid(&self, id: &str, reason: impl Into<String>) -> EngineError {
        EngineError::InvalidInput {
            object: self.object.to_string(),
            field: id.to_string(),
            reason: reason.into(),
        }
    }

    fn to_integer(&self, id: &str, v: Decimal) -> EngineResult<i64> {
        if v.fract() != Decimal::ZERO {
            return Err(self.invalid(id, format!("must be a whole number, got {v}")));
        }
        v.to_i64()
            .ok_or_else(|| self.invalid(id, format!("{v} is out of range")))
    }

    fn to_count(&self, id: &str, v: Decimal) -> EngineResult<u32> {
        if v < Decimal::ZERO {
            return Err(self.invalid(id, format!("cannot be negative, got {v}")));
        }
        let whole = self.to_integer(id, v)?;
        u32::try_from(whole).map_err(|_| self.invalid(id, format!("{v} is out of range")))
    }
}

/// Named upstream outputs for one object, rebuilt on every pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyBundle {
    object: Option<ObjectId>,
    values: IndexMap<String, OutputValue>,
}

impl DependencyBundle {
    pub fn for_object(object: ObjectId) -> Self {
        Self {
            object: Some(object),
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<OutputValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<OutputValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> EngineResult<&OutputValue> {
        self.values.get(key).ok_or_else(|| self.missing(key))
    }

    pub fn number(&self, key: &str) -> EngineResult<Decimal> {
        self.get(key)?.as_number().ok_or_else(|| self.missing(key))
    }

    pub fn series(&self, key: &str) -> EngineResult<&[Decimal]> {
        self.get(key)?.as_series().ok_or_else(|| self.missing(key))
    }

    /// A series that must cover exactly `len` periods.
    pub fn series_of_len(&self, key: &str, len: usize) -> EngineResult<&[Decimal]> {
        let series = self.series(key)?;
        if series.len() != len {
            return Err(EngineError::InvalidInput {
                object: self.object_name(),
                field: key.to_string(),
                reason: format!("expected {len} periods, got {}", series.len()),
            });
        }
        Ok(series)
    }

    pub fn count(&self, key: &str) -> EngineResult<u32> {
        let v = self.number(key)?;
        v.to_u32().ok_or_else(|| self.missing(key))
    }

    pub fn integer(&self, key: &str) -> EngineResult<i64> {
        let v = self.number(key)?;
        v.to_i64().ok_or_else(|| self.missing(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn object_name(&self) -> String {
        self.object
            .map(|o| o.to_string())
            .unwrap_or_else(|| "unbound".into())
    }

    fn missing(&self, key: &str) -> EngineError {
        EngineError::MissingDependency {
            object: self.object_name(),
            key: key.to_string(),
        }
    }
}
