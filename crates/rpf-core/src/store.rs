//! Mutable scenario configuration, snapshotted before every evaluation.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::engine::{self, Evaluation};
use crate::error::EngineError;
use crate::inputs::Overrides;
use crate::object::{default_objects, CalculationObject, ObjectId};
use crate::types::{ComputationOutput, InputValue};
use crate::EngineResult;

/// A scenario document: optional object definitions plus input overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Falls back to the built-in objects when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<CalculationObject>>,
    #[serde(default)]
    pub overrides: Overrides,
}

impl Scenario {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_store(self) -> ScenarioStore {
        ScenarioStore {
            definitions: self.objects.unwrap_or_else(default_objects),
            overrides: self.overrides,
        }
    }
}

/// Immutable copy of the store handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSnapshot {
    pub definitions: Vec<CalculationObject>,
    pub overrides: Overrides,
}

impl ScenarioSnapshot {
    pub fn evaluate(&self) -> EngineResult<ComputationOutput<Evaluation>> {
        engine::evaluate(&self.definitions, &self.overrides)
    }
}

/// Holds definitions and edited input values between evaluation passes.
#[derive(Debug, Clone)]
pub struct ScenarioStore {
    definitions: Vec<CalculationObject>,
    overrides: Overrides,
}

impl Default for ScenarioStore {
    fn default() -> Self {
        Self::new(default_objects())
    }
}

impl ScenarioStore {
    pub fn new(definitions: Vec<CalculationObject>) -> Self {
        Self {
            definitions,
            overrides: IndexMap::new(),
        }
    }

    pub fn definitions(&self) -> &[CalculationObject] {
        &self.definitions
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Set one input. The object and input must be defined.
    pub fn set_input(
        &mut self,
        object: ObjectId,
        input: &str,
        value: impl Into<InputValue>,
    ) -> EngineResult<()> {
        let def = self
            .definitions
            .iter()
            .find(|d| d.id == object)
            .ok_or_else(|| EngineError::UnknownObject(object.to_string()))?;
        if def.input(input).is_none() {
            return Err(EngineError::InvalidInput {
                object: object.to_string(),
                field: input.to_string(),
                reason: "not an input of this object".into(),
            });
        }
        tracing::debug!(%object, input, "input set");
        self.overrides
            .entry(object)
            .or_default()
            .insert(input.to_string(), value.into());
        Ok(())
    }

    /// Revert an input to its definition default. Returns the removed value.
    pub fn clear_input(&mut self, object: ObjectId, input: &str) -> Option<InputValue> {
        let values = self.overrides.get_mut(&object)?;
        let removed = values.shift_remove(input);
        if values.is_empty() {
            self.overrides.shift_remove(&object);
        }
        removed
    }

    pub fn merge(&mut self, overrides: Overrides) -> EngineResult<()> {
        for (object, values) in overrides {
            for (input, value) in values {
                self.set_input(object, &input, value)?;
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ScenarioSnapshot {
        ScenarioSnapshot {
            definitions: self.definitions.clone(),
            overrides: self.overrides.clone(),
        }
    }

    /// Snapshot the current configuration and evaluate it.
    pub fn evaluate(&self) -> EngineResult<ComputationOutput<Evaluation>> {
        self.snapshot().evaluate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_set_and_clear_input() {
        let mut store = ScenarioStore::default();
        store.set_input(ObjectId::Capex, "contingency", dec!(0)).unwrap();
        assert_eq!(store.overrides().len(), 1);
        assert_eq!(
            store.clear_input(ObjectId::Capex, "contingency"),
            Some(InputValue::Number(dec!(0)))
        );
        assert!(store.overrides().is_empty());
        assert_eq!(store.clear_input(ObjectId::Capex, "contingency"), None);
    }

    #[test]
    fn test_set_unknown_input_fails() {
        let mut store = ScenarioStore::default();
        assert!(store.set_input(ObjectId::Capex, "bogus", dec!(1)).is_err());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_edits() {
        let mut store = ScenarioStore::default();
        let before = store.snapshot();
        store.set_input(ObjectId::MerchantRevenue, "merchant_price", dec!(90)).unwrap();
        assert!(before.overrides.is_empty());
        assert_ne!(before, store.snapshot());
    }

    #[test]
    fn test_scenario_json_defaults_objects() {
        let scenario = Scenario::from_json(
            r#"{ "overrides": { "capex": { "total_capex": 50000000 } } }"#,
        )
        .unwrap();
        assert!(scenario.objects.is_none());
        let store = scenario.into_store();
        assert_eq!(store.definitions().len(), ObjectId::ALL.len());
        assert_eq!(
            store.overrides()[&ObjectId::Capex]["total_capex"],
            InputValue::Number(dec!(50000000))
        );
    }
}
