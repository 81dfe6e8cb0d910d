pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod object;
pub mod plan;
pub mod store;
pub mod time_value;
pub mod timeline;
pub mod types;

pub mod asset;
pub mod construction;
pub mod costs;
pub mod financing;
pub mod returns;
pub mod revenue;

pub use engine::{evaluate, Evaluation, ObjectResult, ObjectStatus};
pub use error::EngineError;
pub use object::{default_objects, CalculationObject, ObjectId};
pub use store::{Scenario, ScenarioStore};
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, EngineError>;
