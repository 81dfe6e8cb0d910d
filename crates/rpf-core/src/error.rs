use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Missing required input: {object}.{field}")]
    MissingInput { object: String, field: String },

    #[error("Invalid input: {object}.{field} — {reason}")]
    InvalidInput {
        object: String,
        field: String,
        reason: String,
    },

    #[error("Missing dependency: {object} needs '{key}' but it was not in its bundle")]
    MissingDependency { object: String, key: String },

    #[error("Unknown calculation object: {0}")]
    UnknownObject(String),

    #[error("Unknown dependency: {object} depends on '{depends_on}', which is not defined")]
    UnknownDependency { object: String, depends_on: String },

    #[error("Wiring mismatch: {object} binds '{depends_on}.{output}', which '{depends_on}' does not declare")]
    WiringMismatch {
        object: String,
        depends_on: String,
        output: String,
    },

    #[error("Dependency cycle between: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EngineError {
    pub fn overflow(context: impl Into<String>) -> Self {
        EngineError::NumericOverflow {
            context: context.into(),
        }
    }

    /// Object the error is attributed to, when it belongs to one.
    pub fn object(&self) -> Option<&str> {
        match self {
            EngineError::MissingInput { object, .. }
            | EngineError::InvalidInput { object, .. }
            | EngineError::MissingDependency { object, .. }
            | EngineError::UnknownDependency { object, .. }
            | EngineError::WiringMismatch { object, .. } => Some(object),
            _ => None,
        }
    }

    /// Field (input id or dependency key) the error points at.
    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::MissingInput { field, .. } | EngineError::InvalidInput { field, .. } => {
                Some(field)
            }
            EngineError::MissingDependency { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::SerializationError(e.to_string())
    }
}
