use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Infeasible(String),

    #[error("could not convert {value} to a number for '{field}'")]
    Coercion { field: String, value: String },

    #[error("{scenario} calculation error: {source}")]
    Calculation {
        scenario: &'static str,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Unknown script name.")]
    UnknownScript { received: String, normalized: String },

    #[error("spreadsheet export failed: {0}")]
    Export(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn coercion(field: impl Into<String>, value: impl ToString) -> Self {
        Self::Coercion {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Attributes a failure to the scenario it happened in. User-facing
    /// validation messages pass through untouched.
    pub fn within(self, scenario: &'static str) -> Self {
        match self {
            Self::Coercion { .. } | Self::Export(_) => Self::Calculation {
                scenario,
                source: Box::new(self),
            },
            other => other,
        }
    }
}
