use thiserror::Error;

fn at(column: &Option<usize>) -> String {
    match column {
        Some(c) => format!(" (column {c})"),
        None => String::new(),
    }
}

/// Structured per-well configuration failure. Aborts only the well it belongs to.
///
/// `column` is the 1-based position of the offending entry within its model table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Row carries none of the recognised criteria keys.
    #[error("row has no criteria key{}", at(.column))]
    MissingCriteria { column: Option<usize> },
    /// Row carries more than one criteria key.
    #[error("row has conflicting criteria keys {keys:?}{}", at(.column))]
    AmbiguousCriteria {
        column: Option<usize>,
        keys: Vec<String>,
    },
    /// Category string does not name a known category.
    #[error("invalid category '{category}'{}", at(.column))]
    InvalidCategory {
        column: Option<usize>,
        category: String,
    },
    /// Value present but malformed or out of range.
    #[error("invalid value for '{field}': {message}{}", at(.column))]
    InvalidValue {
        column: Option<usize>,
        field: String,
        message: String,
    },
}

impl ConfigurationError {
    pub fn column(&self) -> Option<usize> {
        match self {
            Self::MissingCriteria { column }
            | Self::AmbiguousCriteria { column, .. }
            | Self::InvalidCategory { column, .. }
            | Self::InvalidValue { column, .. } => *column,
        }
    }

    pub fn invalid(column: Option<usize>, field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column,
            field: field.to_string(),
            message: message.into(),
        }
    }
}
