use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Data corruption: {message}")]
    DataCorruption { message: String },
    #[error("Definition error: {0}")]
    Definition(String),
    #[error("Type mismatch: expected {expected} but found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error on {model}.{field}: {message}")]
    Validation { model: String, field: String, message: String },
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, OrmError>;

// Helper conversions
impl From<rusqlite::Error> for OrmError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<serde_json::Error> for OrmError {
    fn from(e: serde_json::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<config::ConfigError> for OrmError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for OrmError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}

impl OrmError {
    // places an unattributed validation error on the field it came from
    pub(crate) fn at(self, model: &str, field: &str) -> Self {
        match self {
            Self::Validation { model: m, field: f, message } if m.is_empty() && f.is_empty() => {
                Self::Validation { model: model.to_string(), field: field.to_string(), message }
            }
            other => other,
        }
    }
}
