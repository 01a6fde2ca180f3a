//! Geographic join error types

use thiserror::Error;

use super::CoreError;

#[derive(Error, Debug)]
pub enum JoinError {
    /// CSV text could not be read
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Join column absent from the dataset header
    #[error("Join column '{0}' not found in dataset")]
    MissingColumn(String),

    /// Dataset carries a header but no rows
    #[error("Dataset contains no rows")]
    EmptyDataset,

    /// Boundary layer could not be read
    #[error("Invalid boundary layer: {0}")]
    InvalidLayer(String),
}

impl From<JoinError> for CoreError {
    fn from(err: JoinError) -> Self {
        let message = err.to_string();
        CoreError::validation(message).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreErrorKind;

    #[test]
    fn missing_column_is_validation_error() {
        let err: CoreError = JoinError::MissingColumn("insee".to_string()).into();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert_eq!(err.message(), "Join column 'insee' not found in dataset");
    }
}
