use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    /// Conflicting or unusable reader/writer options.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("no fields specified")]
    NoFields,

    #[error("duplicate field names: {0:?}")]
    DuplicateFields(Vec<String>),

    #[error("blank field name: {0:?}")]
    BlankField(Vec<String>),

    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// Row is longer than the field list and no rest key is configured.
    #[error("too many fields at line {line}: expected {expected}, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Row is shorter than the field list and no rest value is configured.
    #[error("insufficient fields at line {line}: expected {expected}, found {found}")]
    InsufficientFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("rest key generated duplicate key at line {line}: {fields:?}")]
    DuplicateRestKey { line: u64, fields: Vec<String> },

    #[error("no setter for field {field:?} at line {line}")]
    UnknownField { line: u64, field: String },

    #[error("missing value for field {0:?}")]
    MissingField(String),

    #[error("unexpected extra field {0:?}")]
    ExtraField(String),

    /// A write handler returned a row of a different length than it was given.
    #[error("data length changed in handler: expected {expected}, found {found}")]
    HandlerChangedLength { expected: usize, found: usize },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::BatchError;

    #[test]
    fn row_errors_should_mention_line_number() {
        let error = BatchError::TooManyFields {
            line: 7,
            expected: 2,
            found: 3,
        };
        assert_eq!(
            error.to_string(),
            "too many fields at line 7: expected 2, found 3"
        );

        let error = BatchError::DuplicateRestKey {
            line: 3,
            fields: vec!["a".to_string(), "a".to_string()],
        };
        assert!(error.to_string().contains("line 3"));
    }

    #[test]
    fn io_errors_should_convert() {
        let error: BatchError = std::io::Error::other("disk full").into();
        assert!(matches!(error, BatchError::Io(_)));
        assert_eq!(error.to_string(), "disk full");
    }
}
