use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotifError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed model: {0}")]
    MalformedModel(String),

    #[error("Position {position} out of range for model of length {length}")]
    OutOfRange { position: usize, length: usize },

    #[error("Invalid base {base:?} at position {position}")]
    InvalidBase { position: usize, base: char },

    #[error("Sequence of length {length} is shorter than model length {required}")]
    SequenceTooShort { length: usize, required: usize },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid parameter: {name} = {value}, {message}")]
    InvalidParameter {
        name: String,
        value: String,
        message: String,
    },
}

/// Type alias for Result with MotifError
pub type Result<T> = std::result::Result<T, MotifError>;

impl MotifError {
    /// Create a new MalformedModel error
    pub fn malformed_model(message: impl Into<String>) -> Self {
        MotifError::MalformedModel(message.into())
    }

    /// Create a new InvalidBase error from the offending byte
    pub fn invalid_base(position: usize, base: u8) -> Self {
        MotifError::InvalidBase {
            position,
            base: base as char,
        }
    }

    /// Create a new EmptyInput error
    pub fn empty_input(message: impl Into<String>) -> Self {
        MotifError::EmptyInput(message.into())
    }

    /// Create a new InvalidParameter error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        MotifError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error is confined to a single probe and may be skipped
    pub fn is_per_probe(&self) -> bool {
        matches!(
            self,
            MotifError::InvalidBase { .. } | MotifError::SequenceTooShort { .. }
        )
    }
}
