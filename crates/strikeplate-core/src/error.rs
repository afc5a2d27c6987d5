use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Identifier errors
    #[error("Invalid reader ID: {0}")]
    InvalidReaderId(String),

    #[error("Invalid transponder ID: {0}")]
    InvalidTransponderId(String),

    #[error("Invalid reader type: {0}")]
    InvalidVariant(String),

    // Configuration errors
    #[error("Reader type {variant} requires a configured reader ID")]
    MissingReaderId { variant: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
