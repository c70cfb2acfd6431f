use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token cache error: {0}")]
    TokenCache(String),

    #[error("OAuth2 authentication error: {0}")]
    Auth(String),

    #[error("Google Sheets API error: {0}")]
    Sheets(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Unexpected cell value at row {row}, column {column}: {value}")]
    DataShape {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
