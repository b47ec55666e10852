use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Filesystem I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SIMD JSON parsing error: {0}")]
    SimdJsonParse(#[from] simd_json::Error),

    #[error("API returned an error: status={status}, message={message}")]
    Api { status: u16, message: String },

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Timeout during operation")]
    Timeout,
}

pub type AppResult<T> = Result<T, AppError>;
