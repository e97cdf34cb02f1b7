use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClimateError>;

#[derive(Error, Debug)]
pub enum ClimateError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Remote did not report a size for {0}")]
    MissingContentLength(String),

    #[error("Unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("Invalid archive URL: {0}")]
    InvalidUrl(String),

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("No data files found under {}", .0.display())]
    NoDataFiles(PathBuf),

    #[error("Progress bar template error: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Background task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
