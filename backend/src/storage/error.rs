use std::path::PathBuf;

/// Failures coming from the environment rather than from the data:
/// unreadable files, HTTP errors, rejected credentials, bad configuration.
///
/// Inside the [`RecordStorage`](super::RecordStorage) operations these are
/// logged and folded into an [`Outcome`](shared::Outcome); they only reach the
/// caller as `Err` from connection setup.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Sheets API returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("No credentials found. Set RECORD_STORE_SERVICE_ACCOUNT or add {}", .0.display())]
    MissingCredentials(PathBuf),

    #[error("unexpected response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
