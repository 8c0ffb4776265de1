use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{0} not found")]
    MissingTag(String),
    #[error("Multiple {0}s found")]
    DuplicateTag(String),
    #[error("Attribute {0} not found")]
    MissingAttribute(String),
    #[error("Invalid value for {tag}: {value:?}")]
    InvalidValue { tag: String, value: String },
    #[error("Invalid XML: {0}")]
    InvalidXml(String),
    #[error("Invalid FIT: {0}")]
    InvalidFit(String),
    #[error("Unable to get time information in fit record {0}")]
    MissingTimestamp(usize),
    #[error("Error processing {timestamp}: {source}")]
    Record {
        timestamp: String,
        #[source]
        source: Box<ParseError>,
    },
    #[error("No track points found in file")]
    EmptyFile,
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Re-raises a per-trackpoint failure with the trackpoint's timestamp attached.
    pub fn at(self, timestamp: impl Into<String>) -> Self {
        ParseError::Record {
            timestamp: timestamp.into(),
            source: Box::new(self),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Unable to calculate distance because GPS coordinates are null")]
    MissingDistanceSource,
    #[error("Unknown sport: {0:?}")]
    UnknownSport(String),
    #[error("Activity has no samples")]
    EmptyActivity,
}

/// Failure of a single activity on its way from source to normalized form.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
}

impl StoreError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote activity source is not configured")]
    NotConfigured,
    #[error("'overwrite' without 'max' would retrieve too many activities")]
    UnboundedOverwrite,
    #[error("Remote request failed: {0}")]
    Http(String),
    #[error("Remote request failed ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("Invalid remote response: {0}")]
    InvalidResponse(String),
    #[error("Remote activity {id}: {source}")]
    Activity {
        id: u64,
        #[source]
        source: ActivityError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Activity not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ActivityError> for AppError {
    fn from(err: ActivityError) -> Self {
        match err {
            ActivityError::Parse(e) => AppError::Parse(e),
            ActivityError::Processing(e) => AppError::Processing(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Parse(_) | AppError::Processing(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Remote(RemoteError::NotConfigured) => StatusCode::NOT_FOUND,
            AppError::Remote(RemoteError::UnboundedOverwrite) => StatusCode::BAD_REQUEST,
            AppError::Remote(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
