//! Error handling

use axum::response::IntoResponse;
use tracing::info;

/// Error definitions for the brandmorpher application.
#[derive(Debug)]
pub enum MorpherError {
    /// A required upload or input file is absent or undecodable
    MissingInput(String),
    /// An upload with an extension we don't take
    UnsupportedUpload(String),
    /// The external generation API misbehaved, always recovered locally
    Adapter(String),
    /// Creative generation blew up
    Composition(String),
    /// Writing the archive failed
    Packaging(String),
    /// When you didn't do the right thing
    BadRequest,
    /// When an internal server error occurs
    InternalServerError(String),
}

impl std::fmt::Display for MorpherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInput(what) => write!(f, "Missing input: {what}"),
            Self::UnsupportedUpload(name) => write!(f, "Unsupported upload: {name}"),
            Self::Adapter(msg) => write!(f, "Generation API failure: {msg}"),
            Self::Composition(msg) => write!(f, "Composition failed: {msg}"),
            Self::Packaging(msg) => write!(f, "Packaging failed: {msg}"),
            Self::BadRequest => write!(f, "Bad request"),
            Self::InternalServerError(msg) => write!(f, "Internal server error: {msg}"),
        }
    }
}

impl std::error::Error for MorpherError {}

impl From<std::io::Error> for MorpherError {
    fn from(err: std::io::Error) -> Self {
        MorpherError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for MorpherError {
    fn from(err: axum::http::Error) -> Self {
        MorpherError::InternalServerError(err.to_string())
    }
}

impl From<image::ImageError> for MorpherError {
    fn from(err: image::ImageError) -> Self {
        MorpherError::Composition(err.to_string())
    }
}

impl From<zip::result::ZipError> for MorpherError {
    fn from(err: zip::result::ZipError) -> Self {
        MorpherError::Packaging(err.to_string())
    }
}

impl From<reqwest::Error> for MorpherError {
    fn from(err: reqwest::Error) -> Self {
        MorpherError::Adapter(err.to_string())
    }
}

impl From<serde_json::Error> for MorpherError {
    fn from(err: serde_json::Error) -> Self {
        MorpherError::Adapter(err.to_string())
    }
}

impl IntoResponse for MorpherError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            MorpherError::MissingInput(what) => {
                info!("Missing input: {what}");
                (axum::http::StatusCode::BAD_REQUEST, "Missing input")
            }
            MorpherError::UnsupportedUpload(name) => {
                info!("Unsupported upload: {name}");
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    "Allowed file types: png, jpg, jpeg",
                )
            }
            MorpherError::BadRequest => {
                info!("Bad request received");
                (axum::http::StatusCode::BAD_REQUEST, "Bad Request")
            }
            MorpherError::Adapter(message)
            | MorpherError::Composition(message)
            | MorpherError::Packaging(message)
            | MorpherError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                )
            }
        };
        let mut response = axum::response::Response::new(axum::body::Body::from(body));
        *response.status_mut() = status;
        response
    }
}
