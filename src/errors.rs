//
// Error type returned by the handler internals, and its mapping
// to HTTP status codes.
//
use std::fmt;
use std::io;

use http::StatusCode;

use crate::fs::FsError;

pub(crate) type DavResult<T> = Result<T, DavError>;

/// Error that aborts a single-resource operation.
///
/// Every variant maps to exactly one status code. Recursive operations
/// (deep COPY and DELETE) do not use these for per-child failures; those
/// are collected and reported in a 207 multistatus instead.
#[derive(Debug)]
pub enum DavError {
    /// The request path contains a forbidden character.
    InvalidCharPath,
    /// A request body failed to parse as XML.
    MalformedXml,
    /// The request method is not an HTTP or WebDAV method we know.
    UnknownDavMethod,
    /// Respond with this status and an empty body.
    Status(StatusCode),
    /// Filesystem error that no handler translated.
    Fs(FsError),
    /// I/O error on the request or response body.
    Io(io::Error),
}

impl DavError {
    pub fn statuscode(&self) -> StatusCode {
        match self {
            DavError::InvalidCharPath => StatusCode::BAD_REQUEST,
            DavError::MalformedXml => StatusCode::BAD_REQUEST,
            DavError::UnknownDavMethod => StatusCode::BAD_REQUEST,
            DavError::Status(status) => *status,
            DavError::Fs(e) => fs_error_status(*e),
            DavError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn fs_error_status(e: FsError) -> StatusCode {
    match e {
        FsError::NotFound => StatusCode::NOT_FOUND,
        FsError::Forbidden => StatusCode::FORBIDDEN,
        FsError::Exists => StatusCode::METHOD_NOT_ALLOWED,
        FsError::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
        FsError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        FsError::GeneralFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DavError::InvalidCharPath => write!(f, "invalid character in file path"),
            DavError::MalformedXml => write!(f, "xml is not well-formed"),
            DavError::UnknownDavMethod => write!(f, "unknown HTTP/WebDAV method"),
            DavError::Status(status) => write!(f, "status {status}"),
            DavError::Fs(e) => write!(f, "filesystem: {e}"),
            DavError::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for DavError {}

impl From<StatusCode> for DavError {
    fn from(status: StatusCode) -> Self {
        DavError::Status(status)
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> Self {
        DavError::Fs(e)
    }
}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> Self {
        DavError::Io(e)
    }
}
