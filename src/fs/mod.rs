//! The filesystem capability driven by the handler.
//!
//! A backend implements access to a collection of named resources. Paths
//! use forward slashes regardless of the host operating system. Handles are
//! exclusively owned by the caller; dropping one closes it, on every exit
//! path.

use std::fmt;
use std::io;
pub use std::io::SeekFrom;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, Bytes};
use futures_util::future::BoxFuture;

use crate::davpath::DavPath;

pub(crate) mod localfs;
pub(crate) mod memfs;

/// Future returned by the filesystem traits.
pub type FsFuture<'a, T> = BoxFuture<'a, FsResult<T>>;
pub type FsResult<T> = Result<T, FsError>;

/// Errors produced by filesystem backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    Forbidden,
    Exists,
    InsufficientStorage,
    NotImplemented,
    GeneralFailure,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FsError::NotFound => "not found",
            FsError::Forbidden => "forbidden",
            FsError::Exists => "already exists",
            FsError::InsufficientStorage => "insufficient storage",
            FsError::NotImplemented => "not implemented",
            FsError::GeneralFailure => "general failure",
        };
        f.write_str(s)
    }
}

impl std::error::Error for FsError {}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::PermissionDenied => FsError::Forbidden,
            io::ErrorKind::AlreadyExists => FsError::Exists,
            _ => FsError::GeneralFailure,
        }
    }
}

/// Access to a collection of named resources.
pub trait DavFileSystem: Send + Sync {
    /// Open an existing resource.
    fn open<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>>;

    /// Create a resource for writing, truncating it if it exists.
    fn create<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>>;

    /// Create a collection.
    fn mkdir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;

    /// Remove a resource. Removing a non-empty collection fails.
    fn remove<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;
}

/// An open resource handle.
pub trait DavFile: Send {
    fn stat(&mut self) -> FsFuture<'_, FileInfo>;

    /// List a collection's entries; `count == 0` means all of them.
    fn read_dir(&mut self, count: usize) -> FsFuture<'_, Vec<FileInfo>>;

    /// Read up to `count` bytes from the current position. An empty result
    /// means end of file.
    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes>;

    fn write_buf(&mut self, buf: Box<dyn Buf + Send>) -> FsFuture<'_, ()>;

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64>;

    fn flush(&mut self) -> FsFuture<'_, ()>;
}

/// Metadata of one resource.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub len: u64,
    pub modified: SystemTime,
    pub is_dir: bool,
}

impl FileInfo {
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// Validator derived from length and mtime, same shape as apache's
    /// default etag.
    pub fn etag(&self) -> String {
        let t = self.modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        let t = t.as_secs() * 1_000_000 + u64::from(t.subsec_nanos()) / 1000;
        if self.is_dir {
            format!("{t:x}")
        } else {
            format!("{:x}-{:x}", self.len, t)
        }
    }

    /// MIME type guessed from the name's extension.
    pub fn content_type(&self) -> mime_guess::Mime {
        mime_guess::from_path(&self.name).first_or_octet_stream()
    }
}
