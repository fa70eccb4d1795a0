//! WebDAV client (stub).
//!
//! The server half of this crate is complete; the client half is limited
//! to this placeholder so both sides can eventually share the
//! [`DavFileSystem`] capability.

use std::sync::Arc;

use crate::fs::{DavFileSystem, FsResult};

/// Connect to a remote WebDAV server and expose it as a filesystem.
pub async fn dial(_url: &str) -> FsResult<Arc<dyn DavFileSystem>> {
    Err(crate::fs::FsError::NotImplemented)
}
