//! Local filesystem backend.
//!
//! Serves a base directory. The implementation is stateless apart from the
//! base path; `tokio::fs` moves the blocking syscalls off the async
//! threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use bytes::{Buf, Bytes};
use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::davpath::DavPath;
use crate::fs::*;

pub(crate) struct LocalFs {
    basedir: PathBuf,
}

struct LocalFsFile {
    path: PathBuf,
    // None when the handle refers to a directory; byte I/O fails on those.
    file: Option<tokio::fs::File>,
}

impl LocalFs {
    /// New backend serving `base`.
    pub fn new(base: impl Into<PathBuf>) -> Arc<LocalFs> {
        Arc::new(LocalFs {
            basedir: base.into(),
        })
    }

    fn abs_path(&self, path: &DavPath) -> PathBuf {
        let mut p = self.basedir.clone();
        p.push(path.as_rel_ospath());
        p
    }
}

fn file_info(name: String, meta: &std::fs::Metadata) -> FileInfo {
    FileInfo {
        name,
        len: meta.len(),
        modified: meta.modified().unwrap_or(UNIX_EPOCH),
        is_dir: meta.is_dir(),
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl DavFileSystem for LocalFs {
    fn open<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>> {
        async move {
            trace!("FS: open {path}");
            let path = self.abs_path(path);
            let meta = tokio::fs::metadata(&path).await?;
            let file = if meta.is_dir() {
                None
            } else {
                Some(tokio::fs::OpenOptions::new().read(true).open(&path).await?)
            };
            Ok(Box::new(LocalFsFile { path, file }) as Box<dyn DavFile>)
        }
        .boxed()
    }

    fn create<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>> {
        async move {
            trace!("FS: create {path}");
            let path = self.abs_path(path);
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .await?;
            Ok(Box::new(LocalFsFile {
                path,
                file: Some(file),
            }) as Box<dyn DavFile>)
        }
        .boxed()
    }

    fn mkdir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: mkdir {path}");
            Ok(tokio::fs::create_dir(self.abs_path(path)).await?)
        }
        .boxed()
    }

    fn remove<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("FS: remove {path}");
            let path = self.abs_path(path);
            let meta = tokio::fs::metadata(&path).await?;
            if meta.is_dir() {
                Ok(tokio::fs::remove_dir(path).await?)
            } else {
                Ok(tokio::fs::remove_file(path).await?)
            }
        }
        .boxed()
    }
}

impl DavFile for LocalFsFile {
    fn stat(&mut self) -> FsFuture<'_, FileInfo> {
        async move {
            let meta = match &self.file {
                Some(file) => file.metadata().await?,
                None => tokio::fs::metadata(&self.path).await?,
            };
            Ok(file_info(base_name(&self.path), &meta))
        }
        .boxed()
    }

    fn read_dir(&mut self, count: usize) -> FsFuture<'_, Vec<FileInfo>> {
        async move {
            let mut rd = tokio::fs::read_dir(&self.path).await?;
            let mut entries = Vec::new();
            while let Some(entry) = rd.next_entry().await? {
                let meta = match entry.metadata().await {
                    Ok(meta) => meta,
                    Err(e) => {
                        debug!("read_dir: stat {:?} failed: {e}", entry.file_name());
                        continue;
                    }
                };
                entries.push(file_info(
                    entry.file_name().to_string_lossy().into_owned(),
                    &meta,
                ));
                if count != 0 && entries.len() == count {
                    break;
                }
            }
            Ok(entries)
        }
        .boxed()
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        async move {
            let file = self.file.as_mut().ok_or(FsError::GeneralFailure)?;
            let mut buf = vec![0u8; count];
            let mut n = 0;
            while n < count {
                let r = file.read(&mut buf[n..]).await?;
                if r == 0 {
                    break;
                }
                n += r;
            }
            buf.truncate(n);
            Ok(Bytes::from(buf))
        }
        .boxed()
    }

    fn write_buf(&mut self, mut buf: Box<dyn Buf + Send>) -> FsFuture<'_, ()> {
        async move {
            let file = self.file.as_mut().ok_or(FsError::GeneralFailure)?;
            while buf.has_remaining() {
                let n = file.write(buf.chunk()).await?;
                buf.advance(n);
            }
            Ok(())
        }
        .boxed()
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        async move {
            let file = self.file.as_mut().ok_or(FsError::GeneralFailure)?;
            Ok(file.seek(pos).await?)
        }
        .boxed()
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        async move {
            let file = self.file.as_mut().ok_or(FsError::GeneralFailure)?;
            Ok(file.flush().await?)
        }
        .boxed()
    }
}
