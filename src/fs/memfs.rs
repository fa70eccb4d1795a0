//! Ephemeral in-memory backend.
//!
//! Useful for tests and for serving scratch trees without touching disk.
//! The whole tree sits behind one mutex; every handle operation locks,
//! walks to its node, works, and unlocks before returning.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Buf, Bytes};
use futures_util::future::{self, FutureExt};
use parking_lot::Mutex;

use crate::davpath::DavPath;
use crate::fs::*;

pub(crate) struct MemFs {
    root: Arc<Mutex<MemDir>>,
}

struct MemDir {
    entries: BTreeMap<String, MemEntry>,
    modified: SystemTime,
}

enum MemEntry {
    Dir(MemDir),
    File { data: Vec<u8>, modified: SystemTime },
}

struct MemFsFile {
    root: Arc<Mutex<MemDir>>,
    // Segments from the root; empty for the root directory itself.
    segs: Vec<String>,
    pos: u64,
}

impl MemFs {
    pub fn new() -> Arc<MemFs> {
        Arc::new(MemFs {
            root: Arc::new(Mutex::new(MemDir::new())),
        })
    }

    fn handle(&self, path: &DavPath) -> MemFsFile {
        MemFsFile {
            root: self.root.clone(),
            segs: path.segments().map(str::to_string).collect(),
            pos: 0,
        }
    }
}

impl MemDir {
    fn new() -> MemDir {
        MemDir {
            entries: BTreeMap::new(),
            modified: SystemTime::now(),
        }
    }

    // Walk to the directory at `segs`.
    fn dir(&self, segs: &[String]) -> FsResult<&MemDir> {
        let mut dir = self;
        for seg in segs {
            match dir.entries.get(seg) {
                Some(MemEntry::Dir(d)) => dir = d,
                Some(MemEntry::File { .. }) | None => return Err(FsError::NotFound),
            }
        }
        Ok(dir)
    }

    fn dir_mut(&mut self, segs: &[String]) -> FsResult<&mut MemDir> {
        let mut dir = self;
        for seg in segs {
            match dir.entries.get_mut(seg) {
                Some(MemEntry::Dir(d)) => dir = d,
                Some(MemEntry::File { .. }) | None => return Err(FsError::NotFound),
            }
        }
        Ok(dir)
    }

    // The entry at `segs`, which must be non-empty.
    fn entry(&self, segs: &[String]) -> FsResult<&MemEntry> {
        let (name, parent) = segs.split_last().ok_or(FsError::Forbidden)?;
        self.dir(parent)?.entries.get(name).ok_or(FsError::NotFound)
    }

    fn entry_mut(&mut self, segs: &[String]) -> FsResult<&mut MemEntry> {
        let (name, parent) = segs.split_last().ok_or(FsError::Forbidden)?;
        self.dir_mut(parent)?
            .entries
            .get_mut(name)
            .ok_or(FsError::NotFound)
    }
}

fn entry_info(name: &str, entry: &MemEntry) -> FileInfo {
    match entry {
        MemEntry::Dir(d) => FileInfo {
            name: name.to_string(),
            len: 0,
            modified: d.modified,
            is_dir: true,
        },
        MemEntry::File { data, modified } => FileInfo {
            name: name.to_string(),
            len: data.len() as u64,
            modified: *modified,
            is_dir: false,
        },
    }
}

impl DavFileSystem for MemFs {
    fn open<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>> {
        let handle = self.handle(path);
        let res = {
            let root = self.root.lock();
            if handle.segs.is_empty() {
                Ok(())
            } else {
                root.entry(&handle.segs).map(|_| ())
            }
        };
        trace!("FS: open {path}: {res:?}");
        Box::pin(future::ready(
            res.map(|_| Box::new(handle) as Box<dyn DavFile>),
        ))
    }

    fn create<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>> {
        let handle = self.handle(path);
        let res = {
            let mut root = self.root.lock();
            match handle.segs.split_last() {
                None => Err(FsError::Forbidden),
                Some((name, parent)) => root.dir_mut(parent).and_then(|dir| {
                    match dir.entries.get(name) {
                        Some(MemEntry::Dir(_)) => Err(FsError::Forbidden),
                        _ => {
                            dir.entries.insert(
                                name.clone(),
                                MemEntry::File {
                                    data: Vec::new(),
                                    modified: SystemTime::now(),
                                },
                            );
                            Ok(())
                        }
                    }
                }),
            }
        };
        trace!("FS: create {path}: {res:?}");
        Box::pin(future::ready(
            res.map(|_| Box::new(handle) as Box<dyn DavFile>),
        ))
    }

    fn mkdir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        let segs: Vec<String> = path.segments().map(str::to_string).collect();
        let res = {
            let mut root = self.root.lock();
            match segs.split_last() {
                None => Err(FsError::Exists),
                Some((name, parent)) => root.dir_mut(parent).and_then(|dir| {
                    if dir.entries.contains_key(name) {
                        Err(FsError::Exists)
                    } else {
                        dir.entries.insert(name.clone(), MemEntry::Dir(MemDir::new()));
                        Ok(())
                    }
                }),
            }
        };
        trace!("FS: mkdir {path}: {res:?}");
        Box::pin(future::ready(res))
    }

    fn remove<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        let segs: Vec<String> = path.segments().map(str::to_string).collect();
        let res = {
            let mut root = self.root.lock();
            match segs.split_last() {
                None => Err(FsError::Forbidden),
                Some((name, parent)) => root.dir_mut(parent).and_then(|dir| {
                    match dir.entries.get(name) {
                        None => Err(FsError::NotFound),
                        // like the OS call, refuse non-empty directories
                        Some(MemEntry::Dir(d)) if !d.entries.is_empty() => {
                            Err(FsError::GeneralFailure)
                        }
                        Some(_) => {
                            dir.entries.remove(name);
                            Ok(())
                        }
                    }
                }),
            }
        };
        trace!("FS: remove {path}: {res:?}");
        Box::pin(future::ready(res))
    }
}

impl MemFsFile {
    fn name(&self) -> &str {
        self.segs.last().map(String::as_str).unwrap_or("/")
    }
}

impl DavFile for MemFsFile {
    fn stat(&mut self) -> FsFuture<'_, FileInfo> {
        let root = self.root.lock();
        let res = if self.segs.is_empty() {
            Ok(FileInfo {
                name: "/".to_string(),
                len: 0,
                modified: root.modified,
                is_dir: true,
            })
        } else {
            root.entry(&self.segs).map(|e| entry_info(self.name(), e))
        };
        drop(root);
        future::ready(res).boxed()
    }

    fn read_dir(&mut self, count: usize) -> FsFuture<'_, Vec<FileInfo>> {
        let root = self.root.lock();
        let res = root.dir(&self.segs).map(|dir| {
            dir.entries
                .iter()
                .take(if count == 0 { usize::MAX } else { count })
                .map(|(name, entry)| entry_info(name, entry))
                .collect()
        });
        drop(root);
        future::ready(res).boxed()
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        let root = self.root.lock();
        let res = match root.entry(&self.segs) {
            Ok(MemEntry::File { data, .. }) => {
                let start = (self.pos as usize).min(data.len());
                let end = (start + count).min(data.len());
                self.pos = end as u64;
                Ok(Bytes::copy_from_slice(&data[start..end]))
            }
            Ok(MemEntry::Dir(_)) => Err(FsError::GeneralFailure),
            Err(e) => Err(e),
        };
        drop(root);
        future::ready(res).boxed()
    }

    fn write_buf(&mut self, mut buf: Box<dyn Buf + Send>) -> FsFuture<'_, ()> {
        let mut root = self.root.lock();
        let res = match root.entry_mut(&self.segs) {
            Ok(MemEntry::File { data, modified }) => {
                let mut pos = self.pos as usize;
                // a seek past the end fills the gap with zeroes
                if pos > data.len() {
                    data.resize(pos, 0);
                }
                while buf.has_remaining() {
                    let chunk = buf.chunk();
                    let overlap = chunk.len().min(data.len().saturating_sub(pos));
                    data[pos..pos + overlap].copy_from_slice(&chunk[..overlap]);
                    data.extend_from_slice(&chunk[overlap..]);
                    pos += chunk.len();
                    let n = chunk.len();
                    buf.advance(n);
                }
                self.pos = pos as u64;
                *modified = SystemTime::now();
                Ok(())
            }
            Ok(MemEntry::Dir(_)) => Err(FsError::GeneralFailure),
            Err(e) => Err(e),
        };
        drop(root);
        future::ready(res).boxed()
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        let root = self.root.lock();
        let len = match root.entry(&self.segs) {
            Ok(MemEntry::File { data, .. }) => data.len() as i64,
            _ => 0,
        };
        drop(root);
        let new = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(n) => self.pos as i64 + n,
            SeekFrom::End(n) => len + n,
        };
        let res = if new < 0 {
            Err(FsError::GeneralFailure)
        } else {
            self.pos = new as u64;
            Ok(self.pos)
        };
        future::ready(res).boxed()
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        future::ready(Ok(())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> DavPath {
        DavPath::from_url_path(s, "").unwrap()
    }

    #[tokio::test]
    async fn create_write_read_back() {
        let fs = MemFs::new();
        let mut f = fs.create(&p("/a.txt")).await.unwrap();
        f.write_buf(Box::new(Bytes::from_static(b"hello")))
            .await
            .unwrap();

        let mut f = fs.open(&p("/a.txt")).await.unwrap();
        let info = f.stat().await.unwrap();
        assert_eq!((info.len, info.is_dir), (5, false));
        assert_eq!(&f.read_bytes(16).await.unwrap()[..], b"hello");
        assert!(f.read_bytes(16).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_truncates() {
        let fs = MemFs::new();
        let mut f = fs.create(&p("/a")).await.unwrap();
        f.write_buf(Box::new(Bytes::from_static(b"0123456789")))
            .await
            .unwrap();
        let mut f = fs.create(&p("/a")).await.unwrap();
        f.write_buf(Box::new(Bytes::from_static(b"xy")))
            .await
            .unwrap();
        let mut f = fs.open(&p("/a")).await.unwrap();
        assert_eq!(f.stat().await.unwrap().len, 2);
    }

    #[tokio::test]
    async fn create_needs_parent() {
        let fs = MemFs::new();
        assert!(fs.create(&p("/missing/a")).await.is_err());
    }

    #[tokio::test]
    async fn mkdir_and_listing() {
        let fs = MemFs::new();
        fs.mkdir(&p("/sub")).await.unwrap();
        assert!(fs.mkdir(&p("/sub")).await.is_err());
        fs.create(&p("/sub/x")).await.unwrap();
        fs.create(&p("/sub/y")).await.unwrap();

        let mut d = fs.open(&p("/sub")).await.unwrap();
        assert!(d.stat().await.unwrap().is_dir);
        let names: Vec<String> = d
            .read_dir(0)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(d.read_dir(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_refuses_non_empty_dir() {
        let fs = MemFs::new();
        fs.mkdir(&p("/sub")).await.unwrap();
        fs.create(&p("/sub/x")).await.unwrap();
        assert!(fs.remove(&p("/sub")).await.is_err());
        fs.remove(&p("/sub/x")).await.unwrap();
        fs.remove(&p("/sub")).await.unwrap();
        assert!(fs.open(&p("/sub")).await.is_err());
    }

    #[tokio::test]
    async fn seek_positions_reads_and_writes() {
        let fs = MemFs::new();
        let mut f = fs.create(&p("/a")).await.unwrap();
        f.write_buf(Box::new(Bytes::from_static(b"0123456789")))
            .await
            .unwrap();
        assert_eq!(f.seek(SeekFrom::Start(4)).await.unwrap(), 4);
        f.write_buf(Box::new(Bytes::from_static(b"xx")))
            .await
            .unwrap();

        let mut f = fs.open(&p("/a")).await.unwrap();
        assert_eq!(&f.read_bytes(16).await.unwrap()[..], b"0123xx6789");
        assert_eq!(f.seek(SeekFrom::End(-2)).await.unwrap(), 8);
        assert_eq!(&f.read_bytes(16).await.unwrap()[..], b"89");
    }
}
