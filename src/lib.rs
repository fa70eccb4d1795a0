//! ## Generic async HTTP/Webdav origin server engine
//!
//! [`Webdav`] (RFC4918) is defined as HTTP (GET/HEAD/PUT/DELETE) plus a
//! bunch of extension methods (PROPFIND, MKCOL, COPY, MOVE, LOCK, etc).
//! These extension methods are used to manage collections (like unix
//! directories), get information on collections (like unix `ls` or
//! `readdir`), rename and copy items, lock/unlock items.
//!
//! A `handler` is a piece of code that takes a `http::Request`, processes
//! it in some way, and then generates a `http::Response`. This library is
//! a `handler` that maps the HTTP/Webdav protocol to a filesystem. Or
//! actually, "a" filesystem: you supply any implementation of the
//! [`DavFileSystem`][crate::fs::DavFileSystem] capability, and two come
//! included — a local-directory backend and an ephemeral in-memory
//! backend.
//!
//! The handler works with the standard http types from the `http` and
//! `http_body` crates, so it can be used straight away with http
//! libraries / frameworks that also work with those types, like hyper.
//!
//! ## What is implemented.
//!
//! OPTIONS, GET, HEAD, POST (served as GET), PUT, DELETE, MKCOL, PROPFIND
//! (Depth 0 and 1; Depth infinity is refused by policy), COPY and MOVE
//! with per-resource 207 Multi-Status reporting on partial failure.
//! PROPPATCH, LOCK and UNLOCK are reserved: the dispatcher runs their
//! precondition checks and the handlers answer 501 until a property store
//! and a lock table land. The [lock hooks][crate::ls::DavLockSystem] are
//! in place so that a real lock table drops in without dispatcher
//! changes.
//!
//! ## Example.
//!
//! Handler serving `/tmp` under the `/dav` prefix:
//!
//! ```no_run
//! use dav_engine::{DavHandler, FileSystem};
//!
//! let handler = DavHandler::builder(FileSystem::local("/tmp"))
//!     .strip_prefix("/dav")
//!     .build();
//! # let _ = handler;
//! ```
//!
//! See `demos/hyper.rs` for a complete server.
//!
//! [`Webdav`]: https://tools.ietf.org/html/rfc4918

#[macro_use]
extern crate log;

mod davhandler;
mod errors;
mod multistatus;
mod util;
mod xmlnode;

pub mod body;
pub mod client;
pub mod davpath;
pub mod fs;
pub mod ls;

use crate::errors::DavResult;

pub use crate::davhandler::{DavBuilder, DavHandler, FileSystem};
pub use crate::errors::DavError;
pub use crate::util::DavMethod;
