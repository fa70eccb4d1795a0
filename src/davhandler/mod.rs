//
// This module contains the main entry point of the library,
// DavHandler.
//
use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::buf::Buf;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::davpath::{normalize_prefix, DavPath};
use crate::errors::DavError;
use crate::fs::localfs::LocalFs;
use crate::fs::memfs::MemFs;
use crate::fs::{DavFileSystem, FileInfo, FsResult};
use crate::ls::{DavLockSystem, NoLs};
use crate::util::{dav_method, DavMethod};
use crate::DavResult;

pub mod handle_copymove;
pub mod handle_delete;
pub mod handle_gethead;
pub mod handle_lock;
pub mod handle_mkcol;
pub mod handle_options;
pub mod handle_props;
pub mod handle_put;

// Largest XML request body we are willing to buffer.
const MAX_XML_BODY: usize = 65536;

/// Configuration of the handler.
#[derive(Clone)]
pub struct DavBuilder {
    /// Prefix to be stripped off when handling requests.
    prefix: String,
    /// Filesystem backend.
    fs: FileSystem,
    /// Lock table backend.
    ls: Option<Arc<dyn DavLockSystem>>,
    /// Refuse every mutating method with 403.
    read_only: bool,
    /// Is PROPFIND enabled?
    listings: bool,
}

/// Filesystem backend selection.
#[derive(Clone)]
pub enum FileSystem {
    /// Ephemeral in-memory tree.
    Mem,
    /// A directory on the local filesystem.
    Local {
        /// Path to the root directory.
        base: PathBuf,
    },
    /// Bring your own backend.
    Custom(Arc<dyn DavFileSystem>),
}

impl FileSystem {
    /// Serve a local directory.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        FileSystem::Local { base: path.into() }
    }

    fn build(self) -> Arc<dyn DavFileSystem> {
        match self {
            FileSystem::Mem => MemFs::new(),
            FileSystem::Local { base } => LocalFs::new(base),
            FileSystem::Custom(fs) => fs,
        }
    }
}

impl DavBuilder {
    /// Create a new configuration builder.
    pub fn new(fs: FileSystem) -> DavBuilder {
        DavBuilder {
            prefix: String::new(),
            fs,
            ls: None,
            read_only: false,
            listings: true,
        }
    }

    /// Use the configuration that was built to generate a DavHandler.
    pub fn build(self) -> DavHandler {
        self.into()
    }

    /// Prefix to be stripped off before translating the rest of
    /// the request path to a resource path.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> Self {
        let mut this = self;
        this.prefix = prefix.into();
        this
    }

    /// Set the lock table to use.
    pub fn locksystem(self, ls: Arc<dyn DavLockSystem>) -> Self {
        let mut this = self;
        this.ls = Some(ls);
        this
    }

    /// When set, every mutating method answers 403 and nothing is written.
    pub fn read_only(self, read_only: bool) -> Self {
        let mut this = self;
        this.read_only = read_only;
        this
    }

    /// When disabled, PROPFIND answers 405 (default is enabled).
    pub fn listings(self, listings: bool) -> Self {
        let mut this = self;
        this.listings = listings;
        this
    }
}

/// The webdav handler struct.
///
/// `builder` configures and instantiates a handler; `handle` does the
/// actual work. The handler is cheap to clone and safe to share across
/// concurrent requests.
#[derive(Clone)]
pub struct DavHandler {
    pub(crate) prefix: Arc<String>,
    pub(crate) fs: Arc<dyn DavFileSystem>,
    pub(crate) ls: Arc<dyn DavLockSystem>,
    pub(crate) read_only: bool,
    pub(crate) listings: bool,
}

impl From<DavBuilder> for DavHandler {
    fn from(cfg: DavBuilder) -> Self {
        Self {
            prefix: Arc::new(normalize_prefix(&cfg.prefix)),
            fs: cfg.fs.build(),
            ls: cfg.ls.unwrap_or_else(|| Arc::new(NoLs)),
            read_only: cfg.read_only,
            listings: cfg.listings,
        }
    }
}

impl DavHandler {
    /// Return a configuration builder.
    pub fn builder(fs: FileSystem) -> DavBuilder {
        DavBuilder::new(fs)
    }

    /// Handle a webdav request.
    pub async fn handle<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
    {
        // Turn any DavError results into a HTTP error response.
        match self.handle2(req).await {
            Ok(resp) => {
                debug!("== END REQUEST result OK");
                resp
            }
            Err(err) => {
                debug!("== END REQUEST result {err:?}");
                Response::builder()
                    .status(err.statuscode())
                    .header("content-length", "0")
                    .body(Body::empty())
                    .unwrap()
            }
        }
    }

    // internal dispatcher.
    async fn handle2<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let (req, body) = {
            let (parts, body) = req.into_parts();
            (Request::from_parts(parts, ()), body)
        };

        let method = match dav_method(req.method()) {
            Ok(m) => m,
            Err(e) => {
                debug!("refusing method {} request {}", req.method(), req.uri());
                return Err(e);
            }
        };

        // make sure the request path is valid.
        let path = DavPath::from_uri_and_prefix(req.uri(), &self.prefix)?;

        debug!("== START REQUEST {method:?} {path}");

        // Uniform precondition checks before any mutating handler runs.
        if method.mutates() {
            if self.read_only {
                return Err(DavError::Status(StatusCode::FORBIDDEN));
            }
            if self.ls.is_locked(&path, &submitted_tokens(&req)) {
                return Err(DavError::Status(StatusCode::LOCKED));
            }
        }

        // PUT is the only handler that reads the body itself. All the
        // other handlers either expect no body, or a pre-read Vec<u8>.
        let (body_strm, body_data) = match method {
            DavMethod::Put => (Some(body), Vec::new()),
            _ => (None, self.read_request(body, MAX_XML_BODY).await?),
        };

        // Methods without body semantics refuse one. POST carries whatever
        // the client sent; it is drained and the request serves as GET.
        match method {
            DavMethod::Put
            | DavMethod::Post
            | DavMethod::PropFind
            | DavMethod::PropPatch
            | DavMethod::MkCol
            | DavMethod::Lock => {}
            _ => {
                if !body_data.is_empty() {
                    return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE.into());
                }
            }
        }

        match method {
            DavMethod::Options => self.handle_options(&req).await,
            DavMethod::PropFind => self.handle_propfind(&req, &body_data).await,
            DavMethod::PropPatch => self.handle_proppatch(&req).await,
            DavMethod::MkCol => self.handle_mkcol(&req, &body_data).await,
            DavMethod::Delete => self.handle_delete(&req).await,
            DavMethod::Lock => self.handle_lock(&req).await,
            DavMethod::Unlock => self.handle_unlock(&req).await,
            DavMethod::Get | DavMethod::Head | DavMethod::Post => {
                self.handle_get(&req, method).await
            }
            DavMethod::Copy | DavMethod::Move => self.handle_copymove(&req, method).await,
            DavMethod::Put => self.handle_put(&req, body_strm.unwrap()).await,
        }
    }

    // drain the request body, capped at max_size.
    pub(crate) async fn read_request<ReqBody, ReqData, ReqError>(
        &self,
        body: ReqBody,
        max_size: usize,
    ) -> DavResult<Vec<u8>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut data = Vec::new();
        pin_utils::pin_mut!(body);
        while let Some(res) = body.data().await {
            let mut buf = res.map_err(|_| {
                DavError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "UnexpectedEof",
                ))
            })?;
            while buf.has_remaining() {
                if data.len() + buf.remaining() > max_size {
                    return Err(StatusCode::PAYLOAD_TOO_LARGE.into());
                }
                let b = buf.chunk();
                let l = b.len();
                data.extend_from_slice(b);
                buf.advance(l);
            }
        }
        Ok(data)
    }

    // helper: the request path. This never fails (checked in the dispatcher).
    pub(crate) fn path(&self, req: &Request<()>) -> DavPath {
        DavPath::from_uri_and_prefix(req.uri(), &self.prefix).unwrap()
    }

    // helper: open + stat. The capability has no standalone stat call.
    pub(crate) async fn stat_path(&self, path: &DavPath) -> FsResult<FileInfo> {
        let mut file = self.fs.open(path).await?;
        file.stat().await
    }

    // helper: does the path map to a resource?
    pub(crate) async fn path_exists(&self, path: &DavPath) -> bool {
        self.stat_path(path).await.is_ok()
    }

    // helper: is the path a collection?
    pub(crate) async fn path_is_dir(&self, path: &DavPath) -> bool {
        self.stat_path(path)
            .await
            .map(|info| info.is_dir)
            .unwrap_or(false)
    }

    // helper: immediate children; failures read as an empty collection.
    pub(crate) async fn directory_contents(&self, path: &DavPath) -> Vec<FileInfo> {
        let Ok(mut dir) = self.fs.open(path).await else {
            return Vec::new();
        };
        dir.read_dir(0).await.unwrap_or_default()
    }

    // helper: scheme + host to prepend to root-relative hrefs.
    pub(crate) fn href_base(&self, req: &Request<()>) -> String {
        let host = req
            .headers()
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| req.uri().authority().map(|a| a.as_str()))
            .unwrap_or("");
        format!("http://{host}")
    }
}

// The token material a request submits for lock matching.
pub(crate) fn submitted_tokens(req: &Request<()>) -> String {
    let get = |name| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    };
    format!("{}{}", get("if"), get("lock-token"))
}
