//
// COPY and MOVE. MOVE is COPY followed by a DELETE of the source that
// does not re-emit the success status.
// http://www.webdav.org/specs/rfc4918.html#copy.for.collections
//
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::{Request, Response, StatusCode};
use url::Url;

use crate::body::Body;
use crate::davhandler::handle_gethead::READ_BUF_SIZE;
use crate::davhandler::submitted_tokens;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::fs::FsResult;
use crate::multistatus::MultiStatus;
use crate::util::DavMethod;
use crate::DavResult;

enum CopyOutcome {
    /// Every resource made it across; `existed` records whether the
    /// destination was already mapped before the copy.
    Done { existed: bool },
    /// Partial failure, reported per-resource in a 207.
    Partial(Response<Body>),
}

impl crate::DavHandler {
    pub(crate) async fn handle_copymove(
        &self,
        req: &Request<()>,
        method: DavMethod,
    ) -> DavResult<Response<Body>> {
        let source = self.path(req);
        match self.copy_resource(req, &source).await? {
            CopyOutcome::Partial(multistatus) => Ok(multistatus),
            CopyOutcome::Done { existed } => {
                if method == DavMethod::Move {
                    // The copy succeeded; a failing delete reports its own
                    // status instead of the copy's.
                    if let Some(multistatus) = self.delete_resource(&source, req).await? {
                        return Ok(multistatus);
                    }
                }
                let status = if existed {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::CREATED
                };
                Ok(Response::builder()
                    .status(status)
                    .header("content-length", "0")
                    .body(Body::empty())
                    .unwrap())
            }
        }
    }

    async fn copy_resource(
        &self,
        req: &Request<()>,
        source: &DavPath,
    ) -> DavResult<CopyOutcome> {
        let destination = req
            .headers()
            .get("destination")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if destination.is_empty() {
            return Err(StatusCode::BAD_REQUEST.into());
        }
        let dest_url =
            Url::parse(destination).map_err(|_| DavError::Status(StatusCode::BAD_REQUEST))?;

        let dest = DavPath::from_url_path(dest_url.path(), &self.prefix)?;
        if *source == dest {
            return Err(StatusCode::FORBIDDEN.into());
        }

        // The destination must be in this server's namespace.
        let req_host = req
            .headers()
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let dest_host = match (dest_url.host_str(), dest_url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        if dest_host != req_host
            || !dest_url.path().starts_with(self.prefix.as_str())
            || !req.uri().path().starts_with(self.prefix.as_str())
        {
            return Err(StatusCode::BAD_GATEWAY.into());
        }

        // Anything except the literal "F" means overwrite.
        let overwrite = req
            .headers()
            .get("overwrite")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("T")
            != "F";
        let existed = self.path_exists(&dest).await;
        if existed {
            if !overwrite {
                return Err(StatusCode::PRECONDITION_FAILED.into());
            }
            // Clear the destination first, suppressing its status.
            match self.delete_resource(&dest, req).await {
                Ok(None) => {}
                Ok(Some(_)) | Err(_) => {
                    return Err(StatusCode::INTERNAL_SERVER_ERROR.into());
                }
            }
        }

        let depth_zero = req.headers().get("depth").and_then(|v| v.to_str().ok()) == Some("0");

        if !self.path_is_dir(source).await {
            self.copy_file(source, &dest)
                .await
                .map_err(|_| DavError::Status(StatusCode::CONFLICT))?;
        } else if depth_zero {
            // copy only the collection, not its members
            self.fs
                .mkdir(&dest)
                .await
                .map_err(|_| DavError::Status(StatusCode::CONFLICT))?;
        } else {
            let mut errors = Vec::new();
            if self.fs.mkdir(&dest).await.is_err() {
                errors.push((source.clone(), StatusCode::INTERNAL_SERVER_ERROR));
            }
            let submitted = submitted_tokens(req);
            errors.extend(
                self.copy_collection(source.clone(), dest.clone(), &submitted)
                    .await,
            );
            if !errors.is_empty() {
                let base = self.href_base(req);
                let mut ms = MultiStatus::new();
                for (path, status) in errors {
                    ms.push_status(format!("{base}{}", path.as_url_string()), status);
                }
                return Ok(CopyOutcome::Partial(ms.into_response()?));
            }
        }

        Ok(CopyOutcome::Done { existed })
    }

    // Byte copy of a single resource.
    async fn copy_file(&self, source: &DavPath, dest: &DavPath) -> FsResult<()> {
        let mut from = self.fs.open(source).await?;
        let mut to = self.fs.create(dest).await?;
        loop {
            let data = from.read_bytes(READ_BUF_SIZE).await?;
            if data.is_empty() {
                break;
            }
            to.write_buf(Box::new(data)).await?;
        }
        to.flush().await
    }

    // Deep copy of a collection's members. Failures are recorded and the
    // walk carries on; a locked member is skipped whole.
    fn copy_collection<'a>(
        &'a self,
        source: DavPath,
        dest: DavPath,
        submitted: &'a str,
    ) -> BoxFuture<'a, Vec<(DavPath, StatusCode)>> {
        async move {
            let mut errors = Vec::new();
            for child in self.directory_contents(&source).await {
                let child_source = source.child(&child.name);
                let child_dest = dest.child(&child.name);
                if self.ls.is_locked(&child_source, submitted) {
                    errors.push((child_source, StatusCode::LOCKED));
                    continue;
                }
                if child.is_dir {
                    if self.fs.mkdir(&child_dest).await.is_err() {
                        errors.push((child_source.clone(), StatusCode::INTERNAL_SERVER_ERROR));
                    }
                    errors.extend(
                        self.copy_collection(child_source, child_dest, submitted)
                            .await,
                    );
                } else if self.copy_file(&child_source, &child_dest).await.is_err() {
                    errors.push((child_source, StatusCode::INTERNAL_SERVER_ERROR));
                }
            }
            errors
        }
        .boxed()
    }
}
