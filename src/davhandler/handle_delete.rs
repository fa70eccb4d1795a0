//
// DELETE: remove a resource, recursively for collections, reporting
// per-member failures in a 207 Multi-Status.
// http://www.webdav.org/specs/rfc4918.html#delete-collections
//
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::submitted_tokens;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::multistatus::MultiStatus;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_delete(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let path = self.path(req);
        match self.delete_resource(&path, req).await? {
            Some(multistatus) => Ok(multistatus),
            None => Ok(Response::builder()
                .status(StatusCode::NO_CONTENT)
                .header("content-length", "0")
                .body(Body::empty())
                .unwrap()),
        }
    }

    /// Remove `path`, recursively for collections.
    ///
    /// `Ok(None)` is complete success, leaving the final status line to the
    /// caller: DELETE answers 204, while MOVE and the overwrite branch of
    /// COPY keep their own status. `Ok(Some(..))` is a 207 carrying the
    /// per-resource failures; `Err` is a single-status failure.
    pub(crate) async fn delete_resource(
        &self,
        path: &DavPath,
        req: &Request<()>,
    ) -> DavResult<Option<Response<Body>>> {
        let submitted = submitted_tokens(req);
        if self.ls.is_locked(path, &submitted) {
            return Err(StatusCode::LOCKED.into());
        }

        let info = self
            .stat_path(path)
            .await
            .map_err(|_| DavError::Status(StatusCode::NOT_FOUND))?;

        if !info.is_dir {
            self.fs
                .remove(path)
                .await
                .map_err(|_| DavError::Status(StatusCode::INTERNAL_SERVER_ERROR))?;
            return Ok(None);
        }

        let mut errors = self.delete_collection(path.clone(), &submitted).await;
        // the emptied collection itself goes last
        if self.fs.remove(path).await.is_err() {
            errors.push((path.clone(), StatusCode::INTERNAL_SERVER_ERROR));
        }

        if errors.is_empty() {
            return Ok(None);
        }
        let base = self.href_base(req);
        let mut ms = MultiStatus::new();
        for (path, status) in errors {
            ms.push_status(format!("{base}{}", path.as_url_string()), status);
        }
        Ok(Some(ms.into_response()?))
    }

    // Depth-first removal of a collection's members. Failures are recorded
    // and the walk carries on; a locked member is skipped whole.
    fn delete_collection<'a>(
        &'a self,
        path: DavPath,
        submitted: &'a str,
    ) -> BoxFuture<'a, Vec<(DavPath, StatusCode)>> {
        async move {
            let mut errors = Vec::new();
            for child in self.directory_contents(&path).await {
                let child_path = path.child(&child.name);
                if self.ls.is_locked(&child_path, submitted) {
                    errors.push((child_path, StatusCode::LOCKED));
                    continue;
                }
                if child.is_dir {
                    errors.extend(self.delete_collection(child_path.clone(), submitted).await);
                }
                if self.fs.remove(&child_path).await.is_err() {
                    errors.push((child_path, StatusCode::INTERNAL_SERVER_ERROR));
                }
            }
            errors
        }
        .boxed()
    }
}
