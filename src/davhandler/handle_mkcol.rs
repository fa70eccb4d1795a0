//
// MKCOL: create a collection.
// http://www.webdav.org/specs/rfc4918.html#METHOD_MKCOL
//
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::errors::DavError;
use crate::xmlnode::XmlDoc;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_mkcol(
        &self,
        req: &Request<()>,
        body: &[u8],
    ) -> DavResult<Response<Body>> {
        let path = self.path(req);

        if self.path_exists(&path).await {
            let allow = self.methods_allowed(&path).await;
            let res = Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header("allow", allow)
                .header("content-length", "0")
                .body(Body::empty())
                .unwrap();
            return Ok(res);
        }

        // A MKCOL body has no defined semantics here: a malformed one is a
        // bad request, a well-formed one is an unsupported media type.
        if !body.is_empty() {
            XmlDoc::parse(body)?;
            return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE.into());
        }

        self.fs
            .mkdir(&path)
            .await
            .map_err(|_| DavError::Status(StatusCode::CONFLICT))?;

        Ok(Response::builder()
            .status(StatusCode::CREATED)
            .header("content-length", "0")
            .body(Body::empty())
            .unwrap())
    }
}
