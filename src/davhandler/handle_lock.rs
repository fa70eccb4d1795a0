//
// Reserved endpoints. The read-only and locked-path precondition checks
// already ran in the dispatcher; until a property store and a real lock
// table land, these answer 501. Replacing them does not touch the
// dispatcher: a real LOCK/UNLOCK goes through the DavLockSystem hooks.
//
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::DavResult;

impl crate::DavHandler {
    // http://www.webdav.org/specs/rfc4918.html#METHOD_PROPPATCH
    pub(crate) async fn handle_proppatch(&self, _req: &Request<()>) -> DavResult<Response<Body>> {
        Err(StatusCode::NOT_IMPLEMENTED.into())
    }

    // http://www.webdav.org/specs/rfc4918.html#METHOD_LOCK
    pub(crate) async fn handle_lock(&self, _req: &Request<()>) -> DavResult<Response<Body>> {
        Err(StatusCode::NOT_IMPLEMENTED.into())
    }

    // http://www.webdav.org/specs/rfc4918.html#METHOD_UNLOCK
    pub(crate) async fn handle_unlock(&self, _req: &Request<()>) -> DavResult<Response<Body>> {
        Err(StatusCode::NOT_IMPLEMENTED.into())
    }
}
