use http::{Request, Response};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_options(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let path = self.path(req);
        let allow = self.methods_allowed(&path).await;

        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        // Compliance class 2 is advertised because the lock hook points
        // exist even while the reference table stays empty.
        h.insert("DAV", "1, 2".parse().unwrap());
        h.insert("MS-Author-Via", "DAV".parse().unwrap());
        h.insert("allow", allow.parse().unwrap());
        h.insert("content-length", "0".parse().unwrap());
        Ok(res)
    }

    /// The `Allow` set for `path`, computed from its current state. Also
    /// backs the 405 responses of MKCOL and PROPFIND.
    pub(crate) async fn methods_allowed(&self, path: &DavPath) -> String {
        let Ok(info) = self.stat_path(path).await else {
            return "OPTIONS, MKCOL, PUT, LOCK".to_string();
        };

        let mut allowed = String::from(
            "OPTIONS, GET, HEAD, POST, DELETE, TRACE, PROPPATCH, COPY, MOVE, LOCK, UNLOCK",
        );
        if self.listings {
            allowed.push_str(", PROPFIND");
        }
        // a collection accepts PUT for its members
        if info.is_dir {
            allowed.push_str(", PUT");
        }
        allowed
    }
}
