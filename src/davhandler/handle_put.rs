//
// PUT: truncate-create the target and stream the request body into it.
// http://www.webdav.org/specs/rfc4918.html#METHOD_PUT
//
use std::error::Error as StdError;
use std::io;

use bytes::Buf;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::errors::DavError;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_put<ReqBody, ReqData, ReqError>(
        &self,
        req: &Request<()>,
        body: ReqBody,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let path = self.path(req);

        // Collections are created with MKCOL, not PUT.
        let existed = match self.stat_path(&path).await {
            Ok(info) if info.is_dir => {
                return Err(StatusCode::METHOD_NOT_ALLOWED.into());
            }
            Ok(_) => true,
            Err(_) => false,
        };

        let mut file = self
            .fs
            .create(&path)
            .await
            .map_err(|_| DavError::Status(StatusCode::CONFLICT))?;

        pin_utils::pin_mut!(body);
        while let Some(chunk) = body.data().await {
            let buf = chunk.map_err(|_| {
                DavError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "UnexpectedEof",
                ))
            })?;
            file.write_buf(Box::new(buf))
                .await
                .map_err(|_| DavError::Status(StatusCode::CONFLICT))?;
        }
        file.flush()
            .await
            .map_err(|_| DavError::Status(StatusCode::CONFLICT))?;

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
