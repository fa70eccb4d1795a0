//
// GET/HEAD serve a resource's bytes; POST is served as GET.
// http://www.webdav.org/specs/rfc4918.html#rfc.section.9.4
//
use std::io;
use std::ops::Bound;

use async_stream::stream;
use headers::{
    AcceptRanges, ContentLength, ContentRange, ETag, HeaderMapExt, IfModifiedSince, IfNoneMatch,
    LastModified, Range,
};
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::errors::DavError;
use crate::util::DavMethod;
use crate::DavResult;

// Chunk size for streaming file contents.
pub(crate) const READ_BUF_SIZE: usize = 65536;

impl crate::DavHandler {
    pub(crate) async fn handle_get(
        &self,
        req: &Request<()>,
        method: DavMethod,
    ) -> DavResult<Response<Body>> {
        let path = self.path(req);

        let mut file = self
            .fs
            .open(&path)
            .await
            .map_err(|_| DavError::Status(StatusCode::NOT_FOUND))?;
        let info = file
            .stat()
            .await
            .map_err(|_| DavError::Status(StatusCode::NOT_FOUND))?;
        if info.is_dir {
            // collections have no content representation
            return Err(StatusCode::NOT_FOUND.into());
        }

        let mut res = Response::new(Body::empty());
        let etag = format!("\"{}\"", info.etag()).parse::<ETag>().ok();
        res.headers_mut().typed_insert(LastModified::from(info.modified));
        if let Some(etag) = etag.clone() {
            res.headers_mut().typed_insert(etag);
        }
        res.headers_mut().typed_insert(AcceptRanges::bytes());
        res.headers_mut()
            .insert("content-type", info.content_type().to_string().parse().unwrap());

        // Conditionals; an If-None-Match wins over If-Modified-Since.
        let not_modified = if let Some(inm) = req.headers().typed_get::<IfNoneMatch>() {
            match &etag {
                Some(etag) => !inm.precondition_passes(etag),
                None => false,
            }
        } else if let Some(ims) = req.headers().typed_get::<IfModifiedSince>() {
            !ims.is_modified(info.modified)
        } else {
            false
        };
        if not_modified {
            *res.status_mut() = StatusCode::NOT_MODIFIED;
            return Ok(res);
        }

        // A single satisfiable range is honored; multiple ranges serve the
        // whole resource.
        let mut start = 0u64;
        let mut end = info.len;
        if let Some(range) = req.headers().typed_get::<Range>() {
            let mut ranges = range.satisfiable_ranges(info.len);
            match ranges.next() {
                Some((first, last)) => {
                    if ranges.next().is_none() {
                        start = match first {
                            Bound::Included(n) => n,
                            Bound::Excluded(n) => n + 1,
                            Bound::Unbounded => 0,
                        };
                        end = match last {
                            Bound::Included(n) => n + 1,
                            Bound::Excluded(n) => n,
                            Bound::Unbounded => info.len,
                        };
                    }
                }
                None => {
                    let mut res = Response::new(Body::empty());
                    *res.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
                    res.headers_mut()
                        .typed_insert(ContentRange::unsatisfied_bytes(info.len));
                    return Ok(res);
                }
            }
        }

        if start != 0 || end != info.len {
            *res.status_mut() = StatusCode::PARTIAL_CONTENT;
            if let Ok(range) = ContentRange::bytes(start..end, info.len) {
                res.headers_mut().typed_insert(range);
            }
        }
        res.headers_mut().typed_insert(ContentLength(end - start));

        if method == DavMethod::Head {
            return Ok(res);
        }

        *res.body_mut() = Body::stream(stream! {
            if start > 0 {
                if let Err(e) = file.seek(io::SeekFrom::Start(start)).await {
                    yield Err(io::Error::new(io::ErrorKind::Other, e));
                    return;
                }
            }
            let mut pos = start;
            while pos < end {
                let want = std::cmp::min(READ_BUF_SIZE as u64, end - pos) as usize;
                match file.read_bytes(want).await {
                    Ok(data) if data.is_empty() => break,
                    Ok(data) => {
                        pos += data.len() as u64;
                        yield Ok(data);
                    }
                    Err(e) => {
                        yield Err(io::Error::new(io::ErrorKind::Other, e));
                        break;
                    }
                }
            }
        });
        Ok(res)
    }
}
