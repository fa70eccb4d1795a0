use std::time::{SystemTime, UNIX_EPOCH};

use headers::Header;
use time::format_description::well_known::Rfc3339;
use time::macros::offset;

use crate::errors::DavError;
use crate::DavResult;

/// HTTP methods understood by the handler, WebDAV extensions included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    Options,
    Get,
    Head,
    Post,
    Put,
    Delete,
    PropFind,
    PropPatch,
    MkCol,
    Copy,
    Move,
    Lock,
    Unlock,
}

impl DavMethod {
    /// Does this method change server state? Mutating methods run the
    /// read-only and locked-resource precondition checks before their
    /// handler is entered.
    pub fn mutates(self) -> bool {
        matches!(
            self,
            DavMethod::Put
                | DavMethod::Delete
                | DavMethod::MkCol
                | DavMethod::PropPatch
                | DavMethod::Copy
                | DavMethod::Move
                | DavMethod::Lock
                | DavMethod::Unlock
        )
    }
}

// translate the http method into our own enum that has webdav methods as well.
pub(crate) fn dav_method(m: &http::Method) -> DavResult<DavMethod> {
    let m = match *m {
        http::Method::OPTIONS => DavMethod::Options,
        http::Method::GET => DavMethod::Get,
        http::Method::HEAD => DavMethod::Head,
        http::Method::POST => DavMethod::Post,
        http::Method::PUT => DavMethod::Put,
        http::Method::DELETE => DavMethod::Delete,
        _ => match m.as_str() {
            "PROPFIND" => DavMethod::PropFind,
            "PROPPATCH" => DavMethod::PropPatch,
            "MKCOL" => DavMethod::MkCol,
            "COPY" => DavMethod::Copy,
            "MOVE" => DavMethod::Move,
            "LOCK" => DavMethod::Lock,
            "UNLOCK" => DavMethod::Unlock,
            _ => return Err(DavError::UnknownDavMethod),
        },
    };
    Ok(m)
}

pub(crate) fn systemtime_to_offsetdatetime(t: SystemTime) -> time::OffsetDateTime {
    match t.duration_since(UNIX_EPOCH) {
        Ok(t) => {
            let tm = time::OffsetDateTime::from_unix_timestamp(t.as_secs() as i64).unwrap();
            tm.to_offset(offset!(UTC))
        }
        Err(_) => time::OffsetDateTime::UNIX_EPOCH.to_offset(offset!(UTC)),
    }
}

// `getlastmodified` format, e.g. "Sat, 29 Oct 1994 19:43:31 GMT".
pub(crate) fn systemtime_to_httpdate(t: SystemTime) -> String {
    let d = headers::Date::from(t);
    let mut v = Vec::new();
    d.encode(&mut v);
    v[0].to_str().unwrap().to_owned()
}

// `creationdate` format, e.g. "1996-12-19T16:39:57Z".
pub(crate) fn systemtime_to_rfc3339(t: SystemTime) -> String {
    systemtime_to_offsetdatetime(t).format(&Rfc3339).unwrap()
}
