//! Translation between request URL paths and resource paths.

use std::fmt;
use std::path::{PathBuf, MAIN_SEPARATOR};

use http::uri::Uri;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::errors::DavError;
use crate::DavResult;

// Characters that are percent-encoded when a path becomes a URL again.
const URL_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A resource path under the handler's prefix.
///
/// Stored in normalized relative form: percent-decoded, no leading or
/// trailing slash, `.` segments collapsed, `..` clamped at the root. The
/// root itself is the empty string. Segments never contain NUL or, on hosts
/// whose native separator is not `/`, that separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavPath {
    rel: String,
    prefix: String,
}

impl DavPath {
    /// Translate a request URI to a resource path, stripping `prefix`.
    ///
    /// An empty URL path, or one outside the prefix, maps to the root.
    pub(crate) fn from_uri_and_prefix(uri: &Uri, prefix: &str) -> DavResult<DavPath> {
        DavPath::from_url_path(uri.path(), prefix)
    }

    pub(crate) fn from_url_path(raw: &str, prefix: &str) -> DavResult<DavPath> {
        let prefix = normalize_prefix(prefix);
        if raw.is_empty() {
            return Ok(DavPath {
                rel: String::new(),
                prefix,
            });
        }
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| DavError::InvalidCharPath)?;
        let rel = match decoded.strip_prefix(prefix.as_str()) {
            Some(rest) => sanitize(rest)?,
            None => String::new(),
        };
        Ok(DavPath { rel, prefix })
    }

    /// The root of the tree the handler serves.
    pub(crate) fn root(prefix: &str) -> DavPath {
        DavPath {
            rel: String::new(),
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn is_root(&self) -> bool {
        self.rel.is_empty()
    }

    /// Last path segment; empty for the root.
    pub fn file_name(&self) -> &str {
        self.rel.rsplit('/').next().unwrap_or("")
    }

    /// The path of a direct member of this collection.
    pub fn child(&self, name: &str) -> DavPath {
        let rel = if self.rel.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.rel, name)
        };
        DavPath {
            rel,
            prefix: self.prefix.clone(),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.rel.split('/').filter(|s| !s.is_empty())
    }

    /// Relative path for joining below a backend's base directory.
    pub fn as_rel_ospath(&self) -> PathBuf {
        let mut p = PathBuf::new();
        for seg in self.segments() {
            p.push(seg);
        }
        p
    }

    /// Rejoin prefix and path into a root-relative URL, with exactly one
    /// slash at every boundary and the segments percent-encoded.
    pub fn as_url_string(&self) -> String {
        let mut url = self.prefix.clone();
        url.push('/');
        let mut first = true;
        for seg in self.segments() {
            if !first {
                url.push('/');
            }
            first = false;
            url.push_str(&utf8_percent_encode(seg, URL_ENCODE).to_string());
        }
        url
    }
}

impl fmt::Display for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.rel)
    }
}

/// Normalize a configured prefix to `""` or `/segment[/segment..]`.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let p = prefix.trim_matches('/');
    if p.is_empty() {
        String::new()
    } else {
        format!("/{p}")
    }
}

fn sanitize(path: &str) -> DavResult<String> {
    if path.contains('\0') || (MAIN_SEPARATOR != '/' && path.contains(MAIN_SEPARATOR)) {
        return Err(DavError::InvalidCharPath);
    }
    let mut segs: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            // `..` cannot escape the root.
            ".." => {
                segs.pop();
            }
            s => segs.push(s),
        }
    }
    Ok(segs.join("/"))
}
