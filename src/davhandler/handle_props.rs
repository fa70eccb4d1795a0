//
// PROPFIND: enumerate the properties of a resource, or of a resource and
// its immediate children, into one 207 Multi-Status document.
// http://www.webdav.org/specs/rfc4918.html#METHOD_PROPFIND
//
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::fs::FileInfo;
use crate::multistatus::{MsBody, MsResponse, MultiStatus, Prop, Propstat, PropValue};
use crate::util::{systemtime_to_httpdate, systemtime_to_rfc3339};
use crate::xmlnode::XmlDoc;
use crate::DavResult;

// The canonical set served for `allprop` and `propname`.
const ALLPROP: &[&str] = &[
    "creationdate",
    "displayname",
    "getcontentlanguage",
    "getcontentlength",
    "getcontenttype",
    "getetag",
    "getlastmodified",
    "lockdiscovery",
    "resourcetype",
    "supportedlock",
];

// What the property source has to say about one requested name.
enum PropLookup {
    Found(PropValue),
    // goes into the 404 propstat group
    NotFound,
}

impl crate::DavHandler {
    pub(crate) async fn handle_propfind(
        &self,
        req: &Request<()>,
        body: &[u8],
    ) -> DavResult<Response<Body>> {
        let path = self.path(req);

        if !self.listings {
            let allow = self.methods_allowed(&path).await;
            let res = Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header("allow", allow)
                .header("content-length", "0")
                .body(Body::empty())
                .unwrap();
            return Ok(res);
        }

        let depth = match req.headers().get("depth").and_then(|v| v.to_str().ok()) {
            Some("0") => 0,
            Some("1") => 1,
            // No Depth header means infinity, and infinity is refused for
            // cost reasons (RFC 4918 §9.1.1 allows that).
            None | Some("") | Some("infinity") => {
                return Err(StatusCode::FORBIDDEN.into());
            }
            Some(_) => return Err(StatusCode::BAD_REQUEST.into()),
        };

        let (names_only, props) = parse_propfind_body(body)?;

        let info = self
            .stat_path(&path)
            .await
            .map_err(|_| DavError::Status(StatusCode::NOT_FOUND))?;

        // The target plus, for Depth 1 on a collection, its members.
        let mut resources: Vec<(DavPath, FileInfo)> = vec![(path.clone(), info.clone())];
        if depth == 1 && info.is_dir {
            for child in self.directory_contents(&path).await {
                let child_path = path.child(&child.name);
                resources.push((child_path, child));
            }
        }

        let base = self.href_base(req);
        let mut ms = MultiStatus::new();
        for (path, info) in &resources {
            let mut href = format!("{base}{}", path.as_url_string());
            if info.is_dir && !href.ends_with('/') {
                href.push('/');
            }

            let mut found = Vec::new();
            let mut missing = Vec::new();
            for name in &props {
                match prop_value(name, info, names_only) {
                    PropLookup::Found(value) => found.push(Prop {
                        name: name.clone(),
                        value,
                    }),
                    PropLookup::NotFound => missing.push(Prop {
                        name: name.clone(),
                        value: PropValue::Empty,
                    }),
                }
            }

            let mut groups = vec![Propstat {
                status: StatusCode::OK,
                props: found,
            }];
            if !missing.is_empty() {
                groups.push(Propstat {
                    status: StatusCode::NOT_FOUND,
                    props: missing,
                });
            }
            ms.push(MsResponse {
                href,
                body: MsBody::Propstat(groups),
            });
        }

        ms.into_response()
    }
}

// Parse the request body into (names-only?, requested property names).
fn parse_propfind_body(body: &[u8]) -> DavResult<(bool, Vec<String>)> {
    let allprop = || ALLPROP.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    // An absent body asks for everything.
    if body.is_empty() {
        return Ok((false, allprop()));
    }

    let doc = XmlDoc::parse(body)?;
    let root = doc.root();
    if root.local_name() != "propfind" || root.namespace() != "DAV:" {
        return Err(StatusCode::BAD_REQUEST.into());
    }

    let mut names_only = false;
    let mut props = Vec::new();

    // find by property
    if let Some(prop) = root.first_child("prop") {
        for p in prop.children("*") {
            props.push(p.local_name().to_string());
        }
    }

    // find property names
    if root.has_child("propname") {
        names_only = true;
        props = allprop();
    }

    // find all properties, plus whatever `include` adds
    if root.has_child("allprop") {
        props = allprop();
        for include in root.children("include") {
            for p in include.children("*") {
                props.push(p.local_name().to_string());
            }
        }
    }

    Ok((names_only, props))
}

fn prop_value(name: &str, info: &FileInfo, names_only: bool) -> PropLookup {
    let text = |f: &dyn Fn() -> String| {
        PropLookup::Found(if names_only {
            PropValue::Empty
        } else {
            PropValue::Text(f())
        })
    };
    match name {
        // the filesystem has no birth time; mtime stands in
        "creationdate" => text(&|| systemtime_to_rfc3339(info.modified)),
        "displayname" => text(&|| info.name.clone()),
        "getcontentlanguage" => text(&|| "en".to_string()),
        // the three size/type/mtime properties exist only on files; for a
        // collection they are reported in the 404 group instead
        "getcontentlength" if info.is_dir => PropLookup::NotFound,
        "getcontentlength" => text(&|| info.len.to_string()),
        "getcontenttype" if info.is_dir => PropLookup::NotFound,
        "getcontenttype" => text(&|| info.content_type().to_string()),
        "getlastmodified" if info.is_dir => PropLookup::NotFound,
        "getlastmodified" => text(&|| systemtime_to_httpdate(info.modified)),
        "resourcetype" => PropLookup::Found(if !names_only && info.is_dir {
            PropValue::Collection
        } else {
            PropValue::Empty
        }),
        "supportedlock" => PropLookup::Found(if names_only {
            PropValue::Empty
        } else {
            PropValue::SupportedLock
        }),
        // getetag and lockdiscovery are not served by this property
        // source; they join the unknown names in the 404 group.
        _ => PropLookup::NotFound,
    }
}
