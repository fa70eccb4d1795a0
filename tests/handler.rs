//
// Integration tests that drive the handler through its public API, the
// way an HTTP server frontend would.
//
use std::sync::Arc;

use futures_util::StreamExt;
use http::{Request, Response, StatusCode};

use dav_engine::body::Body;
use dav_engine::davpath::DavPath;
use dav_engine::ls::{DavLockSystem, LockError, LockRecord};
use dav_engine::{DavHandler, FileSystem};

fn memfs_handler() -> DavHandler {
    DavHandler::builder(FileSystem::Mem).build()
}

async fn request(
    handler: &DavHandler,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    handler.handle(req).await
}

async fn body_string(res: Response<Body>) -> String {
    let mut body = res.into_body();
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    String::from_utf8(out).unwrap()
}

fn header<'a>(res: &'a Response<Body>, name: &str) -> &'a str {
    res.headers()
        .get(name)
        .map(|v| v.to_str().unwrap())
        .unwrap_or("")
}

// ── OPTIONS ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn options_on_existing_collection() {
    let h = memfs_handler();
    let res = request(&h, "OPTIONS", "/", &[], "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "dav"), "1, 2");
    assert_eq!(header(&res, "ms-author-via"), "DAV");
    let allow = header(&res, "allow");
    for m in [
        "OPTIONS", "GET", "HEAD", "POST", "DELETE", "TRACE", "PROPPATCH", "COPY", "MOVE", "LOCK",
        "UNLOCK", "PROPFIND", "PUT",
    ] {
        assert!(allow.contains(m), "missing {m} in {allow}");
    }
}

#[tokio::test]
async fn options_on_unmapped_path() {
    let h = memfs_handler();
    let res = request(&h, "OPTIONS", "/nosuch", &[], "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "allow"), "OPTIONS, MKCOL, PUT, LOCK");
}

#[tokio::test]
async fn options_on_file_has_no_put() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(&h, "OPTIONS", "/a.txt", &[], "").await;
    let allow = header(&res, "allow");
    assert!(allow.contains("PROPFIND"));
    assert!(!allow.contains("PUT"), "{allow}");
}

// ── PUT / GET ────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_then_get_round_trip() {
    let h = memfs_handler();
    let res = request(&h, "PUT", "/a.txt", &[], "hello").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = request(&h, "GET", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-length"), "5");
    assert!(header(&res, "content-type").starts_with("text/plain"));
    assert_eq!(body_string(res).await, "hello");

    // second PUT overwrites and answers 204
    let res = request(&h, "PUT", "/a.txt", &[], "bye").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = request(&h, "GET", "/a.txt", &[], "").await;
    assert_eq!(body_string(res).await, "bye");
}

#[tokio::test]
async fn put_on_collection_is_refused() {
    let h = memfs_handler();
    request(&h, "MKCOL", "/sub", &[], "").await;
    let res = request(&h, "PUT", "/sub", &[], "data").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn put_without_parent_conflicts() {
    let h = memfs_handler();
    let res = request(&h, "PUT", "/missing/a.txt", &[], "data").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn get_missing_is_404_and_head_has_no_body() {
    let h = memfs_handler();
    let res = request(&h, "GET", "/nosuch", &[], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(&h, "HEAD", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-length"), "5");
    assert_eq!(body_string(res).await, "");
}

#[tokio::test]
async fn post_serves_as_get() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(&h, "POST", "/a.txt", &[], "ignored").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "hello");
}

#[tokio::test]
async fn get_honors_single_range() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;

    let res = request(&h, "GET", "/a.txt", &[("range", "bytes=1-3")], "").await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&res, "content-range"), "bytes 1-3/5");
    assert_eq!(header(&res, "content-length"), "3");
    assert_eq!(body_string(res).await, "ell");

    let res = request(&h, "GET", "/a.txt", &[("range", "bytes=100-")], "").await;
    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&res, "content-range"), "bytes */5");
}

#[tokio::test]
async fn get_conditionals() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;

    let res = request(&h, "GET", "/a.txt", &[], "").await;
    let etag = header(&res, "etag").to_string();
    assert!(!etag.is_empty());

    let res = request(&h, "GET", "/a.txt", &[("if-none-match", etag.as_str())], "").await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);

    let res = request(
        &h,
        "GET",
        "/a.txt",
        &[("if-modified-since", "Fri, 01 Jan 2100 00:00:00 GMT")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
}

// ── MKCOL ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mkcol_creates_collection() {
    let h = memfs_handler();
    let res = request(&h, "MKCOL", "/sub", &[], "").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    // PROPFIND Depth 0 reports resourcetype collection
    let res = request(&h, "PROPFIND", "/sub", &[("depth", "0")], "").await;
    assert_eq!(res.status().as_u16(), 207);
    let xml = body_string(res).await;
    assert!(xml.contains("<resourcetype><collection /></resourcetype>"), "{xml}");
}

#[tokio::test]
async fn mkcol_on_existing_is_405_with_allow() {
    let h = memfs_handler();
    request(&h, "MKCOL", "/sub", &[], "").await;
    let res = request(&h, "MKCOL", "/sub", &[], "").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(header(&res, "allow").contains("PROPFIND"));
}

#[tokio::test]
async fn mkcol_bodies() {
    let h = memfs_handler();
    // well-formed body: no semantics defined
    let res = request(&h, "MKCOL", "/a", &[], r#"<mkcol xmlns="DAV:"/>"#).await;
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    // malformed body
    let res = request(&h, "MKCOL", "/b", &[], "<not-xml").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    // without a parent
    let res = request(&h, "MKCOL", "/missing/sub", &[], "").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

// ── PROPFIND ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn propfind_depth1_partitions_properties() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    request(&h, "MKCOL", "/sub", &[], "").await;

    let body = r#"<propfind xmlns='DAV:'><prop><displayname/><getcontentlength/></prop></propfind>"#;
    let res = request(&h, "PROPFIND", "/", &[("depth", "1")], body).await;
    assert_eq!(res.status().as_u16(), 207);
    assert!(header(&res, "content-type").starts_with("application/xml"));
    let content_length: usize = header(&res, "content-length").parse().unwrap();
    let xml = body_string(res).await;
    assert_eq!(content_length, xml.len());

    let responses: Vec<&str> = xml.split("<response>").skip(1).collect();
    assert_eq!(responses.len(), 3, "{xml}");

    let file = responses
        .iter()
        .find(|r| r.contains("/a.txt</href>"))
        .unwrap();
    assert!(file.contains("<displayname>a.txt</displayname>"));
    assert!(file.contains("<getcontentlength>5</getcontentlength>"));

    // the collection's getcontentlength moves into the 404 group
    let sub = responses.iter().find(|r| r.contains("/sub/</href>")).unwrap();
    assert!(sub.contains("<displayname>sub</displayname>"));
    let not_found = sub.split("<propstat>").last().unwrap();
    assert!(not_found.contains("<getcontentlength />"), "{sub}");
    assert!(not_found.contains("HTTP/1.1 404 Not Found"), "{sub}");
}

#[tokio::test]
async fn propfind_depth_policy() {
    let h = memfs_handler();
    for headers in [&[][..], &[("depth", "infinity")][..]] {
        let res = request(&h, "PROPFIND", "/", headers, "").await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
    let res = request(&h, "PROPFIND", "/", &[("depth", "2")], "").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn propfind_missing_target_is_404() {
    let h = memfs_handler();
    let res = request(&h, "PROPFIND", "/nosuch", &[("depth", "0")], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn propfind_bad_bodies() {
    let h = memfs_handler();
    let res = request(&h, "PROPFIND", "/", &[("depth", "0")], "<oops").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = request(
        &h,
        "PROPFIND",
        "/",
        &[("depth", "0")],
        r#"<lockinfo xmlns="DAV:"/>"#,
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn propfind_multistatus_is_well_formed() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(&h, "PROPFIND", "/", &[("depth", "1")], "").await;
    assert_eq!(res.status().as_u16(), 207);
    let xml = body_string(res).await;

    let mut root: Option<xml::name::OwnedName> = None;
    let mut responses = 0;
    for event in xml::reader::EventReader::new(xml.as_bytes()) {
        if let xml::reader::XmlEvent::StartElement { name, .. } = event.unwrap() {
            if root.is_none() {
                root = Some(name.clone());
            }
            if name.local_name == "response" {
                responses += 1;
            }
        }
    }
    let root = root.unwrap();
    assert_eq!(root.local_name, "multistatus");
    assert_eq!(root.namespace.as_deref(), Some("DAV:"));
    assert!(responses >= 1);
}

#[tokio::test]
async fn propfind_disabled_listings() {
    let h = DavHandler::builder(FileSystem::Mem).listings(false).build();
    let res = request(&h, "PROPFIND", "/", &[("depth", "0")], "").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = header(&res, "allow");
    assert!(!allow.contains("PROPFIND"), "{allow}");
}

// ── COPY / MOVE ──────────────────────────────────────────────────────────

#[tokio::test]
async fn copy_file_then_get() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;

    let res = request(
        &h,
        "COPY",
        "/a.txt",
        &[
            ("destination", "http://localhost/b.txt"),
            ("overwrite", "F"),
        ],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = request(&h, "GET", "/b.txt", &[], "").await;
    assert_eq!(body_string(res).await, "hello");

    // overwrite=F on the now-existing destination
    let res = request(
        &h,
        "COPY",
        "/a.txt",
        &[
            ("destination", "http://localhost/b.txt"),
            ("overwrite", "F"),
        ],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::PRECONDITION_FAILED);

    // default overwrite replaces and answers 204
    request(&h, "PUT", "/c.txt", &[], "other").await;
    let res = request(
        &h,
        "COPY",
        "/c.txt",
        &[("destination", "http://localhost/b.txt")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = request(&h, "GET", "/b.txt", &[], "").await;
    assert_eq!(body_string(res).await, "other");
}

#[tokio::test]
async fn copy_requires_destination() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(&h, "COPY", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = request(&h, "COPY", "/a.txt", &[("destination", "::notaurl::")], "").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn copy_across_hosts_is_bad_gateway() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(
        &h,
        "COPY",
        "/a.txt",
        &[("destination", "http://elsewhere/b.txt")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn copy_outside_prefix_is_bad_gateway() {
    let h = DavHandler::builder(FileSystem::Mem)
        .strip_prefix("/dav")
        .build();
    request(&h, "PUT", "/dav/a.txt", &[], "hello").await;
    let res = request(
        &h,
        "COPY",
        "/dav/a.txt",
        &[("destination", "http://localhost/other/b.txt")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn copy_collection_deep_and_depth_zero() {
    let h = memfs_handler();
    request(&h, "MKCOL", "/sub", &[], "").await;
    request(&h, "PUT", "/sub/a.txt", &[], "one").await;
    request(&h, "MKCOL", "/sub/nested", &[], "").await;
    request(&h, "PUT", "/sub/nested/b.txt", &[], "two").await;

    let res = request(
        &h,
        "COPY",
        "/sub",
        &[("destination", "http://localhost/deep")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = request(&h, "GET", "/deep/nested/b.txt", &[], "").await;
    assert_eq!(body_string(res).await, "two");

    let res = request(
        &h,
        "COPY",
        "/sub",
        &[("destination", "http://localhost/shallow"), ("depth", "0")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = request(&h, "GET", "/shallow/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = request(&h, "PROPFIND", "/shallow", &[("depth", "1")], "").await;
    assert_eq!(res.status().as_u16(), 207);
}

#[tokio::test]
async fn move_renames() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(
        &h,
        "MOVE",
        "/a.txt",
        &[("destination", "http://localhost/b.txt")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = request(&h, "GET", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = request(&h, "GET", "/b.txt", &[], "").await;
    assert_eq!(body_string(res).await, "hello");
}

#[tokio::test]
async fn move_onto_itself_is_forbidden() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(
        &h,
        "MOVE",
        "/a.txt",
        &[("destination", "http://localhost/a.txt")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = request(&h, "GET", "/a.txt", &[], "").await;
    assert_eq!(body_string(res).await, "hello");
}

// ── DELETE ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_file_and_collection() {
    let h = memfs_handler();
    request(&h, "PUT", "/a.txt", &[], "hello").await;
    let res = request(&h, "DELETE", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = request(&h, "GET", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    request(&h, "MKCOL", "/sub", &[], "").await;
    request(&h, "PUT", "/sub/x", &[], "1").await;
    request(&h, "MKCOL", "/sub/nested", &[], "").await;
    request(&h, "PUT", "/sub/nested/y", &[], "2").await;
    let res = request(&h, "DELETE", "/sub", &[], "").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = request(&h, "PROPFIND", "/sub", &[("depth", "0")], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_missing_is_404() {
    let h = memfs_handler();
    let res = request(&h, "DELETE", "/nosuch", &[], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Lock interaction ─────────────────────────────────────────────────────

// Lock table that holds one unconditional lock on a fixed path.
struct PathLock(&'static str);

impl DavLockSystem for PathLock {
    fn lock(&self, _path: &DavPath, _record: LockRecord) -> Result<LockRecord, LockError> {
        Err(LockError::NotImplemented)
    }
    fn unlock(&self, _path: &DavPath, _token: &str) -> Result<(), LockError> {
        Err(LockError::NotImplemented)
    }
    fn is_locked(&self, path: &DavPath, _submitted: &str) -> bool {
        path.as_url_string() == self.0
    }
}

#[tokio::test]
async fn delete_skips_locked_child() {
    let h = DavHandler::builder(FileSystem::Mem)
        .locksystem(Arc::new(PathLock("/sub/c")))
        .build();
    request(&h, "MKCOL", "/sub", &[], "").await;
    request(&h, "PUT", "/sub/c", &[], "locked").await;

    let res = request(&h, "DELETE", "/sub", &[], "").await;
    assert_eq!(res.status().as_u16(), 207);
    let xml = body_string(res).await;
    assert!(xml.contains("/sub/c</href>"), "{xml}");
    assert!(xml.contains("HTTP/1.1 423 Locked"), "{xml}");

    // the locked child and its collection are still there
    let res = request(&h, "GET", "/sub/c", &[], "").await;
    assert_eq!(body_string(res).await, "locked");
}

#[tokio::test]
async fn mutating_locked_target_is_423() {
    let h = DavHandler::builder(FileSystem::Mem)
        .locksystem(Arc::new(PathLock("/a.txt")))
        .build();
    let res = request(&h, "PUT", "/a.txt", &[], "x").await;
    assert_eq!(res.status(), StatusCode::LOCKED);
    let res = request(&h, "GET", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Read-only mode ───────────────────────────────────────────────────────

#[tokio::test]
async fn read_only_refuses_mutation() {
    let h = DavHandler::builder(FileSystem::Mem).read_only(true).build();
    for method in [
        "PUT", "DELETE", "MKCOL", "PROPPATCH", "COPY", "MOVE", "LOCK", "UNLOCK",
    ] {
        let res = request(&h, method, "/a.txt", &[], "").await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{method}");
    }
    // nothing was written
    let res = request(&h, "GET", "/a.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    // reads still work
    let res = request(&h, "OPTIONS", "/", &[], "").await;
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Reserved endpoints, dispatch ─────────────────────────────────────────

#[tokio::test]
async fn reserved_endpoints_are_501() {
    let h = memfs_handler();
    for method in ["PROPPATCH", "LOCK", "UNLOCK"] {
        let res = request(&h, method, "/", &[], "").await;
        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED, "{method}");
    }
}

#[tokio::test]
async fn unknown_method_is_400() {
    let h = memfs_handler();
    let res = request(&h, "BREW", "/", &[], "").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stray_body_is_415() {
    let h = memfs_handler();
    let res = request(&h, "DELETE", "/a", &[], "stray").await;
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

// ── Prefix handling ──────────────────────────────────────────────────────

#[tokio::test]
async fn prefix_is_transparent() {
    let h = DavHandler::builder(FileSystem::Mem)
        .strip_prefix("/dav")
        .build();
    let res = request(&h, "PUT", "/dav/a.txt", &[], "hello").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = request(&h, "GET", "/dav/a.txt", &[], "").await;
    assert_eq!(body_string(res).await, "hello");

    let res = request(&h, "PROPFIND", "/dav/", &[("depth", "1")], "").await;
    let xml = body_string(res).await;
    assert!(xml.contains("<href>http://localhost/dav/</href>"), "{xml}");
    assert!(xml.contains("<href>http://localhost/dav/a.txt</href>"), "{xml}");

    let res = request(
        &h,
        "COPY",
        "/dav/a.txt",
        &[("destination", "http://localhost/dav/b.txt")],
        "",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = request(&h, "GET", "/dav/b.txt", &[], "").await;
    assert_eq!(body_string(res).await, "hello");
}

// ── Path sanitization against a real directory ───────────────────────────

#[tokio::test]
async fn traversal_cannot_escape_the_base_directory() {
    let dir = tempfile::tempdir().unwrap();
    let h = DavHandler::builder(FileSystem::local(dir.path())).build();

    let res = request(&h, "PUT", "/../escape.txt", &[], "inside").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(dir.path().join("escape.txt").exists());
    assert!(!dir.path().parent().unwrap().join("escape.txt").exists());

    let res = request(&h, "GET", "/%2e%2e/escape.txt", &[], "").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "inside");
}
