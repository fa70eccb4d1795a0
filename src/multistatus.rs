//! In-memory construction of 207 Multi-Status responses.
//!
//! The whole document is assembled before it is serialized in one pass, so
//! the response carries an exact Content-Length and no filesystem work runs
//! while the body is going out.

use std::io::{self, Write};

use http::{Response, StatusCode};
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

use crate::body::Body;
use crate::errors::DavError;
use crate::DavResult;

pub(crate) struct MultiStatus {
    responses: Vec<MsResponse>,
}

pub(crate) struct MsResponse {
    pub href: String,
    pub body: MsBody,
}

pub(crate) enum MsBody {
    /// A bare per-resource status, used by the recursive operations.
    Status(StatusCode),
    /// Property groups, used by PROPFIND.
    Propstat(Vec<Propstat>),
}

pub(crate) struct Propstat {
    pub status: StatusCode,
    pub props: Vec<Prop>,
}

pub(crate) struct Prop {
    pub name: String,
    pub value: PropValue,
}

pub(crate) enum PropValue {
    /// `<name/>`
    Empty,
    /// `<name>text</name>`, escaped by the writer
    Text(String),
    /// `<name><collection/></name>`
    Collection,
    /// the two static `lockentry` children of `supportedlock`
    SupportedLock,
}

impl MultiStatus {
    pub fn new() -> MultiStatus {
        MultiStatus {
            responses: Vec::new(),
        }
    }

    pub fn push(&mut self, response: MsResponse) {
        self.responses.push(response);
    }

    pub fn push_status(&mut self, href: String, status: StatusCode) {
        self.push(MsResponse {
            href,
            body: MsBody::Status(status),
        });
    }

    /// Serialize into a complete 207 response.
    pub fn into_response(self) -> DavResult<Response<Body>> {
        let xml = self.serialize()?;
        let res = Response::builder()
            .status(StatusCode::MULTI_STATUS)
            .header("content-type", "application/xml; charset=utf-8")
            .header("content-length", xml.len().to_string())
            .body(Body::from(xml))
            .unwrap();
        Ok(res)
    }

    fn serialize(&self) -> DavResult<Vec<u8>> {
        let mut writer = EmitterConfig::new()
            .write_document_declaration(true)
            .create_writer(Vec::new());
        self.emit(&mut writer)
            .map_err(|e| DavError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
        Ok(writer.into_inner())
    }

    fn emit<W: Write>(&self, w: &mut EventWriter<W>) -> xml::writer::Result<()> {
        w.write(XmlEvent::start_element("multistatus").default_ns("DAV:"))?;
        for response in &self.responses {
            w.write(XmlEvent::start_element("response"))?;
            text_element(w, "href", &response.href)?;
            match &response.body {
                MsBody::Status(status) => status_element(w, *status)?,
                MsBody::Propstat(groups) => {
                    for group in groups {
                        w.write(XmlEvent::start_element("propstat"))?;
                        w.write(XmlEvent::start_element("prop"))?;
                        for prop in &group.props {
                            emit_prop(w, prop)?;
                        }
                        w.write(XmlEvent::end_element())?; // prop
                        status_element(w, group.status)?;
                        w.write(XmlEvent::end_element())?; // propstat
                    }
                }
            }
            w.write(XmlEvent::end_element())?; // response
        }
        w.write(XmlEvent::end_element())?; // multistatus
        Ok(())
    }
}

fn emit_prop<W: Write>(w: &mut EventWriter<W>, prop: &Prop) -> xml::writer::Result<()> {
    w.write(XmlEvent::start_element(prop.name.as_str()))?;
    match &prop.value {
        PropValue::Empty => {}
        PropValue::Text(text) => w.write(XmlEvent::characters(text))?,
        PropValue::Collection => {
            w.write(XmlEvent::start_element("collection"))?;
            w.write(XmlEvent::end_element())?;
        }
        PropValue::SupportedLock => {
            for scope in ["exclusive", "shared"] {
                w.write(XmlEvent::start_element("lockentry"))?;
                w.write(XmlEvent::start_element("lockscope"))?;
                w.write(XmlEvent::start_element(scope))?;
                w.write(XmlEvent::end_element())?;
                w.write(XmlEvent::end_element())?; // lockscope
                w.write(XmlEvent::start_element("locktype"))?;
                w.write(XmlEvent::start_element("write"))?;
                w.write(XmlEvent::end_element())?;
                w.write(XmlEvent::end_element())?; // locktype
                w.write(XmlEvent::end_element())?; // lockentry
            }
        }
    }
    w.write(XmlEvent::end_element())
}

fn text_element<W: Write>(
    w: &mut EventWriter<W>,
    name: &str,
    text: &str,
) -> xml::writer::Result<()> {
    w.write(XmlEvent::start_element(name))?;
    w.write(XmlEvent::characters(text))?;
    w.write(XmlEvent::end_element())
}

fn status_element<W: Write>(w: &mut EventWriter<W>, status: StatusCode) -> xml::writer::Result<()> {
    let line = format!(
        "HTTP/1.1 {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    text_element(w, "status", &line)
}
