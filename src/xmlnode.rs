//! Element tree for XML request bodies.
//!
//! The tree is an arena: nodes live in one `Vec` and refer to their parent
//! and children by index, so the upward links never form owning cycles.
//! Only element structure is retained; the handler does not consume text
//! content.

use xml::reader::{EventReader, XmlEvent};

use crate::errors::DavError;
use crate::DavResult;

pub(crate) struct XmlDoc {
    nodes: Vec<XmlNode>,
}

struct XmlNode {
    namespace: String,
    local: String,
    attributes: Vec<(String, String)>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Borrowed handle on one node of an [`XmlDoc`].
#[derive(Clone, Copy)]
pub(crate) struct NodeRef<'a> {
    doc: &'a XmlDoc,
    id: usize,
}

impl XmlDoc {
    /// Build the tree from a UTF-8 XML byte stream.
    ///
    /// Construction walks the token stream: a start-element attaches a new
    /// node under the current one and becomes current, an end-element moves
    /// current back to its parent. Reader errors, documents without a root,
    /// and elements outside any namespace all fail with `MalformedXml`.
    pub fn parse(data: &[u8]) -> DavResult<XmlDoc> {
        let mut doc = XmlDoc { nodes: Vec::new() };
        let mut cur: Option<usize> = None;

        for event in EventReader::new(data) {
            match event.map_err(|_| DavError::MalformedXml)? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    let namespace = name.namespace.ok_or(DavError::MalformedXml)?;
                    let id = doc.nodes.len();
                    doc.nodes.push(XmlNode {
                        namespace,
                        local: name.local_name,
                        attributes: attributes
                            .into_iter()
                            .map(|a| (a.name.local_name, a.value))
                            .collect(),
                        parent: cur,
                        children: Vec::new(),
                    });
                    if let Some(parent) = cur {
                        doc.nodes[parent].children.push(id);
                    }
                    cur = Some(id);
                }
                XmlEvent::EndElement { .. } => {
                    let id = cur.ok_or(DavError::MalformedXml)?;
                    cur = doc.nodes[id].parent;
                }
                _ => {}
            }
        }

        if doc.nodes.is_empty() || cur.is_some() {
            return Err(DavError::MalformedXml);
        }
        Ok(doc)
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef { doc: self, id: 0 }
    }
}

impl<'a> NodeRef<'a> {
    fn node(&self) -> &'a XmlNode {
        &self.doc.nodes[self.id]
    }

    pub fn local_name(&self) -> &'a str {
        &self.node().local
    }

    pub fn namespace(&self) -> &'a str {
        &self.node().namespace
    }

    #[allow(dead_code)]
    pub fn attributes(&self) -> &'a [(String, String)] {
        &self.node().attributes
    }

    #[allow(dead_code)]
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| NodeRef { doc: self.doc, id })
    }

    /// Child elements whose local name matches; `"*"` matches all.
    pub fn children(&self, name: &str) -> Vec<NodeRef<'a>> {
        self.node()
            .children
            .iter()
            .map(|&id| NodeRef { doc: self.doc, id })
            .filter(|c| name == "*" || c.local_name() == name)
            .collect()
    }

    pub fn first_child(&self, name: &str) -> Option<NodeRef<'a>> {
        self.children(name).into_iter().next()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.first_child(name).is_some()
    }
}
