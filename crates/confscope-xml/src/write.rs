//! `Document` → XML text via `quick-xml`'s writer.

use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::{Document, NodeId, NodeKind};
use crate::error::XmlError;

impl Document {
    /// Serialize the whole document, including the XML declaration and
    /// DOCTYPE when present.
    pub fn to_xml_string(&self, indent: bool) -> Result<String, XmlError> {
        let mut writer = new_writer(indent);
        if let Some(decl) = self.declaration() {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))
                .map_err(XmlError::Write)?;
        }
        if let Some(doctype) = self.doctype() {
            writer
                .write_event(Event::DocType(BytesText::from_escaped(doctype)))
                .map_err(XmlError::Write)?;
        }
        for child in self.children(self.root()) {
            write_node(self, *child, &mut writer).map_err(XmlError::Write)?;
        }
        finish(writer)
    }

    /// Compact markup of a node and its subtree.
    pub fn outer_xml(&self, id: NodeId) -> Result<String, XmlError> {
        let mut writer = new_writer(false);
        write_node(self, id, &mut writer).map_err(XmlError::Write)?;
        finish(writer)
    }

    /// Compact markup of a node's children.
    pub fn inner_xml(&self, id: NodeId) -> Result<String, XmlError> {
        let mut writer = new_writer(false);
        for child in self.children(id) {
            write_node(self, *child, &mut writer).map_err(XmlError::Write)?;
        }
        finish(writer)
    }
}

fn new_writer(indent: bool) -> Writer<Vec<u8>> {
    if indent {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    }
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, XmlError> {
    String::from_utf8(writer.into_inner()).map_err(|err| XmlError::Utf8 {
        position: err.utf8_error().valid_up_to(),
    })
}

fn write_node<W: Write>(
    doc: &Document,
    id: NodeId,
    writer: &mut Writer<W>,
) -> Result<(), quick_xml::Error> {
    match doc.kind(id) {
        NodeKind::Document => {
            for child in doc.children(id) {
                write_node(doc, *child, writer)?;
            }
        }
        NodeKind::Element { name, attributes } => {
            let mut start = BytesStart::new(name.as_str());
            for attr in attributes {
                start.push_attribute((attr.name.as_str(), attr.value.as_str()));
            }
            let children = doc.children(id);
            if children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in children {
                    write_node(doc, *child, writer)?;
                }
                writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
        NodeKind::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        NodeKind::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        NodeKind::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
        }
        NodeKind::ProcessingInstruction(text) => {
            writer.write_event(Event::PI(BytesText::from_escaped(text.as_str())))?
        }
    }
    Ok(())
}
