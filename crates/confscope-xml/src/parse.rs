//! `quick-xml` event stream → `Document`.

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;

use crate::document::{Attribute, Document, NodeId, NodeKind, XmlDeclaration};
use crate::error::XmlError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes inside elements. Off by default, which
    /// matches how configuration files are usually loaded and lets the writer
    /// re-indent output.
    pub preserve_whitespace: bool,
}

pub(crate) fn parse_document(text: &str, options: ParseOptions) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(false);
    reader.expand_empty_elements(false);

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = vec![doc.root()];

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|source| XmlError::Syntax { position, source })?;
        let parent = *stack.last().unwrap_or(&doc.root());
        let at_top_level = stack.len() == 1;

        match event {
            Event::Start(start) => {
                let element = element_from_start(&mut doc, &start, position)?;
                attach(&mut doc, parent, element, at_top_level)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = element_from_start(&mut doc, &start, position)?;
                attach(&mut doc, parent, element, at_top_level)?;
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(XmlError::UnexpectedEnd { position });
                }
                stack.pop();
            }
            Event::Text(content) => {
                let content = content
                    .unescape()
                    .map_err(|source| XmlError::Syntax { position, source })?;
                let whitespace_only = content.trim().is_empty();
                if at_top_level {
                    if !whitespace_only {
                        return Err(XmlError::TextOutsideRoot { position });
                    }
                    continue;
                }
                if whitespace_only && !options.preserve_whitespace {
                    continue;
                }
                let node = doc.create_node(NodeKind::Text(content.into_owned()));
                doc.append_child(parent, node);
            }
            Event::CData(content) => {
                let content = utf8(&content, position)?;
                if at_top_level {
                    return Err(XmlError::TextOutsideRoot { position });
                }
                let node = doc.create_node(NodeKind::CData(content));
                doc.append_child(parent, node);
            }
            Event::Comment(content) => {
                let node = doc.create_node(NodeKind::Comment(utf8(&content, position)?));
                doc.append_child(parent, node);
            }
            Event::PI(content) => {
                let node =
                    doc.create_node(NodeKind::ProcessingInstruction(utf8(&content, position)?));
                doc.append_child(parent, node);
            }
            Event::Decl(decl) => {
                doc.set_declaration(Some(declaration(&decl, position)?));
            }
            Event::DocType(content) => {
                doc.set_doctype(Some(utf8(&content, position)?.trim().to_string()));
            }
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.get(1) {
        return Err(XmlError::Unclosed {
            name: doc.name(*open).unwrap_or_default().to_string(),
        });
    }
    if doc.document_element().is_none() {
        return Err(XmlError::MissingRoot);
    }
    Ok(doc)
}

fn attach(
    doc: &mut Document,
    parent: NodeId,
    element: NodeId,
    at_top_level: bool,
) -> Result<(), XmlError> {
    if at_top_level && doc.document_element().is_some() {
        return Err(XmlError::MultipleRoots {
            name: doc.name(element).unwrap_or_default().to_string(),
        });
    }
    doc.append_child(parent, element);
    Ok(())
}

fn element_from_start(
    doc: &mut Document,
    start: &BytesStart<'_>,
    position: usize,
) -> Result<NodeId, XmlError> {
    let name = utf8(start.name().as_ref(), position)?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| XmlError::Syntax {
            position,
            source: err.into(),
        })?;
        let key = utf8(attr.key.as_ref(), position)?;
        let value = attr
            .unescape_value()
            .map_err(|source| XmlError::Syntax { position, source })?
            .into_owned();
        attributes.push(Attribute { name: key, value });
    }
    Ok(doc.create_node(NodeKind::Element { name, attributes }))
}

fn declaration(decl: &BytesDecl<'_>, position: usize) -> Result<XmlDeclaration, XmlError> {
    let version = decl
        .version()
        .map_err(|source| XmlError::Syntax { position, source })?;
    let encoding = match decl.encoding() {
        Some(value) => Some(
            value
                .map_err(|err| XmlError::Syntax {
                    position,
                    source: err.into(),
                })
                .and_then(|bytes| utf8(&bytes, position))?,
        ),
        None => None,
    };
    let standalone = match decl.standalone() {
        Some(value) => Some(
            value
                .map_err(|err| XmlError::Syntax {
                    position,
                    source: err.into(),
                })
                .and_then(|bytes| utf8(&bytes, position))?,
        ),
        None => None,
    };
    Ok(XmlDeclaration {
        version: utf8(&version, position)?,
        encoding,
        standalone,
    })
}

fn utf8(bytes: &[u8], position: usize) -> Result<String, XmlError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| XmlError::Utf8 { position })
}
