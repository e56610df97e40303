use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::{DocumentError, DocumentFormat};

use super::{NamespaceScope, XmlAttribute, XmlElement, XmlNode};

fn error(message: impl Into<String>) -> DocumentError {
    DocumentError::parse(DocumentFormat::Xml, message)
}

fn open_element(start: &BytesStart<'_>, scope: &mut NamespaceScope) -> Result<XmlElement, DocumentError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| error(format!("bad attribute on <{name}>: {err}")))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| error(format!("bad attribute value on <{name}>: {err}")))?
            .into_owned();
        scope.declare(&key, &value);
        attributes.push(XmlAttribute { name: key, value });
    }

    let namespace = match name.split_once(':') {
        Some((prefix, _)) => match scope.lookup(Some(prefix)) {
            Some(uri) => Some(uri.to_string()),
            None => return Err(error(format!("unbound namespace prefix '{prefix}' on <{name}>"))),
        },
        None => scope.lookup(None).map(str::to_string),
    };

    Ok(XmlElement {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn push_text(element: &mut XmlElement, text: &str) {
    if let Some(XmlNode::Text(existing)) = element.children.last_mut() {
        existing.push_str(text);
    } else {
        element.children.push(XmlNode::Text(text.to_string()));
    }
}

/// Builds an element tree from XML source.
///
/// Whitespace around text is trimmed and whitespace-only text is dropped.
/// Comments, processing instructions and the document type are skipped.
pub(crate) fn parse_document(raw: &str) -> Result<XmlElement, DocumentError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut scope = NamespaceScope::default();
    // each open element remembers how many bindings were in scope before it
    let mut stack: Vec<(XmlElement, usize)> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|err| error(format!("{err} (near byte {position})")))?;
        match event {
            Event::Start(start) => {
                let depth = scope.depth();
                let element = open_element(&start, &mut scope)?;
                if stack.is_empty() && root.is_some() {
                    return Err(error(format!("second root element <{}>", element.name)));
                }
                stack.push((element, depth));
            }
            Event::Empty(start) => {
                let depth = scope.depth();
                let element = open_element(&start, &mut scope)?;
                scope.truncate(depth);
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let Some((element, depth)) = stack.pop() else {
                    return Err(error("closing tag without matching start"));
                };
                scope.truncate(depth);
                attach(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|err| error(err.to_string()))?;
                match stack.last_mut() {
                    Some((element, _)) => push_text(element, &text),
                    None if text.trim().is_empty() => {}
                    None => return Err(error("text outside the root element")),
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = String::from_utf8_lossy(&data);
                match stack.last_mut() {
                    Some((element, _)) => push_text(element, &text),
                    None => return Err(error("CDATA outside the root element")),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((element, _)) = stack.last() {
        return Err(error(format!("unclosed element <{}>", element.name)));
    }
    root.ok_or_else(|| error("document has no root element"))
}

fn attach(element: XmlElement, stack: &mut [(XmlElement, usize)], root: &mut Option<XmlElement>) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some((parent, _)) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_some() => Err(error(format!("second root element <{}>", element.name))),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}
