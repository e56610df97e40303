//! XML document store built on quick-xml.

mod parse;
mod path;

use std::fmt::Display;
use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde_json::Value;
use tracing::debug;

use crate::{Document, DocumentError, DocumentFormat, DocumentStore, Match};

use self::path::{ElementPosition, XmlPath};

/// An attribute as written in the source, including `xmlns` declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its resolved namespace URI.
///
/// `name` keeps the qualified name as written (`x:kiddie`), so a parsed
/// tree serializes back with its original prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, local)| local)
    }

    fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Direct text content, concatenated. `None` when the element has no text.
    pub fn text(&self) -> Option<String> {
        let mut text: Option<String> = None;
        for child in &self.children {
            if let XmlNode::Text(chunk) = child {
                text.get_or_insert_with(String::new).push_str(chunk);
            }
        }
        text
    }

    /// Replaces the direct text content, leaving child elements in place.
    pub fn set_text(&mut self, text: &str) {
        self.children.retain(|child| matches!(child, XmlNode::Element(_)));
        if !text.is_empty() {
            self.children.insert(0, XmlNode::Text(text.to_string()));
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    fn child_element_mut(&mut self, index: usize) -> Option<&mut XmlElement> {
        self.children
            .iter_mut()
            .filter_map(|child| match child {
                XmlNode::Element(element) => Some(element),
                XmlNode::Text(_) => None,
            })
            .nth(index)
    }

    /// Value of a non-namespace-declaration attribute by its name as written.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|attribute| !is_namespace_declaration(&attribute.name))
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|attribute| attribute.name == name) {
            Some(attribute) => attribute.value = value.to_string(),
            None => self.attributes.push(XmlAttribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    fn at(&self, position: &[usize]) -> Option<&XmlElement> {
        position.iter().try_fold(self, |element, index| element.child_elements().nth(*index))
    }

    fn at_mut(&mut self, position: &[usize]) -> Option<&mut XmlElement> {
        position.iter().try_fold(self, |element, index| element.child_element_mut(*index))
    }

    /// Writes the element and its subtree.
    ///
    /// `bindings` holds the namespace declarations already written by
    /// ancestors. A declaration is added wherever the element's namespace is
    /// not the one its prefix is bound to, which covers elements built in
    /// memory and subtrees cut from a larger document.
    fn write_element(&self, writer: &mut XmlWriter, scope: &mut NamespaceScope) -> Result<(), DocumentError> {
        let depth = scope.depth();
        for attribute in &self.attributes {
            scope.declare(&attribute.name, &attribute.value);
        }

        let mut start = BytesStart::new(self.name.as_str());
        let prefix = self.prefix();
        if scope.lookup(prefix) != self.namespace.as_deref() {
            let uri = self.namespace.clone().unwrap_or_default();
            match prefix {
                Some(prefix) if !uri.is_empty() => {
                    let declaration = format!("xmlns:{prefix}");
                    start.push_attribute((declaration.as_str(), uri.as_str()));
                    scope.declare(&declaration, &uri);
                }
                // a prefix cannot be undeclared
                Some(_) => {}
                None => {
                    start.push_attribute(("xmlns", uri.as_str()));
                    scope.declare("xmlns", &uri);
                }
            }
        }
        for attribute in &self.attributes {
            start.push_attribute((attribute.name.as_str(), attribute.value.as_str()));
        }

        if self.children.is_empty() {
            emit(writer, Event::Empty(start))?;
        } else {
            emit(writer, Event::Start(start))?;
            for child in &self.children {
                match child {
                    XmlNode::Element(element) => element.write_element(writer, scope)?,
                    XmlNode::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
                }
            }
            emit(writer, Event::End(BytesEnd::new(self.name.as_str())))?;
        }
        scope.truncate(depth);
        Ok(())
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Namespace bindings in scope, innermost last.
///
/// `None` keys the default namespace; an empty URI undeclares it. Shared by
/// the parser and the writer.
#[derive(Debug, Default)]
struct NamespaceScope {
    bindings: Vec<(Option<String>, String)>,
}

impl NamespaceScope {
    /// Records `name` as a binding when it is an `xmlns` or `xmlns:p` attribute.
    fn declare(&mut self, name: &str, uri: &str) {
        if name == "xmlns" {
            self.bindings.push((None, uri.to_string()));
        } else if let Some(prefix) = name.strip_prefix("xmlns:") {
            self.bindings.push((Some(prefix.to_string()), uri.to_string()));
        }
    }

    /// The URI bound to `prefix`; an undeclared default namespace is `None`.
    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    fn depth(&self) -> usize {
        self.bindings.len()
    }

    fn truncate(&mut self, depth: usize) {
        self.bindings.truncate(depth);
    }
}

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), DocumentError> {
    writer.write_event(event).map_err(serialize_error)
}

fn serialize_error(error: impl Display) -> DocumentError {
    DocumentError::Serialize {
        format: DocumentFormat::Xml,
        message: error.to_string(),
    }
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Store for namespace-aware XML element trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlStore;

fn as_xml(document: &Document) -> Result<&XmlElement, DocumentError> {
    match document {
        Document::Xml(root) => Ok(root),
        other => Err(DocumentError::FormatMismatch {
            store: DocumentFormat::Xml,
            document: other.format(),
        }),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

impl DocumentStore for XmlStore {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Xml
    }

    fn parse(&self, raw: &str) -> Result<Document, DocumentError> {
        parse::parse_document(raw).map(Document::Xml)
    }

    fn resolve(&self, document: &Document, path: &str, namespace: Option<&str>) -> Result<Vec<Match>, DocumentError> {
        let root = as_xml(document)?;
        let compiled = XmlPath::compile(path)?;
        let elements = compiled
            .select(root, namespace)
            .into_iter()
            .filter_map(|position| root.at(&position));

        let matches = match compiled.attribute() {
            Some(attribute) => elements
                .filter_map(|element| element.attribute(attribute))
                .map(|value| Match::Attribute(value.to_string()))
                .collect(),
            None => elements.map(|element| Match::Element(element.clone())).collect(),
        };
        Ok(matches)
    }

    fn serialize(&self, document: &Document) -> Result<String, DocumentError> {
        let root = as_xml(document)?;
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        root.write_element(&mut writer, &mut NamespaceScope::default())?;
        String::from_utf8(writer.into_inner().into_inner()).map_err(serialize_error)
    }

    fn assign(&self, document: &mut Document, path: &str, namespace: Option<&str>, value: &Value) -> Result<bool, DocumentError> {
        let root = match document {
            Document::Xml(root) => root,
            other => {
                return Err(DocumentError::FormatMismatch {
                    store: DocumentFormat::Xml,
                    document: other.format(),
                });
            }
        };
        let Some(text) = scalar_text(value) else {
            debug!(path, "structured values cannot be written into XML");
            return Ok(false);
        };
        let compiled = XmlPath::compile(path)?;
        let mut positions: Vec<ElementPosition> = compiled.select(root, namespace);
        if compiled.attribute().is_none() && positions.len() > 1 {
            return Err(DocumentError::MultipleMatches {
                path: path.to_string(),
                count: positions.len(),
            });
        }

        match compiled.attribute() {
            Some(attribute) => {
                // only elements that already carry the attribute are targets
                positions.retain(|position| root.at(position).and_then(|element| element.attribute(attribute)).is_some());
                if positions.len() > 1 {
                    return Err(DocumentError::MultipleMatches {
                        path: path.to_string(),
                        count: positions.len(),
                    });
                }
                let Some(element) = positions.first().and_then(|position| root.at_mut(position)) else {
                    return Ok(false);
                };
                element.set_attribute(attribute, &text);
                Ok(true)
            }
            None => {
                let Some(element) = positions.first().and_then(|position| root.at_mut(position)) else {
                    return Ok(false);
                };
                element.set_text(&text);
                Ok(true)
            }
        }
    }
}
