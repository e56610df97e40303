//! Model instances: lazily parsed documents with a per-instance value cache.

use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use docbind_document::{Document, DocumentFormat, XmlElement};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{BindError, FieldValue, Schema};

/// One instance of a [`Schema`].
///
/// The source document is parsed on first field access. Resolved values are
/// cached per field, and writes go to the cache only: the source document is
/// never modified, but [`Model::to_document_string`] renders it with the
/// written values over their paths. Values that were only read are not
/// written back.
#[derive(Clone)]
pub struct Model {
    schema: Arc<Schema>,
    raw: Option<String>,
    document: OnceCell<Document>,
    cache: RefCell<HashMap<String, FieldValue>>,
    /// Fields changed through `set` or `append`.
    written: RefCell<HashSet<String>>,
}

impl Model {
    /// An instance with no source: every field yields its default.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            raw: None,
            document: OnceCell::new(),
            cache: RefCell::new(HashMap::new()),
            written: RefCell::new(HashSet::new()),
        }
    }

    /// An instance backed by raw source text, parsed lazily.
    pub fn from_source(schema: Arc<Schema>, raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::new(schema)
        }
    }

    /// An instance backed by an already parsed document.
    ///
    /// # Errors
    /// [`BindError::TypeMismatch`] when the document format differs from the schema's.
    pub fn from_document(schema: Arc<Schema>, document: Document) -> Result<Self, BindError> {
        if document.format() != schema.format() {
            return Err(BindError::TypeMismatch {
                field: schema.name().to_string(),
                expected: format_name(schema.format()),
                found: format_name(document.format()),
            });
        }
        let model = Self::new(schema);
        let _ = model.document.set(document);
        Ok(model)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// The parsed source, or `None` for an instance without one.
    pub fn document(&self) -> Result<Option<&Document>, BindError> {
        if let Some(document) = self.document.get() {
            return Ok(Some(document));
        }
        let Some(raw) = &self.raw else {
            return Ok(None);
        };
        let parsed = self.schema.format().store().parse(raw)?;
        debug!(model = self.name(), "parsed source document");
        Ok(Some(self.document.get_or_init(|| parsed)))
    }

    /// Reads a field, resolving and caching it on first access.
    pub fn get(&self, name: &str) -> Result<FieldValue, BindError> {
        let field = self.schema.field(name)?;
        if let Some(value) = self.cache.borrow().get(name) {
            return Ok(value.clone());
        }

        debug!(model = self.name(), field = name, "field cache miss");
        let value = field.parse(self.document()?, self.schema.namespace())?;
        self.cache.borrow_mut().insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Stores a value for a field; later reads return it.
    pub fn set(&self, name: &str, value: impl Into<FieldValue>) -> Result<(), BindError> {
        let value = value.into();
        let field = self.schema.field(name)?;
        field.check_value(&value)?;
        self.cache.borrow_mut().insert(name.to_string(), value);
        self.written.borrow_mut().insert(name.to_string());
        Ok(())
    }

    /// Appends to a collection field's cached list.
    pub fn append(&self, name: &str, value: impl Into<FieldValue>) -> Result<(), BindError> {
        let value = value.into();
        let field = self.schema.field(name)?;
        field.check_element(&value)?;
        self.get(name)?;

        let mut cache = self.cache.borrow_mut();
        match cache.get_mut(name) {
            Some(FieldValue::List(items)) => items.push(value),
            Some(other) => {
                return Err(BindError::TypeMismatch {
                    field: name.to_string(),
                    expected: "a list",
                    found: other.type_name(),
                });
            }
            None => {
                cache.insert(name.to_string(), FieldValue::List(vec![value]));
            }
        }
        self.written.borrow_mut().insert(name.to_string());
        Ok(())
    }

    fn typed<T>(
        &self,
        name: &str,
        expected: &'static str,
        extract: impl FnOnce(FieldValue) -> Result<T, FieldValue>,
    ) -> Result<Option<T>, BindError> {
        match self.get(name)? {
            FieldValue::Null => Ok(None),
            value => extract(value).map(Some).map_err(|value| BindError::TypeMismatch {
                field: name.to_string(),
                expected,
                found: value.type_name(),
            }),
        }
    }

    pub fn text(&self, name: &str) -> Result<Option<String>, BindError> {
        self.typed(name, "text", |value| match value {
            FieldValue::Text(text) => Ok(text),
            other => Err(other),
        })
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>, BindError> {
        self.typed(name, "an integer", |value| match value {
            FieldValue::Integer(number) => Ok(number),
            other => Err(other),
        })
    }

    pub fn boolean(&self, name: &str) -> Result<Option<bool>, BindError> {
        self.typed(name, "a boolean", |value| match value {
            FieldValue::Boolean(flag) => Ok(flag),
            other => Err(other),
        })
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>, BindError> {
        self.typed(name, "a float", |value| match value {
            FieldValue::Float(number) => Ok(number),
            FieldValue::Integer(number) => Ok(number as f64),
            other => Err(other),
        })
    }

    pub fn date(&self, name: &str) -> Result<Option<NaiveDateTime>, BindError> {
        self.typed(name, "a date", |value| match value {
            FieldValue::Date(date) => Ok(date),
            other => Err(other),
        })
    }

    /// Items of a collection field; never `None`, an unmatched collection is empty.
    pub fn list(&self, name: &str) -> Result<Vec<FieldValue>, BindError> {
        Ok(self
            .typed(name, "a list", |value| match value {
                FieldValue::List(items) => Ok(items),
                other => Err(other),
            })?
            .unwrap_or_default())
    }

    /// Nested models of a model collection field.
    pub fn models(&self, name: &str) -> Result<Vec<Model>, BindError> {
        self.list(name)?
            .into_iter()
            .map(|item| match item {
                FieldValue::Model(model) => Ok(model),
                other => Err(BindError::TypeMismatch {
                    field: name.to_string(),
                    expected: "a model",
                    found: other.type_name(),
                }),
            })
            .collect()
    }

    /// Renders the source document with every written value over its path.
    ///
    /// Values without a place in the document (missing XML nodes, nested
    /// model collections) are skipped.
    pub fn to_document_string(&self) -> Result<String, BindError> {
        let format = self.schema.format();
        let store = format.store();
        let mut document = match self.document()? {
            Some(document) => document.clone(),
            None => self.skeleton(),
        };

        let cache = self.cache.borrow();
        let written = self.written.borrow();
        for field in self.schema.fields().filter(|field| written.contains(field.name())) {
            let Some(value) = cache.get(field.name()) else {
                continue;
            };
            let Some(encoded) = field.encode(value, format)? else {
                warn!(model = self.name(), field = field.name(), "value has no document form; not written back");
                continue;
            };
            if !store.assign(&mut document, field.path(), self.schema.namespace(), &encoded)? {
                warn!(model = self.name(), field = field.name(), path = field.path(), "no node to write to; not written back");
            }
        }
        Ok(store.serialize(&document)?)
    }

    /// Every field's current value as a JSON object, in declaration order.
    pub fn to_json(&self) -> Result<Value, BindError> {
        let mut object = Map::new();
        for field in self.schema.fields() {
            object.insert(field.name().to_string(), self.get(field.name())?.to_json());
        }
        Ok(Value::Object(object))
    }

    fn skeleton(&self) -> Document {
        match self.schema.format() {
            DocumentFormat::Json => Document::Json(Value::Object(Map::new())),
            DocumentFormat::Xml => Document::Xml(XmlElement::new(
                self.schema.root_element(),
                self.schema.namespace().map(str::to_string),
            )),
        }
    }
}

fn format_name(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Xml => "an XML document",
        DocumentFormat::Json => "a JSON document",
    }
}

impl PartialEq for Model {
    /// Same schema instance and equal values for every field.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self
                .schema
                .fields()
                .all(|field| match (self.get(field.name()), other.get(field.name())) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                })
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.schema.name())
            .field("parsed", &self.document.get().is_some())
            .field("cache", &self.cache.borrow())
            .field("written", &self.written.borrow())
            .finish()
    }
}
