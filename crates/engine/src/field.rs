//! Field descriptors: typed coercion of resolved document nodes.
//!
//! A [`FieldSpec`] is declared once per schema and shared by every instance.
//! Parsing reads the owning model's document, and encoding turns a cached
//! value back into the scalar written over the field's path.

use std::sync::Arc;

use docbind_document::{Document, DocumentFormat, Match, Scalar};
use docbind_util::date_handling::{DEFAULT_DATE_FORMAT, format_naive_datetime, from_epoch_millis, parse_naive_datetime, to_epoch_millis};
use serde_json::{Number, Value};

use crate::{BindError, FieldValue, Model, Schema};

/// Scalar coercions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Integer,
    Boolean,
    Float,
    /// Dates parsed and written with a chrono format string.
    Date { format: String },
}

impl ScalarKind {
    pub fn date() -> Self {
        ScalarKind::Date {
            format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::Integer => "an integer",
            ScalarKind::Boolean => "a boolean",
            ScalarKind::Float => "a float",
            ScalarKind::Date { .. } => "a date",
        }
    }

    /// Converts a present scalar. `Ok(None)` means the value counts as absent.
    pub(crate) fn coerce(&self, field: &str, scalar: &Scalar) -> Result<Option<FieldValue>, BindError> {
        let coercion_error = || BindError::Coercion {
            field: field.to_string(),
            value: scalar.as_text().into_owned(),
            expected: self.expected(),
        };

        let value = match (self, scalar) {
            (ScalarKind::Text, scalar) => FieldValue::Text(scalar.as_text().trim().to_string()),
            // whitespace-only text counts as absent for every other kind
            (_, Scalar::Text(text)) if text.trim().is_empty() => return Ok(None),
            (ScalarKind::Integer, Scalar::Text(text)) => FieldValue::Integer(text.trim().parse().map_err(|_| coercion_error())?),
            (ScalarKind::Float, Scalar::Text(text)) => FieldValue::Float(text.trim().parse().map_err(|_| coercion_error())?),
            (ScalarKind::Boolean, Scalar::Text(text)) if text.trim().eq_ignore_ascii_case("true") => FieldValue::Boolean(true),
            (ScalarKind::Boolean, Scalar::Text(text)) if text.trim().eq_ignore_ascii_case("false") => FieldValue::Boolean(false),
            (ScalarKind::Date { format }, Scalar::Text(text)) => {
                FieldValue::Date(parse_naive_datetime(text.trim(), format).map_err(|_| coercion_error())?)
            }
            (ScalarKind::Integer, Scalar::Number(number)) => FieldValue::Integer(number.as_i64().ok_or_else(coercion_error)?),
            (ScalarKind::Float, Scalar::Number(number)) => FieldValue::Float(number.as_f64().ok_or_else(coercion_error)?),
            // numeric JSON dates are epoch milliseconds
            (ScalarKind::Date { .. }, Scalar::Number(number)) => {
                let millis = number.as_f64().ok_or_else(coercion_error)?;
                FieldValue::Date(from_epoch_millis(millis).ok_or_else(coercion_error)?)
            }
            (ScalarKind::Boolean, Scalar::Bool(flag)) => FieldValue::Boolean(*flag),
            _ => return Err(coercion_error()),
        };
        Ok(Some(value))
    }

    /// Scalar written back over the field's path.
    pub(crate) fn encode(&self, field: &str, value: &FieldValue, format: DocumentFormat) -> Result<Value, BindError> {
        let mismatch = || BindError::TypeMismatch {
            field: field.to_string(),
            expected: self.expected(),
            found: value.type_name(),
        };
        let encoded = match (self, value) {
            (_, FieldValue::Null) => Value::Null,
            (ScalarKind::Text, FieldValue::Text(text)) => Value::String(text.clone()),
            (ScalarKind::Integer, FieldValue::Integer(number)) => Value::Number((*number).into()),
            (ScalarKind::Boolean, FieldValue::Boolean(flag)) => Value::Bool(*flag),
            (ScalarKind::Float, FieldValue::Float(number)) => Number::from_f64(*number).map_or(Value::Null, Value::Number),
            (ScalarKind::Float, FieldValue::Integer(number)) => Value::Number((*number).into()),
            (ScalarKind::Date { format: date_format }, FieldValue::Date(date)) => match format {
                DocumentFormat::Json => Value::Number(to_epoch_millis(date).into()),
                DocumentFormat::Xml => Value::String(format_naive_datetime(date, date_format).map_err(|_| BindError::Coercion {
                    field: field.to_string(),
                    value: date.to_string(),
                    expected: "a date renderable with the field's format",
                })?),
            },
            _ => return Err(mismatch()),
        };
        Ok(encoded)
    }

    /// Whether `value` may be stored in a field of this kind.
    fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (_, FieldValue::Null)
                | (ScalarKind::Text, FieldValue::Text(_))
                | (ScalarKind::Integer, FieldValue::Integer(_))
                | (ScalarKind::Boolean, FieldValue::Boolean(_))
                | (ScalarKind::Float, FieldValue::Float(_) | FieldValue::Integer(_))
                | (ScalarKind::Date { .. }, FieldValue::Date(_))
        )
    }
}

/// Element type of a collection field.
#[derive(Debug, Clone)]
pub enum ElementKind {
    Scalar(ScalarKind),
    Model(Arc<Schema>),
    /// Local names of the matched XML elements rather than their content.
    ElementName,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Collection { element: ElementKind, order_by: Option<String> },
}

/// An immutable field declaration.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    path: String,
    default: Value,
    kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            default: Value::Null,
            kind,
        }
    }

    pub fn text(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, FieldKind::Scalar(ScalarKind::Text))
    }

    pub fn integer(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, FieldKind::Scalar(ScalarKind::Integer))
    }

    pub fn boolean(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, FieldKind::Scalar(ScalarKind::Boolean))
    }

    pub fn float(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, FieldKind::Scalar(ScalarKind::Float))
    }

    pub fn date(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, FieldKind::Scalar(ScalarKind::date()))
    }

    /// A collection of scalars of `element` kind.
    pub fn collection(name: impl Into<String>, path: impl Into<String>, element: ScalarKind) -> Self {
        Self::new(
            name,
            path,
            FieldKind::Collection {
                element: ElementKind::Scalar(element),
                order_by: None,
            },
        )
    }

    /// A collection of nested models, one per matched node.
    pub fn models(name: impl Into<String>, path: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self::new(
            name,
            path,
            FieldKind::Collection {
                element: ElementKind::Model(schema),
                order_by: None,
            },
        )
    }

    /// The local names of the XML elements matched by `path`, as text.
    ///
    /// With `/root/flags/*` over `<flags><red/><blue/></flags>` this yields
    /// `["red", "blue"]`.
    pub fn element_names(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(
            name,
            path,
            FieldKind::Collection {
                element: ElementKind::ElementName,
                order_by: None,
            },
        )
    }

    /// Value used when the path matches nothing. Ignored by collections.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    /// Replaces the chrono format of a date field (or of date collection elements).
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        match &mut self.kind {
            FieldKind::Scalar(ScalarKind::Date { format: current })
            | FieldKind::Collection {
                element: ElementKind::Scalar(ScalarKind::Date { format: current }),
                ..
            } => *current = format.into(),
            _ => {}
        }
        self
    }

    /// Sorts a model collection ascending by the named field of its elements.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        if let FieldKind::Collection { order_by, .. } = &mut self.kind {
            *order_by = Some(field.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, FieldKind::Collection { .. })
    }

    /// Checks the declaration against its model; run once by the schema builder.
    pub(crate) fn check(&self, model: &str, format: DocumentFormat) -> Result<(), BindError> {
        if self.path.trim().is_empty() {
            return Err(BindError::invalid_schema(model, format!("field '{}' has an empty path", self.name)));
        }
        match &self.kind {
            FieldKind::Scalar(kind) => {
                self.default_for(kind)?;
            }
            FieldKind::Collection { element, order_by } => match (element, order_by) {
                (ElementKind::Scalar(_) | ElementKind::ElementName, Some(_)) => {
                    return Err(BindError::invalid_schema(
                        model,
                        format!("field '{}' orders scalar elements; order_by needs model elements", self.name),
                    ));
                }
                (ElementKind::ElementName, None) if format == DocumentFormat::Json => {
                    return Err(BindError::invalid_schema(
                        model,
                        format!("field '{}' collects element names, which JSON documents do not have", self.name),
                    ));
                }
                (ElementKind::Model(schema), Some(order_by)) if schema.field(order_by).is_err() => {
                    return Err(BindError::invalid_schema(
                        model,
                        format!("field '{}' orders by '{}', which {} does not declare", self.name, order_by, schema.name()),
                    ));
                }
                _ => {}
            },
        }
        Ok(())
    }

    fn default_for(&self, kind: &ScalarKind) -> Result<FieldValue, BindError> {
        let scalar = match &self.default {
            Value::Null => return Ok(FieldValue::Null),
            Value::String(text) => Scalar::Text(text.clone()),
            Value::Number(number) => Scalar::Number(number.clone()),
            Value::Bool(flag) => Scalar::Bool(*flag),
            Value::Array(_) | Value::Object(_) => {
                return Err(BindError::TypeMismatch {
                    field: self.name.clone(),
                    expected: kind.expected(),
                    found: "structured JSON",
                });
            }
        };
        Ok(kind.coerce(&self.name, &scalar)?.unwrap_or(FieldValue::Null))
    }

    /// Resolves the field against `document`; `None` means the model has no source.
    pub(crate) fn parse(&self, document: Option<&Document>, namespace: Option<&str>) -> Result<FieldValue, BindError> {
        match &self.kind {
            FieldKind::Scalar(kind) => {
                let Some(document) = document else {
                    return self.default_for(kind);
                };
                let store = document.format().store();
                let found = store.resolve_one(document, &self.path, namespace)?;
                match found.and_then(|node| node.scalar()) {
                    Some(scalar) => match kind.coerce(&self.name, &scalar)? {
                        Some(value) => Ok(value),
                        None => self.default_for(kind),
                    },
                    None => self.default_for(kind),
                }
            }
            FieldKind::Collection { element, order_by } => {
                let Some(document) = document else {
                    return Ok(FieldValue::List(Vec::new()));
                };
                let store = document.format().store();
                let matches = store.resolve(document, &self.path, namespace)?;
                let items = match element {
                    ElementKind::Scalar(kind) => matches
                        .iter()
                        .map(|node| match node.scalar() {
                            Some(scalar) => Ok(kind.coerce(&self.name, &scalar)?.unwrap_or(FieldValue::Null)),
                            None => Ok(FieldValue::Null),
                        })
                        .collect::<Result<Vec<_>, BindError>>()?,
                    ElementKind::Model(schema) => {
                        let mut models = matches
                            .into_iter()
                            .map(|node| {
                                let sub_document = node.into_document().ok_or_else(|| BindError::TypeMismatch {
                                    field: self.name.clone(),
                                    expected: "an element",
                                    found: "an attribute",
                                })?;
                                Model::from_document(schema.clone(), sub_document)
                            })
                            .collect::<Result<Vec<_>, BindError>>()?;
                        if let Some(order_by) = order_by {
                            sort_models(&mut models, order_by)?;
                        }
                        models.into_iter().map(FieldValue::Model).collect()
                    }
                    ElementKind::ElementName => matches
                        .into_iter()
                        .map(|node| match node {
                            Match::Element(element) => Ok(FieldValue::Text(element.local_name().to_string())),
                            _ => Err(BindError::TypeMismatch {
                                field: self.name.clone(),
                                expected: "an element",
                                found: "a value without an element name",
                            }),
                        })
                        .collect::<Result<Vec<_>, BindError>>()?,
                };
                Ok(FieldValue::List(items))
            }
        }
    }

    /// Value written back over the path by `Model::to_document_string`.
    ///
    /// `Ok(None)` means the value has no scalar form for this document format.
    pub(crate) fn encode(&self, value: &FieldValue, format: DocumentFormat) -> Result<Option<Value>, BindError> {
        match (&self.kind, value) {
            (FieldKind::Scalar(kind), value) => kind.encode(&self.name, value, format).map(Some),
            (FieldKind::Collection { element: ElementKind::Scalar(kind), .. }, FieldValue::List(items)) if format == DocumentFormat::Json => {
                let encoded = items
                    .iter()
                    .map(|item| kind.encode(&self.name, item, format))
                    .collect::<Result<Vec<_>, BindError>>()?;
                Ok(Some(Value::Array(encoded)))
            }
            _ => Ok(None),
        }
    }

    /// Checks that `value` fits this field before it is cached.
    pub(crate) fn check_value(&self, value: &FieldValue) -> Result<(), BindError> {
        let fits = match (&self.kind, value) {
            (FieldKind::Scalar(kind), value) => kind.accepts(value),
            (FieldKind::Collection { .. }, FieldValue::List(items)) => {
                return items.iter().try_for_each(|item| self.check_element(item));
            }
            (FieldKind::Collection { .. }, _) => false,
        };
        if fits {
            Ok(())
        } else {
            Err(BindError::TypeMismatch {
                field: self.name.clone(),
                expected: self.expected_name(),
                found: value.type_name(),
            })
        }
    }

    /// Checks a single element appended to a collection.
    pub(crate) fn check_element(&self, value: &FieldValue) -> Result<(), BindError> {
        let fits = match &self.kind {
            FieldKind::Collection {
                element: ElementKind::Scalar(kind),
                ..
            } => kind.accepts(value),
            FieldKind::Collection {
                element: ElementKind::Model(schema),
                ..
            } => matches!(value, FieldValue::Model(model) if Arc::ptr_eq(model.schema(), schema)),
            FieldKind::Collection {
                element: ElementKind::ElementName,
                ..
            } => ScalarKind::Text.accepts(value),
            FieldKind::Scalar(_) => false,
        };
        if fits {
            Ok(())
        } else {
            Err(BindError::TypeMismatch {
                field: self.name.clone(),
                expected: self.element_name(),
                found: value.type_name(),
            })
        }
    }

    fn expected_name(&self) -> &'static str {
        match &self.kind {
            FieldKind::Scalar(kind) => kind.expected(),
            FieldKind::Collection { .. } => "a list",
        }
    }

    fn element_name(&self) -> &'static str {
        match &self.kind {
            FieldKind::Collection {
                element: ElementKind::Scalar(kind),
                ..
            } => kind.expected(),
            FieldKind::Collection {
                element: ElementKind::Model(_), ..
            } => "a model of the element schema",
            FieldKind::Collection {
                element: ElementKind::ElementName,
                ..
            } => "an element name",
            FieldKind::Scalar(_) => "a collection field",
        }
    }
}

fn sort_models(models: &mut [Model], order_by: &str) -> Result<(), BindError> {
    let mut keyed = Vec::with_capacity(models.len());
    for (index, model) in models.iter().enumerate() {
        keyed.push((model.get(order_by)?, index));
    }
    // sort_by is stable, so equal keys keep document order
    keyed.sort_by(|(a, _), (b, _)| a.sort_cmp(b));
    let order: Vec<usize> = keyed.into_iter().map(|(_, index)| index).collect();
    let sorted: Vec<Model> = order.iter().map(|index| models[*index].clone()).collect();
    for (slot, model) in models.iter_mut().zip(sorted) {
        *slot = model;
    }
    Ok(())
}
