//! JSON document store.
//!
//! Paths are dot-separated object keys (`kiddie.address.number`); `/` is
//! accepted as an alternative separator. Numeric steps index arrays, while a
//! key step applied to an array fans out over its elements. A terminal array
//! contributes each of its elements as a separate match, and `null` values
//! never match.

use serde_json::{Map, Value};

use crate::{Document, DocumentError, DocumentFormat, DocumentStore, Match};

/// Store for key-ordered JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStore;

fn path_segments(path: &str) -> Vec<&str> {
    path.split(['.', '/']).filter(|segment| !segment.is_empty()).collect()
}

fn step<'a>(value: &'a Value, segment: &str) -> Vec<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment).into_iter().collect(),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get(index).into_iter().collect(),
            Err(_) => items.iter().flat_map(|item| step(item, segment)).collect(),
        },
        _ => Vec::new(),
    }
}

fn as_json(document: &Document) -> Result<&Value, DocumentError> {
    match document {
        Document::Json(value) => Ok(value),
        other => Err(DocumentError::FormatMismatch {
            store: DocumentFormat::Json,
            document: other.format(),
        }),
    }
}

impl DocumentStore for JsonStore {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Json
    }

    fn parse(&self, raw: &str) -> Result<Document, DocumentError> {
        serde_json::from_str::<Value>(raw)
            .map(Document::Json)
            .map_err(|error| DocumentError::parse(DocumentFormat::Json, error.to_string()))
    }

    fn resolve(&self, document: &Document, path: &str, _namespace: Option<&str>) -> Result<Vec<Match>, DocumentError> {
        let root = as_json(document)?;
        let mut current = vec![root];
        for segment in path_segments(path) {
            current = current.into_iter().flat_map(|value| step(value, segment)).collect();
        }

        let matches = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .filter(|value| !value.is_null())
            .map(|value| Match::Json(value.clone()))
            .collect();
        Ok(matches)
    }

    fn serialize(&self, document: &Document) -> Result<String, DocumentError> {
        let value = as_json(document)?;
        serde_json::to_string(value).map_err(|error| DocumentError::Serialize {
            format: DocumentFormat::Json,
            message: error.to_string(),
        })
    }

    fn assign(&self, document: &mut Document, path: &str, _namespace: Option<&str>, value: &Value) -> Result<bool, DocumentError> {
        let root = match document {
            Document::Json(root) => root,
            other => {
                return Err(DocumentError::FormatMismatch {
                    store: DocumentFormat::Json,
                    document: other.format(),
                });
            }
        };
        let segments = path_segments(path);
        let Some((last, parents)) = segments.split_last() else {
            return Ok(false);
        };

        // intermediate objects are created on demand, so writing to
        // `kiddie.value` on `{}` yields `{"kiddie":{"value":...}}`
        let mut current = root;
        for segment in parents {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            current = match { current } {
                Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
                Value::Array(items) => match segment.parse::<usize>().ok().and_then(|index| items.get_mut(index)) {
                    Some(item) => item,
                    None => return Ok(false),
                },
                _ => return Ok(false),
            };
        }

        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => {
                map.insert(last.to_string(), value.clone());
                Ok(true)
            }
            Value::Array(items) => match last.parse::<usize>().ok().and_then(|index| items.get_mut(index)) {
                Some(item) => {
                    *item = value.clone();
                    Ok(true)
                }
                None => Ok(false),
            },
            _ => Ok(false),
        }
    }
}
