//! Finder-driven fetching of models over HTTP.

use std::sync::Arc;

use docbind_api::{HttpClient, TransportError};
use docbind_document::{Document, Match, XmlNode};
use serde_json::Value;
use tracing::debug;

use crate::{BindError, Model, Schema};

/// Wrapper keys searched for the item array of a JSON multi-result response.
const JSON_WRAPPER_KEYS: &[&str] = &["items", "results", "data"];

/// Filter arguments in call order; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    entries: Vec<(String, String)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter and returns `self` for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.push((key.into(), value.to_string()));
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (key, value) in iter {
            filters.push(key, value);
        }
        filters
    }
}

/// Fetches instances of one schema through its finders.
pub struct ModelManager<C> {
    schema: Arc<Schema>,
    client: C,
}

impl<C: HttpClient> ModelManager<C> {
    pub fn new(schema: Arc<Schema>, client: C) -> Self {
        Self { schema, client }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// The URL a fetch with `filters` would request.
    pub fn url_for(&self, filters: &Filters) -> Result<String, BindError> {
        let finder = self.schema.finders().resolve(self.schema.name(), filters.keys().as_slice())?;
        debug!(model = self.schema.name(), template = finder.template(), "resolved finder");
        let url = finder.build_url(filters.entries())?;
        Ok(self.client.resolve_url(&url)?)
    }

    /// Fetches exactly one instance.
    ///
    /// # Errors
    /// [`BindError::DoesNotExist`] for 404/410 responses, empty bodies and
    /// responses holding zero or several items; [`BindError::Transport`] for
    /// other failures; [`BindError::Validation`] when the schema's hook
    /// rejects the instance.
    pub fn get(&self, filters: &Filters) -> Result<Model, BindError> {
        let url = self.url_for(filters)?;
        let Some(document) = self.fetch(&url)? else {
            return Err(self.does_not_exist(&url));
        };

        let single = match self.schema.collection_path() {
            Some(path) => {
                let mut items = self.select(&document, path)?;
                if items.len() != 1 {
                    debug!(model = self.schema.name(), %url, items = items.len(), "expected a single item");
                    return Err(self.does_not_exist(&url));
                }
                items.pop()
            }
            None => match document {
                Document::Json(Value::Array(mut items)) => {
                    if items.len() != 1 {
                        debug!(model = self.schema.name(), %url, items = items.len(), "expected a single item");
                        return Err(self.does_not_exist(&url));
                    }
                    items.pop().map(Document::Json)
                }
                Document::Json(Value::Null) => None,
                other => Some(other),
            },
        };
        let document = single.ok_or_else(|| self.does_not_exist(&url))?;
        self.load(document)
    }

    /// A lazy multi-result query; nothing is fetched until `count` or `all`.
    pub fn filter(&self, filters: Filters) -> Query<'_, C> {
        Query { manager: self, filters }
    }

    fn does_not_exist(&self, url: &str) -> BindError {
        BindError::DoesNotExist {
            model: self.schema.name().to_string(),
            url: url.to_string(),
        }
    }

    /// GETs `url` and parses the body; `None` means there is nothing there.
    fn fetch(&self, url: &str) -> Result<Option<Document>, BindError> {
        debug!(model = self.schema.name(), %url, "fetching");
        let response = self.client.get(url)?;
        match response.status {
            404 | 410 => return Ok(None),
            _ if !response.is_success() => {
                return Err(TransportError::Status {
                    url: response.url,
                    status: response.status,
                }
                .into());
            }
            _ => {}
        }
        if response.body.trim().is_empty() {
            return Ok(None);
        }
        let document = self.schema.format().store().parse(&response.body)?;
        debug!(model = self.schema.name(), %url, "decoded response");
        Ok(Some(document))
    }

    fn select(&self, document: &Document, path: &str) -> Result<Vec<Document>, BindError> {
        let store = self.schema.format().store();
        Ok(store
            .resolve(document, path, self.schema.namespace())?
            .into_iter()
            .filter_map(Match::into_document)
            .collect())
    }

    /// One sub-document per sibling node of a multi-result response.
    fn siblings(&self, document: Document) -> Result<Vec<Document>, BindError> {
        if let Some(path) = self.schema.collection_path() {
            return self.select(&document, path);
        }
        let siblings = match document {
            Document::Xml(root) => root
                .children
                .into_iter()
                .filter_map(|child| match child {
                    XmlNode::Element(element) => Some(Document::Xml(element)),
                    XmlNode::Text(_) => None,
                })
                .collect(),
            Document::Json(Value::Array(items)) => items.into_iter().map(Document::Json).collect(),
            Document::Json(Value::Object(mut object)) => {
                match JSON_WRAPPER_KEYS
                    .iter()
                    .find(|key| matches!(object.get(**key), Some(Value::Array(_))))
                {
                    Some(key) => match object.remove(*key) {
                        Some(Value::Array(items)) => items.into_iter().map(Document::Json).collect(),
                        _ => Vec::new(),
                    },
                    None => vec![Document::Json(Value::Object(object))],
                }
            }
            Document::Json(Value::Null) => Vec::new(),
            Document::Json(scalar) => vec![Document::Json(scalar)],
        };
        Ok(siblings)
    }

    fn load(&self, document: Document) -> Result<Model, BindError> {
        let model = Model::from_document(self.schema.clone(), document)?;
        self.schema.validate(&model)?;
        Ok(model)
    }
}

/// A chainable multi-result query.
pub struct Query<'m, C> {
    manager: &'m ModelManager<C>,
    filters: Filters,
}

impl<C: HttpClient> Query<'_, C> {
    /// Adds another filter.
    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(key, value);
        self
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn url(&self) -> Result<String, BindError> {
        self.manager.url_for(&self.filters)
    }

    /// Number of matching items in the response.
    pub fn count(&self) -> Result<usize, BindError> {
        Ok(self.documents()?.len())
    }

    /// Every matching item, one model per sibling node, in response order.
    pub fn all(&self) -> Result<Vec<Model>, BindError> {
        self.documents()?
            .into_iter()
            .map(|document| self.manager.load(document))
            .collect()
    }

    fn documents(&self) -> Result<Vec<Document>, BindError> {
        let url = self.url()?;
        match self.manager.fetch(&url)? {
            Some(document) => {
                let siblings = self.manager.siblings(document)?;
                debug!(model = self.manager.schema.name(), %url, count = siblings.len(), "selected items");
                Ok(siblings)
            }
            None => Ok(Vec::new()),
        }
    }
}
