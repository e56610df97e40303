use std::fmt;
use std::sync::Arc;

use docbind_document::DocumentFormat;
use indexmap::IndexMap;

use crate::{BindError, FieldSpec, FinderTable, Model};

/// Post-load validation hook; an `Err` message rejects the instance.
pub type Validator = Arc<dyn Fn(&Model) -> Result<(), String> + Send + Sync>;

/// An immutable model declaration shared by every instance.
pub struct Schema {
    name: String,
    format: DocumentFormat,
    namespace: Option<String>,
    root: Option<String>,
    collection_path: Option<String>,
    fields: IndexMap<String, FieldSpec>,
    finders: FinderTable,
    validator: Option<Validator>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("namespace", &self.namespace)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("finders", &self.finders.len())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Schema {
    pub fn builder(name: impl Into<String>, format: DocumentFormat) -> SchemaBuilder {
        SchemaBuilder::new(name, format)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn collection_path(&self) -> Option<&str> {
        self.collection_path.as_deref()
    }

    pub fn finders(&self) -> &FinderTable {
        &self.finders
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Result<&FieldSpec, BindError> {
        self.fields.get(name).ok_or_else(|| BindError::UnknownField {
            model: self.name.clone(),
            field: name.to_string(),
        })
    }

    /// Root element name for XML instances created without a source.
    ///
    /// Falls back to the first step of the first absolute field path, then to
    /// the model name.
    pub fn root_element(&self) -> &str {
        if let Some(root) = &self.root {
            return root;
        }
        self.fields
            .values()
            .filter_map(|field| field.path().strip_prefix('/'))
            .filter_map(|path| path.split('/').next())
            .find(|step| !step.is_empty() && !step.starts_with('@'))
            .unwrap_or(self.name.as_str())
    }

    /// Runs the validation hook, if any.
    pub fn validate(&self, model: &Model) -> Result<(), BindError> {
        match &self.validator {
            Some(validator) => validator(model).map_err(|message| BindError::Validation {
                model: self.name.clone(),
                message,
            }),
            None => Ok(()),
        }
    }
}

/// Collects field and finder declarations into a [`Schema`].
///
/// Declaration errors are recorded as they happen and reported by
/// [`SchemaBuilder::build`], so the builder chain stays infallible.
pub struct SchemaBuilder {
    name: String,
    format: DocumentFormat,
    namespace: Option<String>,
    root: Option<String>,
    collection_path: Option<String>,
    fields: IndexMap<String, FieldSpec>,
    finders: FinderTable,
    validator: Option<Validator>,
    errors: Vec<BindError>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            name: name.into(),
            format,
            namespace: None,
            root: None,
            collection_path: None,
            fields: IndexMap::new(),
            finders: FinderTable::new(),
            validator: None,
            errors: Vec::new(),
        }
    }

    /// Default namespace for unqualified XML path steps.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn root_element(mut self, name: impl Into<String>) -> Self {
        self.root = Some(name.into());
        self
    }

    /// Path selecting one node per instance in multi-result responses.
    pub fn collection_path(mut self, path: impl Into<String>) -> Self {
        self.collection_path = Some(path.into());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        if self.fields.contains_key(field.name()) {
            self.errors
                .push(BindError::invalid_schema(&self.name, format!("field '{}' is declared twice", field.name())));
        } else {
            self.fields.insert(field.name().to_string(), field);
        }
        self
    }

    /// Registers a finder; see [`FinderTable::register`].
    pub fn finder<S: AsRef<str>>(mut self, keys: &[S], template: impl Into<String>) -> Self {
        if let Err(error) = self.finders.register(keys, template) {
            self.errors.push(error);
        }
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Model) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Validates the declarations and freezes the schema.
    ///
    /// # Errors
    /// The first recorded declaration error, or [`BindError::InvalidSchema`]
    /// when a field fails its own checks.
    pub fn build(self) -> Result<Arc<Schema>, BindError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        for field in self.fields.values() {
            field.check(&self.name, self.format)?;
        }
        Ok(Arc::new(Schema {
            name: self.name,
            format: self.format,
            namespace: self.namespace,
            root: self.root,
            collection_path: self.collection_path,
            fields: self.fields,
            finders: self.finders,
            validator: self.validator,
        }))
    }
}
