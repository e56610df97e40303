use std::{path::Path, sync::Arc};

use anyhow::Result;
use docbind_document::DocumentFormat;
use docbind_engine::{ElementKind, FieldKind, FieldSpec, FieldValue, Model, ScalarKind, Schema, SchemaBuilder};
use docbind_types::{FieldDefinition, FieldKindDefinition, ModelDefinition, ModelFormat, SchemaManifest};
use indexmap::IndexMap;
use tracing::debug;

use crate::{RegistryError, default_manifest_path, load_manifest};

/// Schemas built from a manifest, keyed by model name.
///
/// Referenced models are built before the models that reference them, and
/// every reference shares the same `Arc<Schema>`.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Builds every model declared in `manifest`.
    ///
    /// # Errors
    /// Duplicate model names, references to undeclared models, reference
    /// cycles, malformed field declarations, and anything the schema builder
    /// rejects.
    pub fn from_manifest(manifest: &SchemaManifest) -> Result<Self, RegistryError> {
        let mut definitions = IndexMap::new();
        for definition in &manifest.models {
            if definitions.insert(definition.name.as_str(), definition).is_some() {
                return Err(RegistryError::DuplicateModel(definition.name.clone()));
            }
        }

        let mut resolver = Resolver {
            definitions,
            built: IndexMap::new(),
            visiting: Vec::new(),
        };
        for definition in &manifest.models {
            resolver.build(&definition.name)?;
        }
        Ok(Self { schemas: resolver.built })
    }

    /// Loads and builds the manifest at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let manifest = load_manifest(path)?;
        Ok(Self::from_manifest(&manifest)?)
    }

    /// Loads the manifest named by `DOCBIND_SCHEMA_PATH`, or the default one
    /// under the user's config directory.
    pub fn from_config() -> Result<Self> {
        Self::from_path(&default_manifest_path())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    pub fn schema(&self, name: &str) -> Result<Arc<Schema>, RegistryError> {
        self.get(name).cloned().ok_or_else(|| RegistryError::UnknownModel(name.to_string()))
    }

    /// Model names in build order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

struct Resolver<'a> {
    definitions: IndexMap<&'a str, &'a ModelDefinition>,
    built: IndexMap<String, Arc<Schema>>,
    /// Models whose build is in progress, outermost first.
    visiting: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn build(&mut self, name: &str) -> Result<Arc<Schema>, RegistryError> {
        if let Some(schema) = self.built.get(name) {
            return Ok(schema.clone());
        }
        if let Some(start) = self.visiting.iter().position(|visiting| visiting == name) {
            let mut chain = self.visiting[start..].to_vec();
            chain.push(name.to_string());
            return Err(RegistryError::Cycle { chain });
        }
        let definition: &'a ModelDefinition = self
            .definitions
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownModel(name.to_string()))?;

        self.visiting.push(name.to_string());
        let schema = self.build_schema(definition);
        self.visiting.pop();
        let schema = schema?;

        debug!(model = name, fields = definition.fields.len(), finders = definition.finders.len(), "built schema");
        self.built.insert(name.to_string(), schema.clone());
        Ok(schema)
    }

    fn build_schema(&mut self, definition: &'a ModelDefinition) -> Result<Arc<Schema>, RegistryError> {
        let mut builder = SchemaBuilder::new(&definition.name, document_format(definition.format));
        if let Some(namespace) = &definition.namespace {
            builder = builder.namespace(namespace);
        }
        if let Some(root) = &definition.root {
            builder = builder.root_element(root);
        }
        if let Some(path) = &definition.collection_path {
            builder = builder.collection_path(path);
        }
        for (name, field) in &definition.fields {
            builder = builder.field(self.field_spec(&definition.name, name, field)?);
        }
        for finder in &definition.finders {
            builder = builder.finder(finder.keys.as_slice(), &finder.url);
        }

        if !definition.required.is_empty() {
            if let Some(missing) = definition.required.iter().find(|name| !definition.fields.contains_key(*name)) {
                return Err(RegistryError::InvalidField {
                    model: definition.name.clone(),
                    field: missing.clone(),
                    reason: "listed as required but not declared".to_string(),
                });
            }
            let required = definition.required.clone();
            builder = builder.validator(move |model| check_required(model, &required));
        }
        Ok(builder.build()?)
    }

    fn field_spec(&mut self, model: &str, name: &str, definition: &FieldDefinition) -> Result<FieldSpec, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidField {
            model: model.to_string(),
            field: name.to_string(),
            reason: reason.to_string(),
        };

        let kind = match definition.kind {
            FieldKindDefinition::Collection => {
                let element = definition.element.as_ref().ok_or_else(|| invalid("collection fields need an 'element'"))?;
                let element = match (&element.kind, &element.model) {
                    (None, None) if element.element_names => ElementKind::ElementName,
                    _ if element.element_names => return Err(invalid("'element_names' excludes 'kind' and 'model'")),
                    (Some(kind), None) => ElementKind::Scalar(
                        scalar_kind(*kind, element.format.as_deref()).ok_or_else(|| invalid("collections of collections are not supported"))?,
                    ),
                    (None, Some(target)) => {
                        if !self.definitions.contains_key(target.as_str()) {
                            return Err(RegistryError::UnknownReference {
                                model: model.to_string(),
                                field: name.to_string(),
                                target: target.clone(),
                            });
                        }
                        ElementKind::Model(self.build(target)?)
                    }
                    _ => return Err(invalid("collection elements need one of 'kind', 'model' or 'element_names'")),
                };
                FieldKind::Collection {
                    element,
                    order_by: definition.order_by.clone(),
                }
            }
            kind => {
                if definition.element.is_some() || definition.order_by.is_some() {
                    return Err(invalid("only collection fields take 'element' or 'order_by'"));
                }
                FieldKind::Scalar(scalar_kind(kind, definition.format.as_deref()).ok_or_else(|| invalid("unsupported field kind"))?)
            }
        };

        let mut spec = FieldSpec::new(name, &definition.path, kind);
        if let Some(default) = &definition.default {
            spec = spec.with_default(default.clone());
        }
        Ok(spec)
    }
}

fn scalar_kind(kind: FieldKindDefinition, format: Option<&str>) -> Option<ScalarKind> {
    let kind = match kind {
        FieldKindDefinition::Text => ScalarKind::Text,
        FieldKindDefinition::Integer => ScalarKind::Integer,
        FieldKindDefinition::Boolean => ScalarKind::Boolean,
        FieldKindDefinition::Float => ScalarKind::Float,
        FieldKindDefinition::Date => match format {
            Some(format) => ScalarKind::Date { format: format.to_string() },
            None => ScalarKind::date(),
        },
        FieldKindDefinition::Collection => return None,
    };
    Some(kind)
}

fn document_format(format: ModelFormat) -> DocumentFormat {
    match format {
        ModelFormat::Xml => DocumentFormat::Xml,
        ModelFormat::Json => DocumentFormat::Json,
    }
}

/// Every required field must resolve to a value; empty collections count as missing.
fn check_required(model: &Model, required: &[String]) -> Result<(), String> {
    for name in required {
        match model.get(name) {
            Ok(FieldValue::Null) => return Err(format!("required field '{name}' has no value")),
            Ok(FieldValue::List(items)) if items.is_empty() => return Err(format!("required field '{name}' has no items")),
            Ok(_) => {}
            Err(error) => return Err(error.to_string()),
        }
    }
    Ok(())
}
