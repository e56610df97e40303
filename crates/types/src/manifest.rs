//! Schema manifest definitions shared by the registry and the CLI.
//!
//! A manifest declares models the same way the builder API does, but as YAML
//! or JSON data. Field declarations keep their authoring order (via
//! `IndexMap`) so models expose and serialize fields in a predictable sequence.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Top-level manifest document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SchemaManifest {
    /// Declared models, in any order; references are resolved by name.
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
}

impl SchemaManifest {
    pub fn model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|model| model.name == name)
    }
}

/// Document format a model binds against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    #[default]
    Xml,
    Json,
}

/// A single model declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDefinition {
    /// Model name, unique within the manifest.
    pub name: String,
    #[serde(default)]
    pub format: ModelFormat,
    /// Default namespace URI for unqualified XML path steps.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Path selecting the sibling nodes of a multi-result response.
    #[serde(default)]
    pub collection_path: Option<String>,
    /// Root element name used when an XML model is created without a source.
    #[serde(default)]
    pub root: Option<String>,
    /// Fields that must resolve to a value after a fetch.
    #[serde(default)]
    pub required: Vec<String>,
    /// Field declarations keyed by field name, preserving author order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldDefinition>,
    #[serde(default)]
    pub finders: Vec<FinderDefinition>,
}

/// Scalar kinds a field (or a collection element) can take.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKindDefinition {
    #[default]
    Text,
    Integer,
    Boolean,
    Float,
    Date,
    Collection,
}

/// One field declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    /// Path expression resolved against the model's document.
    pub path: String,
    #[serde(default)]
    pub kind: FieldKindDefinition,
    /// Value used when the path matches nothing.
    #[serde(default)]
    pub default: Option<JsonValue>,
    /// chrono format string for date fields.
    #[serde(default)]
    pub format: Option<String>,
    /// Element type of a collection field.
    #[serde(default)]
    pub element: Option<CollectionElementDefinition>,
    /// Field of the element model used to sort a collection.
    #[serde(default)]
    pub order_by: Option<String>,
}

/// Element of a collection: a scalar kind, a model referenced by name, or the
/// names of the matched XML elements.
///
/// Exactly one of `kind`, `model` and `element_names` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CollectionElementDefinition {
    #[serde(default)]
    pub kind: Option<FieldKindDefinition>,
    #[serde(default)]
    pub model: Option<String>,
    /// chrono format string for date elements.
    #[serde(default)]
    pub format: Option<String>,
    /// Collect the local names of the matched elements instead of their content.
    #[serde(default)]
    pub element_names: bool,
}

/// A finder: the field identifiers it accepts and the URL template it fills.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinderDefinition {
    /// Field identifiers in template order; duplicates are allowed.
    pub keys: Vec<String>,
    /// URL template with one `%s` per key.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_yaml_manifest() {
        let yaml_text = r#"
models:
  - name: Address
    fields:
      number: { path: number, kind: integer }
      street: { path: street }
  - name: MyModel
    namespace: urn:test:namespace
    required: [muppet_name]
    fields:
      muppet_name: { path: /root/kiddie/value }
      muppet_type: { path: /root/kiddie/type, default: frog }
      muppet_addresses:
        path: /root/kiddie/address
        kind: collection
        element: { model: Address }
        order_by: number
    finders:
      - keys: [muppet_name]
        url: http://example.com/muppets/%s
"#;

        let manifest: SchemaManifest = serde_yaml::from_str(yaml_text).expect("deserialize manifest");

        assert_eq!(manifest.models.len(), 2);
        let model = manifest.model("MyModel").expect("MyModel");
        assert_eq!(model.format, ModelFormat::Xml);
        assert_eq!(model.namespace.as_deref(), Some("urn:test:namespace"));
        let names: Vec<&str> = model.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["muppet_name", "muppet_type", "muppet_addresses"]);
        assert_eq!(model.fields["muppet_type"].default, Some(JsonValue::String("frog".into())));
        let addresses = &model.fields["muppet_addresses"];
        assert_eq!(addresses.kind, FieldKindDefinition::Collection);
        assert_eq!(addresses.element.as_ref().and_then(|element| element.model.as_deref()), Some("Address"));
        assert_eq!(model.finders[0].keys, vec!["muppet_name"]);
    }

    #[test]
    fn deserializes_json_manifest() {
        let json_text = r#"{"models":[{"name":"Person","format":"json","fields":{"born":{"path":"born","kind":"date"}}}]}"#;
        let manifest: SchemaManifest = serde_json::from_str(json_text).expect("deserialize manifest");
        let person = &manifest.models[0];
        assert_eq!(person.format, ModelFormat::Json);
        assert_eq!(person.fields["born"].kind, FieldKindDefinition::Date);
        assert!(person.finders.is_empty());
    }

    #[test]
    fn rejects_unknown_kinds() {
        let yaml_text = "models:\n  - name: Bad\n    fields:\n      x: { path: x, kind: decimal }\n";
        assert!(serde_yaml::from_str::<SchemaManifest>(yaml_text).is_err());
    }
}
