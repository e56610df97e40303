use std::fs;

use docbind_engine::Model;
use docbind_registry::{SCHEMA_PATH_ENV, SchemaRegistry};

const YAML: &str = r#"
models:
  - name: Muppet
    root: muppet
    fields:
      name: { path: /muppet/name }
      born: { path: /muppet/born, kind: date, format: "%d/%m/%Y" }
"#;

const JSON: &str = r#"{"models":[{"name":"Muppet","format":"json","fields":{"name":{"path":"kiddie.value"}}}]}"#;

#[test]
fn yaml_manifests_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schemas.yaml");
    fs::write(&path, YAML).unwrap();

    let registry = SchemaRegistry::from_path(&path).unwrap();
    let muppet = Model::new(registry.schema("Muppet").unwrap());
    muppet.set("name", "Gonzo").unwrap();
    assert_eq!(muppet.to_document_string().unwrap(), "<muppet/>");

    let parsed = Model::from_source(registry.schema("Muppet").unwrap(), "<muppet><born>02/01/1976</born></muppet>");
    assert_eq!(parsed.date("born").unwrap().map(|date| date.to_string()).as_deref(), Some("1976-01-02 00:00:00"));
}

#[test]
fn json_manifests_are_chosen_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schemas.json");
    fs::write(&path, JSON).unwrap();

    let registry = SchemaRegistry::from_path(&path).unwrap();
    let muppet = Model::from_source(registry.schema("Muppet").unwrap(), r#"{"kiddie":{"value":"Gonzo"}}"#);
    assert_eq!(muppet.text("name").unwrap().as_deref(), Some("Gonzo"));
}

#[test]
fn configured_path_comes_from_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models.json");
    fs::write(&path, JSON).unwrap();

    temp_env::with_var(SCHEMA_PATH_ENV, Some(path.to_str().unwrap()), || {
        let registry = SchemaRegistry::from_config().unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Muppet"]);
    });
}

#[test]
fn load_failures_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");
    let error = SchemaRegistry::from_path(&missing).unwrap_err();
    assert!(format!("{error:#}").contains("absent.yaml"));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{\"models\": [").unwrap();
    let error = SchemaRegistry::from_path(&broken).unwrap_err();
    assert!(error.to_string().contains("broken.json"));
}
