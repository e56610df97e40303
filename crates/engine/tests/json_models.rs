use std::sync::Arc;

use chrono::NaiveDate;
use docbind_document::DocumentFormat;
use docbind_engine::{BindError, FieldSpec, FieldValue, Model, ScalarKind, Schema};
use serde_json::json;

fn address() -> Arc<Schema> {
    Schema::builder("Address", DocumentFormat::Json)
        .field(FieldSpec::integer("number", "number"))
        .field(FieldSpec::text("street", "street"))
        .field(FieldSpec::text("city", "city"))
        .field(FieldSpec::collection("foobars", "foobars", ScalarKind::Text))
        .build()
        .expect("address schema")
}

fn my_model() -> Arc<Schema> {
    Schema::builder("MyModel", DocumentFormat::Json)
        .field(FieldSpec::text("muppet_name", "kiddie.value"))
        .field(FieldSpec::collection("muppet_names", "kiddie.names", ScalarKind::Text))
        .field(FieldSpec::collection("muppet_ages", "kiddie.ages", ScalarKind::Integer))
        .field(FieldSpec::models("muppet_addresses", "kiddie.address", address()).order_by("number"))
        .field(FieldSpec::date("opened", "kiddie.opened"))
        .field(FieldSpec::boolean("active", "kiddie.active"))
        .field(FieldSpec::float("height", "kiddie.height"))
        .build()
        .expect("my model schema")
}

const ADDRESSES: &str = r#"{"kiddie":{"address":[
    {"number":10,"street":"1st Ave. South","city":"MuppetVille","foobars":["foo","bar"]},
    {"number":5,"street":"Mockingbird Lane","city":"Bedrock"}]}}"#;

#[test]
fn scalar_fields_follow_dotted_paths() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"value":"Muppets rock","active":false,"height":1.5}}"#);
    assert_eq!(model.text("muppet_name").unwrap().as_deref(), Some("Muppets rock"));
    assert_eq!(model.boolean("active").unwrap(), Some(false));
    assert_eq!(model.float("height").unwrap(), Some(1.5));
}

#[test]
fn numbers_render_as_text_for_text_fields() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"value":30}}"#);
    assert_eq!(model.text("muppet_name").unwrap().as_deref(), Some("30"));
}

#[test]
fn numeric_dates_are_epoch_milliseconds() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"opened":135}}"#);
    let expected = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_micro_opt(0, 0, 0, 135_000).unwrap();
    assert_eq!(model.date("opened").unwrap(), Some(expected));

    let model = Model::from_source(my_model(), r#"{"kiddie":{}}"#);
    assert_eq!(model.date("opened").unwrap(), None);
}

#[test]
fn null_counts_as_absent() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"value":null,"names":null}}"#);
    assert_eq!(model.text("muppet_name").unwrap(), None);
    assert!(model.list("muppet_names").unwrap().is_empty());
}

#[test]
fn mistyped_values_are_coercion_errors() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"active":"maybe","opened":true}}"#);
    assert!(matches!(model.boolean("active"), Err(BindError::Coercion { .. })));
    assert!(matches!(model.date("opened"), Err(BindError::Coercion { .. })));
}

#[test]
fn scalar_collections() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"names":["Rowlf","Kermit","Ms.Piggy"],"ages":[5,12,3,8]}}"#);
    assert_eq!(
        model.list("muppet_names").unwrap(),
        vec![FieldValue::from("Rowlf"), FieldValue::from("Kermit"), FieldValue::from("Ms.Piggy")]
    );
    assert_eq!(model.list("muppet_ages").unwrap(), vec![5, 12, 3, 8].into_iter().map(FieldValue::from).collect::<Vec<_>>());
}

#[test]
fn model_collections_are_ordered() {
    let model = Model::from_source(my_model(), ADDRESSES);
    let addresses = model.models("muppet_addresses").unwrap();
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[0].integer("number").unwrap(), Some(5));
    assert_eq!(addresses[0].text("street").unwrap().as_deref(), Some("Mockingbird Lane"));
    assert!(addresses[0].list("foobars").unwrap().is_empty());
    assert_eq!(addresses[1].integer("number").unwrap(), Some(10));
    assert_eq!(addresses[1].list("foobars").unwrap(), vec![FieldValue::from("foo"), FieldValue::from("bar")]);
}

#[test]
fn writes_are_visible_without_reparsing() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"value":"Gonzo"}}"#);
    assert_eq!(model.text("muppet_name").unwrap().as_deref(), Some("Gonzo"));
    model.set("muppet_name", "Fozzie").unwrap();
    assert_eq!(model.text("muppet_name").unwrap().as_deref(), Some("Fozzie"));

    model.set("opened", None::<i64>).unwrap();
    assert_eq!(model.date("opened").unwrap(), None);
}

#[test]
fn serialization_encodes_dates_as_millis() {
    let model = Model::from_source(my_model(), r#"{"kiddie":{"value":"Gonzo","opened":123456}}"#);
    let opened = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap().and_hms_micro_opt(0, 0, 0, 135_000).unwrap();
    model.set("opened", opened).unwrap();
    model.set("muppet_name", "Kermit").unwrap();
    model.append("muppet_names", "Fozzie").unwrap();

    let rendered: serde_json::Value = serde_json::from_str(&model.to_document_string().unwrap()).unwrap();
    assert_eq!(rendered, json!({"kiddie": {"value": "Kermit", "opened": 315_532_800_135_i64, "names": ["Fozzie"]}}));
}

#[test]
fn to_json_renders_every_field() {
    let model = Model::from_source(my_model(), ADDRESSES);
    let rendered = model.to_json().unwrap();
    assert_eq!(rendered["muppet_name"], serde_json::Value::Null);
    assert_eq!(rendered["muppet_addresses"][0]["number"], json!(5));
    assert_eq!(rendered["muppet_addresses"][1]["foobars"], json!(["foo", "bar"]));
}

#[test]
fn equal_keys_keep_document_order_after_missing_ones() {
    let source = r#"{"kiddie":{"address":[
        {"number":10,"street":"Sesame Street"},
        {"number":5,"street":"Elm"},
        {"number":null,"street":"Nowhere"},
        {"number":5,"street":"Oak"},
        {"street":"Nobody's Way"}]}}"#;
    let model = Model::from_source(my_model(), source);
    let streets: Vec<Option<String>> = model
        .list("muppet_addresses")
        .unwrap()
        .iter()
        .map(|address| match address {
            FieldValue::Model(address) => address.text("street").unwrap(),
            other => panic!("expected an address model, got {other:?}"),
        })
        .collect();
    let expected = ["Nowhere", "Nobody's Way", "Elm", "Oak", "Sesame Street"];
    assert_eq!(streets, expected.map(|street| Some(street.to_string())));
}
