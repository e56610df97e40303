use std::sync::Arc;

use chrono::NaiveDate;
use docbind_document::DocumentFormat;
use docbind_engine::{BindError, FieldSpec, FieldValue, Model, ScalarKind, Schema};

fn address() -> Arc<Schema> {
    Schema::builder("Address", DocumentFormat::Xml)
        .field(FieldSpec::integer("number", "/address/number"))
        .field(FieldSpec::text("street", "/address/street"))
        .field(FieldSpec::text("city", "/address/city"))
        .field(FieldSpec::collection("foobars", "/address/foobar", ScalarKind::Text))
        .build()
        .expect("address schema")
}

fn my_model() -> Arc<Schema> {
    Schema::builder("MyModel", DocumentFormat::Xml)
        .field(FieldSpec::text("muppet_name", "/root/child/value"))
        .field(FieldSpec::text("muppet_type", "/root/child/type").with_default("frog"))
        .field(FieldSpec::collection("muppet_names", "/root/child/value", ScalarKind::Text))
        .field(FieldSpec::collection("muppet_ages", "/root/child/age", ScalarKind::Integer))
        .field(FieldSpec::models("muppet_addresses", "/root/child/address", address()).order_by("number"))
        .build()
        .expect("my model schema")
}

fn ns_model() -> Arc<Schema> {
    Schema::builder("NsModel", DocumentFormat::Xml)
        .namespace("urn:test:namespace")
        .field(FieldSpec::text("name", "/root/name"))
        .field(FieldSpec::integer("age", "/root/age"))
        .build()
        .expect("namespaced schema")
}

fn single(kind: FieldSpec) -> Arc<Schema> {
    Schema::builder("Single", DocumentFormat::Xml).field(kind).build().expect("single-field schema")
}

const ADDRESSES: &str = "<root><child><value>Gonzo</value>\
    <address><number>10</number><street>1st Ave. South</street><city>MuppetVille</city><foobar>foo</foobar><foobar>bar</foobar></address>\
    <address><number>5</number><street>Mockingbird Lane</street><city>Bedrock</city></address>\
    </child></root>";

#[test]
fn text_field_reads_the_matched_node() {
    let model = Model::from_source(single(FieldSpec::text("value", "/root/child/value")), "<root><child><value>Muppets rock</value></child></root>");
    assert_eq!(model.text("value").unwrap().as_deref(), Some("Muppets rock"));
}

#[test]
fn integer_field_parses_and_rejects_non_numbers() {
    let schema = single(FieldSpec::integer("value", "/root/child/value"));
    let model = Model::from_source(schema.clone(), "<root><child><value>123</value></child></root>");
    assert_eq!(model.integer("value").unwrap(), Some(123));

    let model = Model::from_source(schema, "<root><child><value>NaN</value></child></root>");
    assert!(matches!(model.integer("value"), Err(BindError::Coercion { .. })));
}

#[test]
fn date_fields_strip_offsets_and_keep_fractions() {
    let schema = single(FieldSpec::date("value", "/root/child/value"));

    let model = Model::from_source(schema.clone(), "<root><child><value>2008-06-21T10:36:12</value></child></root>");
    let expected = NaiveDate::from_ymd_opt(2008, 6, 21).unwrap().and_hms_opt(10, 36, 12).unwrap();
    assert_eq!(model.date("value").unwrap(), Some(expected));

    let model = Model::from_source(schema.clone(), "<root><child><value>2008-06-21T10:36:12.280-06:00</value></child></root>");
    let expected = NaiveDate::from_ymd_opt(2008, 6, 21).unwrap().and_hms_micro_opt(10, 36, 12, 280_000).unwrap();
    assert_eq!(model.date("value").unwrap(), Some(expected));

    let model = Model::from_source(schema, "<root><child><value></value></child></root>");
    assert_eq!(model.date("value").unwrap(), None);
}

#[test]
fn boolean_fields() {
    let schema = single(FieldSpec::boolean("value", "/root/child/value"));
    let model = Model::from_source(schema.clone(), "<root><child><value>false</value></child></root>");
    assert_eq!(model.boolean("value").unwrap(), Some(false));
    let model = Model::from_source(schema, "<root><child><value>true</value></child></root>");
    assert_eq!(model.boolean("value").unwrap(), Some(true));
}

#[test]
fn absent_values_fall_back_to_defaults() {
    let model = Model::from_source(my_model(), "<root><child><value>Rowlf</value></child></root>");
    assert_eq!(model.text("muppet_name").unwrap().as_deref(), Some("Rowlf"));
    assert_eq!(model.text("muppet_type").unwrap().as_deref(), Some("frog"));

    let model = Model::from_source(my_model(), "<root><child><valuefoo>Rolf</valuefoo></child></root>");
    assert_eq!(model.text("muppet_name").unwrap(), None);
}

#[test]
fn repeated_nodes_are_an_error_for_single_fields() {
    let model = Model::from_source(my_model(), "<root><child><value>Rowlf</value><value>Kermit</value></child></root>");
    assert!(matches!(model.get("muppet_name"), Err(BindError::MultipleMatches { count: 2, .. })));
}

#[test]
fn scalar_collections_keep_document_order() {
    let model = Model::from_source(
        my_model(),
        "<root><child><value>Rowlf</value><value>Kermit</value><value>Ms.Piggy</value><age>10</age><age>5</age><age>7</age></child></root>",
    );
    assert_eq!(
        model.list("muppet_names").unwrap(),
        vec![FieldValue::from("Rowlf"), FieldValue::from("Kermit"), FieldValue::from("Ms.Piggy")]
    );
    assert_eq!(model.list("muppet_ages").unwrap(), vec![FieldValue::from(10), FieldValue::from(5), FieldValue::from(7)]);
}

#[test]
fn model_collections_are_ordered_by_the_requested_field() {
    let model = Model::from_source(my_model(), ADDRESSES);
    let addresses = model.models("muppet_addresses").unwrap();
    assert_eq!(addresses.len(), 2);

    assert_eq!(addresses[0].integer("number").unwrap(), Some(5));
    assert_eq!(addresses[0].text("street").unwrap().as_deref(), Some("Mockingbird Lane"));
    assert_eq!(addresses[0].text("city").unwrap().as_deref(), Some("Bedrock"));
    assert!(addresses[0].list("foobars").unwrap().is_empty());

    assert_eq!(addresses[1].integer("number").unwrap(), Some(10));
    assert_eq!(addresses[1].text("city").unwrap().as_deref(), Some("MuppetVille"));
    assert_eq!(addresses[1].list("foobars").unwrap(), vec![FieldValue::from("foo"), FieldValue::from("bar")]);
}

#[test]
fn unmatched_collections_are_empty() {
    let model = Model::from_source(my_model(), "<root><child/></root>");
    assert!(model.models("muppet_addresses").unwrap().is_empty());
    assert!(model.list("muppet_ages").unwrap().is_empty());
}

#[test]
fn default_namespace_applies_to_unqualified_steps() {
    let model = Model::from_source(ns_model(), "<root xmlns='urn:test:namespace'><name>Finbar</name><age>47</age></root>");
    assert_eq!(model.text("name").unwrap().as_deref(), Some("Finbar"));
    assert_eq!(model.integer("age").unwrap(), Some(47));

    let model = Model::from_source(ns_model(), "<root><name>Finbar</name></root>");
    assert_eq!(model.text("name").unwrap(), None);
}

#[test]
fn fields_are_settable_and_collections_appendable() {
    let model = Model::from_source(my_model(), ADDRESSES);
    model.set("muppet_name", "Fozzie").unwrap();
    assert_eq!(model.text("muppet_name").unwrap().as_deref(), Some("Fozzie"));

    model.append("muppet_names", "Fozzie").unwrap();
    let names = model.list("muppet_names").unwrap();
    assert!(names.contains(&FieldValue::from("Gonzo")));
    assert!(names.contains(&FieldValue::from("Fozzie")));
}

#[test]
fn serialization_writes_cached_values_over_their_nodes() {
    let model = Model::from_source(my_model(), "<root><child><value>Gonzo</value></child></root>");
    model.set("muppet_name", "Fozzie & Co").unwrap();
    model.set("muppet_type", "bear").unwrap();
    assert_eq!(
        model.to_document_string().unwrap(),
        "<root><child><value>Fozzie &amp; Co</value></child></root>"
    );
}

#[test]
fn xml_dates_are_written_with_the_field_format() {
    let schema = single(FieldSpec::date("value", "/root/value").with_format("%d/%m/%Y"));
    let model = Model::from_source(schema, "<root><value>21/06/2008</value></root>");
    let date = model.date("value").unwrap().unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2008, 6, 21).unwrap().and_hms_opt(0, 0, 0).unwrap());
    model.set("value", NaiveDate::from_ymd_opt(2010, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap()).unwrap();
    assert_eq!(model.to_document_string().unwrap(), "<root><value>02/01/2010</value></root>");
}

#[test]
fn malformed_documents_raise_parse_errors() {
    let model = Model::from_source(my_model(), "<root><child></root>");
    assert!(matches!(model.get("muppet_name"), Err(BindError::Parse { .. })));
}

#[test]
fn empty_xml_models_render_their_root_element() {
    let model = Model::new(ns_model());
    assert_eq!(model.text("name").unwrap(), None);
    assert_eq!(model.to_document_string().unwrap(), r#"<root xmlns="urn:test:namespace"/>"#);
}

#[test]
fn read_values_are_not_rewritten() {
    let source = "<root><at>2008-06-21T10:36:12.280-06:00</at></root>";
    let model = Model::from_source(single(FieldSpec::date("at", "/root/at")), source);
    let expected = NaiveDate::from_ymd_opt(2008, 6, 21).unwrap().and_hms_milli_opt(10, 36, 12, 280).unwrap();
    assert_eq!(model.date("at").unwrap(), Some(expected));
    assert_eq!(model.to_document_string().unwrap(), source);
}

#[test]
fn equal_and_missing_order_keys() {
    let source = "<root><child>\
        <address><number>10</number><street>Sesame Street</street></address>\
        <address><number>5</number><street>Elm</street></address>\
        <address><street>Nowhere</street></address>\
        <address><number>5</number><street>Oak</street></address>\
        </child></root>";
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
    assert_eq!(streets, ["Nowhere", "Elm", "Oak", "Sesame Street"].map(|street| Some(street.to_string())));
}

#[test]
fn element_name_collections_list_local_names() {
    let schema = single(FieldSpec::element_names("flags", "/root/flags/*"));
    let model = Model::from_source(schema.clone(), r#"<root xmlns:m="urn:m"><flags><red/><m:blue>on</m:blue><green/></flags></root>"#);
    assert_eq!(model.list("flags").unwrap(), vec![FieldValue::from("red"), FieldValue::from("blue"), FieldValue::from("green")]);

    let empty = Model::from_source(schema.clone(), "<root><flags/></root>");
    assert!(empty.list("flags").unwrap().is_empty());

    let model = Model::from_source(schema, "<root><flags><red/></flags></root>");
    model.append("flags", "amber").unwrap();
    assert!(matches!(model.append("flags", 3), Err(BindError::TypeMismatch { .. })));
    assert_eq!(model.list("flags").unwrap(), vec![FieldValue::from("red"), FieldValue::from("amber")]);
}

#[test]
fn prefixed_sub_models_render_their_namespace_declaration() {
    let address = Schema::builder("Address", DocumentFormat::Xml)
        .field(FieldSpec::text("street", "/x:address/x:street"))
        .build()
        .expect("prefixed address schema");
    let schema = single(FieldSpec::models("addresses", "/root/x:address", address));
    let model = Model::from_source(schema, r#"<root xmlns:x="urn:x"><x:address><x:street>Elm</x:street></x:address></root>"#);
    let addresses = model.list("addresses").unwrap();
    let [FieldValue::Model(address)] = addresses.as_slice() else {
        panic!("expected one address, got {addresses:?}");
    };
    address.set("street", "Oak").unwrap();
    assert_eq!(
        address.to_document_string().unwrap(),
        r#"<x:address xmlns:x="urn:x"><x:street>Oak</x:street></x:address>"#
    );
}
