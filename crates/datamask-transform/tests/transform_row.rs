use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use datamask_core::{
    ColumnConstraint, IntrospectedColumn, IntrospectedEnum, IntrospectedStructure,
    IntrospectedTable, TypeCategory,
};
use datamask_transform::{
    ColumnTransform, CompiledTransformConfig, Row, RowContext, RowData, TableTransform, Transform,
    TransformErrors, TransformMode, TransformOverrides, create_transform_config,
};
use serde_json::{Value, json};

fn customer(columns: Vec<IntrospectedColumn>) -> IntrospectedStructure {
    IntrospectedStructure {
        tables: vec![IntrospectedTable::new("public", "customer", columns)],
        ..IntrospectedStructure::default()
    }
}

fn column(name: &str, type_name: &str) -> IntrospectedColumn {
    IntrospectedColumn::new("public", "customer", name, type_name)
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object row, got {other}"),
    }
}

fn customer_row() -> Row {
    row(json!({
        "id": "1",
        "name": "mr hungry cat",
        "email": "hungry@real-email.com"
    }))
}

async fn compile(
    transform: Transform,
    structure: &IntrospectedStructure,
    mode: TransformMode,
) -> CompiledTransformConfig {
    create_transform_config(transform, structure, TransformOverrides::mode(mode))
        .await
        .expect("compile config")
}

fn run(config: &CompiledTransformConfig, parsed: Row) -> Result<Row, TransformErrors> {
    let data = RowData::from_parsed(parsed, 23);
    config.transform_row(&RowContext {
        schema: "public",
        table: "customer",
        row: &data,
    })
}

fn empty_customer_config() -> Transform {
    Transform::new().with_table("public", "customer", TableTransform::columns())
}

#[tokio::test]
async fn table_functions_replace_returned_columns() {
    let transform = Transform::new().with_table(
        "public",
        "customer",
        TableTransform::function(|input| {
            let name = input.row["name"].as_str().unwrap_or_default();
            let mut out = Row::new();
            out.insert("name".to_string(), json!(format!("the illustrious {name}")));
            Ok(out)
        }),
    );
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Unsafe).await;

    let output = run(&config, customer_row()).expect("transform row");
    assert_eq!(
        Value::Object(output),
        json!({
            "id": "1",
            "name": "the illustrious mr hungry cat",
            "email": "hungry@real-email.com"
        })
    );
}

#[tokio::test]
async fn table_function_output_keeps_source_column_order() {
    let transform = Transform::new().with_table(
        "public",
        "customer",
        TableTransform::function(|_| {
            Ok(row(json!({ "email": "x@y.z", "id": "9", "extra": true })))
        }),
    );
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Unsafe).await;

    let output = run(&config, customer_row()).expect("transform row");
    let keys: Vec<&str> = output.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["id", "name", "email"]);
    assert_eq!(output["id"], json!("9"));
}

#[tokio::test]
async fn table_function_errors_fail_the_row() {
    let transform = Transform::new().with_table(
        "public",
        "customer",
        TableTransform::function(|_| Err(anyhow::anyhow!("table exploded"))),
    );
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Unsafe).await;

    let errors = run(&config, customer_row()).expect_err("table error");
    assert_eq!(errors.columns(), vec![None]);
    assert!(errors.to_string().contains("table exploded"));
}

#[tokio::test]
async fn column_functions_see_row_and_value() {
    let transform = Transform::new().with_table(
        "public",
        "customer",
        TableTransform::columns().with_column(
            "name",
            ColumnTransform::function(|input| {
                let name = input.row["name"].as_str().unwrap_or_default();
                let value = input.value.as_str().unwrap_or_default();
                Ok(json!(format!("{name} is as {value} does")))
            }),
        ),
    );
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Unsafe).await;

    let output = run(&config, customer_row()).expect("transform row");
    assert_eq!(output["name"], json!("mr hungry cat is as mr hungry cat does"));
    assert_eq!(output["email"], json!("hungry@real-email.com"));
    assert_eq!(output["id"], json!("1"));
}

#[tokio::test]
async fn column_errors_are_collected_for_the_whole_row() {
    let transform = Transform::new().with_table(
        "public",
        "customer",
        TableTransform::columns()
            .with_column(
                "name",
                ColumnTransform::function(|_| Err(anyhow::anyhow!("badName"))),
            )
            .with_column(
                "email",
                ColumnTransform::function(|_| Err(anyhow::anyhow!("badEmail"))),
            ),
    );
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Unsafe).await;

    let data = RowData::from_parsed(customer_row(), 256);
    let errors = config
        .transform_row(&RowContext {
            schema: "public",
            table: "customer",
            row: &data,
        })
        .expect_err("both columns fail");

    assert_eq!(errors.columns(), vec![Some("name"), Some("email")]);
    let messages: Vec<String> = errors.iter().map(|error| error.to_string()).collect();
    assert!(messages[0].contains("public.customer.name"));
    assert!(messages[0].contains("line 256"));
    assert!(messages[0].contains("badName"));
    assert!(messages[1].contains("badEmail"));
    for error in errors.iter() {
        assert_eq!(error.row.line, 256);
        assert_eq!(error.row.parsed, customer_row());
        assert_eq!(
            error.row.raw.get("email").cloned().flatten().as_deref(),
            Some("hungry@real-email.com")
        );
    }
}

#[tokio::test]
async fn key_columns_pass_through_in_every_mode() {
    let structure = customer(vec![
        column("primary", "int4").with_constraint(ColumnConstraint::PrimaryKey),
        column("foreign", "int4").with_constraint(ColumnConstraint::ForeignKey),
    ]);

    for mode in TransformMode::ALL {
        let config = compile(empty_customer_config(), &structure, mode).await;
        let output = run(&config, row(json!({ "primary": 2, "foreign": 3 })))
            .unwrap_or_else(|err| panic!("{mode} mode failed: {err}"));
        assert_eq!(output["primary"], json!(2));
        assert_eq!(output["foreign"], json!(3));
    }
}

#[tokio::test]
async fn pass_through_tables_copy_the_row() {
    let transform = Transform::new().with_table("public", "customer", TableTransform::PassThrough);
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Strict).await;

    let output = run(&config, customer_row()).expect("pass through");
    assert_eq!(output, customer_row());
}

#[tokio::test]
async fn unsafe_mode_keeps_unconfigured_columns() {
    let transform = Transform::from_json(&json!({
        "public": { "customer": { "email": "hungry@fake-email.com" } }
    }))
    .expect("literal config");
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Unsafe).await;

    let output = run(&config, customer_row()).expect("transform row");
    assert_eq!(output["name"], json!("mr hungry cat"));
    assert_eq!(output["email"], json!("hungry@fake-email.com"));
}

#[tokio::test]
async fn null_literals_replace_values() {
    let transform = Transform::from_json(&json!({
        "public": { "customer": { "name": null, "email": "hungry@fake-email.com" } }
    }))
    .expect("literal config");

    for mode in [TransformMode::Unsafe, TransformMode::Strict] {
        let config = compile(transform.clone(), &IntrospectedStructure::default(), mode).await;
        let parsed = row(json!({ "name": "mr hungry cat", "email": "hungry@real-email.com" }));
        let output = run(&config, parsed).expect("transform row");
        assert_eq!(output["name"], Value::Null);
    }
}

#[tokio::test]
async fn strict_mode_requires_every_non_key_column() {
    let transform = Transform::from_json(&json!({
        "public": { "customer": { "email": "hungry@fake-email.com" } }
    }))
    .expect("literal config");
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Strict).await;

    let parsed = row(json!({ "name": "mr hungry cat", "email": "hungry@real-email.com" }));
    let errors = run(&config, parsed).expect_err("strict failure");
    assert_eq!(errors.columns(), vec![Some("name")]);
    let message = errors.to_string();
    assert!(message.contains("strict transform mode"), "{message}");
    assert!(message.contains("name"));
}

#[tokio::test]
async fn auto_mode_needs_column_info() {
    let transform = Transform::from_json(&json!({
        "public": { "customer": { "email": "hungry@fake-email.com" } }
    }))
    .expect("literal config");
    let config = compile(transform, &IntrospectedStructure::default(), TransformMode::Auto).await;

    let errors = run(&config, customer_row()).expect_err("missing info");
    assert_eq!(errors.columns(), vec![Some("id"), Some("name")]);
    assert!(errors.to_string().contains("info about the column"));
}

#[tokio::test]
async fn auto_mode_rejects_unknown_types_unless_nullable() {
    let strict_column = customer(vec![column("v", "dfsdfsdf")]);
    let config = compile(empty_customer_config(), &strict_column, TransformMode::Auto).await;
    let errors = run(&config, row(json!({ "v": 23 }))).expect_err("unsupported");
    assert!(errors.to_string().contains("not yet support"));

    let nullable_column = customer(vec![column("v", "dfsdfsdf").with_nullable(true)]);
    let config = compile(empty_customer_config(), &nullable_column, TransformMode::Auto).await;
    let output = run(&config, row(json!({ "v": 23 }))).expect("nullable");
    assert_eq!(output["v"], Value::Null);
}

#[tokio::test]
async fn auto_mode_remaps_enums_within_the_enum() {
    let mut structure = customer(vec![
        column("v", "Foo")
            .with_category(TypeCategory::Enum)
            .with_type_id("public.Foo"),
    ]);
    structure.enums.push(IntrospectedEnum {
        id: "public.Foo".to_string(),
        schema: "public".to_string(),
        name: "Foo".to_string(),
        values: vec!["Bar".to_string(), "Baz".to_string(), "Quux".to_string()],
    });
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let first = run(&config, row(json!({ "v": "Baz" }))).expect("enum");
    let second = run(&config, row(json!({ "v": "Baz" }))).expect("enum again");
    let value = first["v"].as_str().expect("string enum value");
    assert!(value == "Bar" || value == "Quux", "unexpected {value}");
    assert_eq!(first, second);
}

#[tokio::test]
async fn auto_mode_single_value_enum_maps_to_itself() {
    let mut structure = customer(vec![
        column("v", "Only")
            .with_category(TypeCategory::Enum)
            .with_type_id("public.Only"),
    ]);
    structure.enums.push(IntrospectedEnum {
        id: "public.Only".to_string(),
        schema: "public".to_string(),
        name: "Only".to_string(),
        values: vec!["one".to_string()],
    });
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let output = run(&config, row(json!({ "v": "one" }))).expect("enum");
    assert_eq!(output["v"], json!("one"));
}

#[tokio::test]
async fn auto_mode_unknown_enum_fails() {
    let structure = customer(vec![
        column("v", "Foo")
            .with_category(TypeCategory::Enum)
            .with_type_id("public.Foo"),
    ]);
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let errors = run(&config, row(json!({ "v": "Baz" }))).expect_err("unknown enum");
    assert!(errors.to_string().contains("enum"));
}

#[tokio::test]
async fn auto_mode_keeps_number_and_array_shapes() {
    let structure = customer(vec![column("n", "int4"), column("list", "_int4")]);
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let output = run(&config, row(json!({ "n": 23, "list": [23] }))).expect("numbers");
    assert!(output["n"].is_i64());
    let list = output["list"].as_array().expect("array output");
    assert_eq!(list.len(), 1);
    assert!(list[0].is_i64());
    assert_eq!(output["n"], list[0]);
}

#[tokio::test]
async fn auto_mode_keeps_nulls() {
    let structure = customer(vec![column("name", "text").with_nullable(true)]);
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let output = run(&config, row(json!({ "name": null }))).expect("null");
    assert_eq!(output["name"], Value::Null);
}

#[tokio::test]
async fn auto_mode_scrambles_text_preserving_shape() {
    let structure = customer(vec![
        column("name", "text"),
        column("thing", "text"),
        column("email", "varchar(255)"),
    ]);
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let thing = "!".repeat(1000);
    let output = run(
        &config,
        row(json!({
            "name": "Stellar Stellan",
            "thing": thing,
            "email": "stellarstellan@skars.gard"
        })),
    )
    .expect("text");

    let name = output["name"].as_str().expect("name");
    assert_eq!(name.len(), "Stellar Stellan".len());
    assert_eq!(name.chars().nth(7), Some(' '));
    assert!(name.chars().next().is_some_and(|ch| ch.is_ascii_uppercase()));
    assert_ne!(name, "Stellar Stellan");

    assert_eq!(output["thing"].as_str().map(str::len), Some(1000));

    let email = output["email"].as_str().expect("email");
    assert_eq!(email.find('@'), Some(14));
    assert_eq!(email.rfind('.'), Some(20));
    assert_ne!(email, "stellarstellan@skars.gard");
}

#[tokio::test]
async fn auto_mode_generates_valid_temporal_values() {
    let names = ["timestamp", "timestamptz", "date", "time", "interval", "timetz"];
    let structure = customer(names.iter().map(|name| column(name, name)).collect());
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let parsed_values = row(json!({
        "timestamp": "2022-11-10 08:51:42.830Z",
        "timestamptz": "2004-10-19 10:23:54+03:00",
        "date": "2022-11-10",
        "time": "08:51:42.830Z",
        "interval": "01:02:03.456",
        "timetz": "04:05:06.789-08:00"
    }));
    let sentinels: Row = names
        .iter()
        .map(|name| (name.to_string(), json!("infinity")))
        .collect();

    for parsed in [parsed_values, sentinels] {
        let output = run(&config, parsed).expect("temporal");
        let text = |key: &str| output[key].as_str().expect("string output").to_string();

        for key in ["timestamp", "timestamptz"] {
            NaiveDateTime::parse_from_str(&text(key), "%Y-%m-%dT%H:%M:%S%.3fZ")
                .unwrap_or_else(|err| panic!("{key}: {err}"));
        }
        NaiveDate::parse_from_str(&text("date"), "%Y-%m-%d").expect("date");
        for key in ["time", "timetz"] {
            let value = text(key);
            let clock = value.strip_suffix('Z').expect("utc suffix");
            NaiveTime::parse_from_str(clock, "%H:%M:%S%.3f").expect("time");
        }
        NaiveTime::parse_from_str(&text("interval"), "%H:%M:%S%.3f").expect("interval");
    }
}

#[tokio::test]
async fn auto_mode_json_respects_parse_json() {
    let structure = customer(vec![column("v", "json")]);
    let raw_json = row(json!({ "v": "{\"foo\":23}" }));

    let overrides = TransformOverrides {
        mode: Some(TransformMode::Auto),
        parse_json: Some(false),
        hash_key: None,
    };
    let config = create_transform_config(empty_customer_config(), &structure, overrides)
        .await
        .expect("compile");
    let output = run(&config, raw_json).expect("json as text");
    let text = output["v"].as_str().expect("serialized json");
    let reparsed: Value = serde_json::from_str(text).expect("valid json");
    assert!(reparsed["foo"].is_i64());

    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;
    let output = run(&config, row(json!({ "v": { "foo": 23 } }))).expect("json as value");
    assert!(output["v"]["foo"].is_i64());
    assert_eq!(output["v"]["foo"], reparsed["foo"]);
}

#[tokio::test]
async fn auto_mode_jsonb_string_documents_stay_strings() {
    let structure = customer(vec![column("doc", "jsonb")]);

    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;
    for text in ["hello", "23"] {
        let output = run(&config, row(json!({ "doc": text }))).expect("parsed string document");
        let replaced = output["doc"].as_str().expect("still a string");
        assert_eq!(replaced.chars().count(), text.chars().count());
    }

    let overrides = TransformOverrides {
        mode: Some(TransformMode::Auto),
        parse_json: Some(false),
        hash_key: None,
    };
    let config = create_transform_config(empty_customer_config(), &structure, overrides)
        .await
        .expect("compile");
    let output = run(&config, row(json!({ "doc": "\"hello\"" }))).expect("raw string document");
    let reparsed: Value =
        serde_json::from_str(output["doc"].as_str().expect("serialized json")).expect("valid json");
    assert!(reparsed.is_string());
    assert!(run(&config, row(json!({ "doc": "hello" }))).is_err());
}

#[tokio::test]
async fn auto_mode_handles_floats_near_the_limit() {
    let structure = customer(vec![column("amount", "float8")]);
    let config = compile(empty_customer_config(), &structure, TransformMode::Auto).await;

    let output = run(&config, row(json!({ "amount": 1e308 }))).expect("number");
    assert!(output["amount"].as_f64().expect("float").is_finite());

    let output = run(&config, row(json!({ "amount": "1e308" }))).expect("text");
    let text = output["amount"].as_str().expect("string stays string");
    assert!(text.parse::<f64>().expect("numeric text").is_finite());
}

#[tokio::test]
async fn hash_key_drives_auto_values() {
    let structure = customer(vec![column("name", "text")]);
    let compile_with_key = |key: &'static str| {
        let structure = structure.clone();
        async move {
            let overrides = TransformOverrides {
                hash_key: Some(key.to_string()),
                ..TransformOverrides::mode(TransformMode::Auto)
            };
            create_transform_config(empty_customer_config(), &structure, overrides)
                .await
                .expect("compile")
        }
    };

    let a1 = run(&compile_with_key("a").await, row(json!({ "name": "Ada Lovelace Byron" }))).expect("a1");
    let a2 = run(&compile_with_key("a").await, row(json!({ "name": "Ada Lovelace Byron" }))).expect("a2");
    let b = run(&compile_with_key("b").await, row(json!({ "name": "Ada Lovelace Byron" }))).expect("b");
    assert_eq!(a1, a2);
    assert_ne!(a1, b);
}
