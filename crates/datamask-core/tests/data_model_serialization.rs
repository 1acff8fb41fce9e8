use datamask_core::{DataModelField, IntrospectedStructure, build_data_model};
use serde_json::json;

#[test]
fn builds_data_model_from_structure_json() {
    let structure: IntrospectedStructure = serde_json::from_value(json!({
        "tables": [
            {
                "id": "public.users",
                "schema": "public",
                "name": "users",
                "columns": [{
                    "id": "public.users.id",
                    "schema": "public",
                    "table": "users",
                    "name": "id",
                    "type": "int4",
                    "nullable": false,
                    "default": "nextval('users_id_seq'::regclass)",
                    "constraints": ["p"]
                }],
                "children": [{
                    "id": "posts_author_fkey",
                    "fkTable": "public.posts",
                    "targetTable": "public.users",
                    "keys": [{ "fkColumn": "author_id", "targetColumn": "id", "nullable": true }]
                }],
                "primaryKeys": { "keys": [{ "name": "id", "type": "int4" }] }
            },
            {
                "id": "public.posts",
                "schema": "public",
                "name": "posts",
                "columns": [{
                    "id": "public.posts.author_id",
                    "schema": "public",
                    "table": "posts",
                    "name": "author_id",
                    "type": "int4",
                    "nullable": true,
                    "constraints": ["f"]
                }],
                "parents": [{
                    "id": "posts_author_fkey",
                    "fkTable": "public.posts",
                    "targetTable": "public.users",
                    "keys": [{ "fkColumn": "author_id", "targetColumn": "id", "nullable": true }]
                }],
                "constraints": [{ "name": "posts_author_key", "columns": ["author_id"] }]
            }
        ],
        "sequences": {
            "public": [{ "name": "users_id_seq", "start": 1, "current": 7, "interval": 1 }]
        }
    }))
    .expect("decode structure");

    let model = build_data_model(&structure).expect("build data model");
    let value = serde_json::to_value(&model).expect("serialize data model");

    assert_eq!(value["models"]["users"]["fields"][0]["kind"], "scalar");
    assert_eq!(
        value["models"]["users"]["fields"][0]["sequence"]["identifier"],
        "\"public\".\"users_id_seq\""
    );
    assert_eq!(value["models"]["users"]["fields"][1]["kind"], "object");
    assert_eq!(value["models"]["users"]["fields"][1]["is_list"], true);

    let posts = &model.models["posts"];
    assert_eq!(posts.unique_constraints[0].name, "posts_author_key");
    match &posts.fields[1] {
        DataModelField::Object(relation) => {
            assert_eq!(relation.relation_name, "postsTousers");
            assert!(!relation.is_required);
        }
        other => panic!("expected relation field, got {other:?}"),
    }
}
