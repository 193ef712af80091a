//! Integration tests for parsing against a schema loaded from disk.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use customquery_rs::query::{
    ArithmeticOp, FilterExpression, ParserOptions, PredicateOp, PredicateValue, QueryError,
    QueryParser, TypedValue,
};
use customquery_rs::schema::{FieldKind, FieldResolver, Schema, SchemaError};
use tempfile::TempDir;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/schema.toml")
}

fn load_schema() -> Schema {
    Schema::load(fixture_path()).expect("fixture schema should load")
}

#[test]
fn test_load_fixture_schema() {
    let schema = load_schema();
    let names: Vec<&str> = schema.model_names().collect();
    assert_eq!(names, vec!["Observation", "Site", "Target", "Telescope"]);
}

#[test]
fn test_resolve_across_two_relations() {
    let schema = load_schema();
    let target = schema.target("Observation").unwrap();

    let field = target
        .resolve_field(&"telescope.site.altitude".into())
        .unwrap();
    assert_eq!(field.kind, FieldKind::Integer);

    let same = target
        .resolve_field(&"telescope__site__altitude".into())
        .unwrap();
    assert_eq!(same, field);
}

#[test]
fn test_parse_realistic_query() {
    let schema = load_schema();
    let target = schema.target("Observation").unwrap();
    let mut parser = QueryParser::new();

    let parsed = parser
        .parse(
            &target,
            "magnitude < 6.5 and telescope.aperture >= 200 and \
             (target.name in ('M31', 'M33') or cone(10.68, 41.27, 0.5))",
        )
        .unwrap();

    let FilterExpression::And(left, right) = &parsed.filter else {
        panic!("expected AND at the root, got {:?}", parsed.filter);
    };
    assert!(matches!(**left, FilterExpression::And(_, _)));
    assert!(matches!(**right, FilterExpression::Or(_, _)));

    assert_eq!(parsed.extra_params.len(), 1);
    let cone = parsed.extra_params.get(0).unwrap();
    assert_eq!(cone.get("ra"), Some(10.68));
    assert_eq!(cone.get("dec"), Some(41.27));
    assert_eq!(cone.get("radius"), Some(0.5));
}

#[test]
fn test_parse_dates_with_custom_format() {
    let schema = load_schema();
    let target = schema.target("Observation").unwrap();
    let mut parser = QueryParser::with_options(ParserOptions {
        date_format: "%d/%m/%Y".to_string(),
        ..ParserOptions::default()
    });

    let parsed = parser
        .parse(&target, "observed between '01/01/2020' and 31/12/2020")
        .unwrap();
    let date = |y, m, d| TypedValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap());
    assert_eq!(
        parsed.filter,
        FilterExpression::and(
            FilterExpression::predicate("observed".into(), PredicateOp::Gte, date(2020, 1, 1), false),
            FilterExpression::predicate("observed".into(), PredicateOp::Lte, date(2020, 12, 31), false),
        )
    );
}

#[test]
fn test_arithmetic_across_relation() {
    let schema = load_schema();
    let target = schema.target("Observation").unwrap();
    let parsed = QueryParser::new()
        .parse(&target, "target.ra - target.dec > 10")
        .unwrap();

    match parsed.filter {
        FilterExpression::Predicate {
            field,
            op,
            value: PredicateValue::Arithmetic(arithmetic),
            negated,
        } => {
            assert_eq!(field.lookup_key(), "target__ra");
            assert_eq!(op, PredicateOp::Gt);
            assert!(!negated);
            assert_eq!(arithmetic.op, ArithmeticOp::Add);
            assert_eq!(arithmetic.constant, TypedValue::Integer(10));
            assert_eq!(arithmetic.field.lookup_key(), "target__dec");
        }
        other => panic!("expected arithmetic predicate, got {other:?}"),
    }
}

#[test]
fn test_unknown_field_through_relation() {
    let schema = load_schema();
    let target = schema.target("Observation").unwrap();
    let err = QueryParser::new()
        .parse(&target, "telescope.apertur > 100")
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::UnknownField {
            field: "telescope.apertur".to_string(),
            suggestion: Some("aperture".to_string()),
        }
    );
    assert_eq!(
        err.to_string(),
        "field 'telescope.apertur' does not exist (did you mean 'aperture'?)"
    );
}

#[test]
fn test_parsed_query_serializes_to_json() {
    let schema = load_schema();
    let target = schema.target("Observation").unwrap();
    let parsed = QueryParser::new()
        .parse(&target, "exposure is not null or cone(1, 2, 3)")
        .unwrap();

    let json = serde_json::to_value(&parsed).unwrap();
    assert_eq!(
        json["filter"]["or"][0],
        serde_json::json!({"is_null": {"field": "exposure", "is_null": false}})
    );
    assert_eq!(
        json["filter"]["or"][1],
        serde_json::json!({"extension": {"name": "cone", "tag": "query"}})
    );
    assert_eq!(json["extra_params"][0]["extension"], "cone");
    assert_eq!(json["extra_params"][0]["arguments"][2]["name"], "radius");
}

#[test]
fn test_schema_with_dangling_relation_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("schema.toml");
    fs::write(&path, "[models.A]\nb = { relation = \"B\" }\n").unwrap();

    match Schema::load(&path) {
        Err(SchemaError::UnknownRelation { model, field, target }) => {
            assert_eq!(model, "A");
            assert_eq!(field, "b");
            assert_eq!(target, "B");
        }
        other => panic!("expected UnknownRelation, got {other:?}"),
    }
}

#[test]
fn test_unknown_model() {
    let schema = load_schema();
    assert!(matches!(
        schema.target("Galaxy"),
        Err(SchemaError::UnknownModel(name)) if name == "Galaxy"
    ));
}

#[test]
fn test_missing_schema_file() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        Schema::load(temp_dir.path().join("missing.toml")),
        Err(SchemaError::Io(_))
    ));
}
