use std::sync::OnceLock;

use trellis_query::{
    Aggregate, AggregateFn, Filter, FilterNode, GridRequest, Group, Operator, Sort,
    SortDirection, parse_json,
};

use crate::{
    DataSource, EngineError, FieldKind, GridEngine, MappingProfile, MemorySource, Record, Schema,
    Value,
};

// ── Fixtures ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Person {
    family_name: String,
    given_name: String,
    age: i64,
    born: i64,
    active: bool,
}

impl Record for Person {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .field("FamilyName", FieldKind::String)
                .field("GivenName", FieldKind::String)
                .field("Age", FieldKind::Int)
                .field("Born", FieldKind::Date)
                .field("Active", FieldKind::Bool)
                .build()
        })
    }

    fn value(&self, path: &str) -> Value {
        match path {
            "FamilyName" => self.family_name.clone().into(),
            "GivenName" => self.given_name.clone().into(),
            "Age" => self.age.into(),
            "Born" => Value::Date(self.born),
            "Active" => self.active.into(),
            _ => Value::Null,
        }
    }
}

/// View model with a renamed field and a computed one.
#[derive(Debug, Clone, PartialEq)]
struct PersonView {
    surname: String,
    full_name: String,
    age: i64,
}

fn person(family: &str, given: &str, age: i64) -> Person {
    Person {
        family_name: family.into(),
        given_name: given.into(),
        age,
        born: 0,
        active: true,
    }
}

fn people() -> Vec<Person> {
    vec![
        person("Jordan", "Michael", 30),
        person("Johnson", "Dwayne", 40),
        person("Froning", "Rich", 25),
    ]
}

fn identity_engine() -> GridEngine<Person, Person> {
    GridEngine::new(MappingProfile::identity())
}

fn view_engine() -> GridEngine<Person, PersonView> {
    let profile = MappingProfile::new(|p: &Person| PersonView {
        surname: p.family_name.clone(),
        full_name: format!("{} {}", p.given_name, p.family_name),
        age: p.age,
    })
    .map_path("surname", "FamilyName")
    .map_computed("fullName", FieldKind::String, |p: &Person| {
        Value::String(format!("{} {}", p.given_name, p.family_name))
    });
    GridEngine::new(profile)
}

fn sort_by(field: &str, direction: SortDirection) -> Vec<Sort> {
    vec![Sort {
        field: field.into(),
        direction,
    }]
}

fn condition(field: &str, operator: Operator, value: &str) -> FilterNode {
    FilterNode::Condition(Filter {
        field: field.into(),
        operator,
        value: value.into(),
        ignore_case: true,
    })
}

fn family_names(rows: &[Person]) -> Vec<&str> {
    rows.iter().map(|p| p.family_name.as_str()).collect()
}

// ── Worked scenarios ────────────────────────────────────────────

#[test]
fn sorted_first_page() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        sort: sort_by("familyName", SortDirection::Asc),
        page: Some(1),
        page_size: Some(2),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(family_names(&result.envelope.data), ["Froning", "Johnson"]);
    assert_eq!(result.envelope.total, 3);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn startswith_filter_preserves_source_order() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("familyName", Operator::StartsWith, "Jo")),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(family_names(&result.envelope.data), ["Jordan", "Johnson"]);
    assert_eq!(result.envelope.total, 2);
}

#[test]
fn average_age() {
    let engine = identity_engine();
    let source = MemorySource::new(
        (1..=5).map(|i| person("P", "Q", i * 10)).collect(),
    );
    let request = GridRequest {
        aggregates: vec![Aggregate {
            field: "age".into(),
            function: AggregateFn::Average,
        }],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(
        result.envelope.aggregates.get("average__age"),
        Some(&Value::Float(30.0))
    );
}

// ── Paging (P1) ─────────────────────────────────────────────────

#[test]
fn page_slices_are_exact() {
    let engine = identity_engine();
    let rows: Vec<Person> = (0..10).map(|i| person(&format!("F{i:02}"), "G", i)).collect();
    let source = MemorySource::new(rows);

    for page in 1..=4 {
        let request = GridRequest {
            sort: sort_by("familyName", SortDirection::Asc),
            page: Some(page),
            page_size: Some(3),
            ..Default::default()
        };
        let result = engine.execute(&source, &request).unwrap();
        let expected_len = 3.min(10 - (page - 1) * 3);
        assert_eq!(result.envelope.data.len(), expected_len, "page {page}");
        assert_eq!(result.envelope.total, 10);
        if let Some(first) = result.envelope.data.first() {
            assert_eq!(first.family_name, format!("F{:02}", (page - 1) * 3));
        }
    }
}

#[test]
fn skip_take_paging() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        sort: sort_by("familyName", SortDirection::Asc),
        skip: Some(1),
        take: Some(1),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(family_names(&result.envelope.data), ["Johnson"]);
}

#[test]
fn no_paging_returns_everything() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let result = engine.execute(&source, &GridRequest::default()).unwrap();
    assert_eq!(result.envelope.data.len(), 3);
}

// ── Filter/count consistency (P2) and case-insensitivity (P3) ──

#[test]
fn total_is_independent_of_paging() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("familyName", Operator::StartsWith, "jo")),
        take: Some(1),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(result.envelope.data.len(), 1);
    assert_eq!(result.envelope.total, 2);
}

#[test]
fn string_filters_ignore_case() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    for (op, value) in [
        (Operator::Eq, "JORDAN"),
        (Operator::Contains, "oRdA"),
        (Operator::EndsWith, "DAN"),
    ] {
        let request = GridRequest {
            filter: Some(condition("familyName", op, value)),
            ..Default::default()
        };
        let result = engine.execute(&source, &request).unwrap();
        assert_eq!(
            family_names(&result.envelope.data),
            ["Jordan"],
            "{op:?} {value:?}"
        );
    }
}

// ── Aggregate independence (P4) ─────────────────────────────────

#[test]
fn aggregates_cover_filtered_set_even_with_take_one() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        take: Some(1),
        aggregates: vec![
            Aggregate {
                field: "age".into(),
                function: AggregateFn::Sum,
            },
            Aggregate {
                field: "age".into(),
                function: AggregateFn::Count,
            },
            Aggregate {
                field: "age".into(),
                function: AggregateFn::Max,
            },
            Aggregate {
                field: "age".into(),
                function: AggregateFn::Min,
            },
        ],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    let aggregates = &result.envelope.aggregates;
    assert_eq!(aggregates.get("sum__age"), Some(&Value::Int(95)));
    assert_eq!(aggregates.get("count__age"), Some(&Value::Int(3)));
    assert_eq!(aggregates.get("max__age"), Some(&Value::Int(40)));
    assert_eq!(aggregates.get("min__age"), Some(&Value::Int(25)));
}

#[test]
fn aggregates_respect_filter() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("familyName", Operator::StartsWith, "jo")),
        aggregates: vec![Aggregate {
            field: "age".into(),
            function: AggregateFn::Sum,
        }],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(
        result.envelope.aggregates.get("sum__age"),
        Some(&Value::Int(70))
    );
}

#[test]
fn group_aggregates_merge_into_the_aggregate_pass() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        groups: vec![Group {
            field: "active".into(),
            direction: SortDirection::Asc,
            aggregates: vec![Aggregate {
                field: "age".into(),
                function: AggregateFn::Max,
            }],
        }],
        aggregates: vec![Aggregate {
            field: "age".into(),
            function: AggregateFn::Max,
        }],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(result.envelope.aggregates.len(), 1);
    assert_eq!(
        result.envelope.aggregates.get("max__age"),
        Some(&Value::Int(40))
    );
}

// ── Identity mapping round-trip (P5) ────────────────────────────

#[test]
fn identity_output_equals_direct_pipeline() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("age", Operator::Gte, "30")),
        sort: sort_by("age", SortDirection::Desc),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    let mut expected: Vec<Person> = people().into_iter().filter(|p| p.age >= 30).collect();
    expected.sort_by(|a, b| b.age.cmp(&a.age));
    assert_eq!(result.envelope.data, expected);
}

// ── Leniency (P6) ───────────────────────────────────────────────

#[test]
fn unresolvable_filter_field_returns_unfiltered_set() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("noSuchField", Operator::Eq, "x")),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(result.envelope.data.len(), 3);
    assert_eq!(result.envelope.total, 3);
    assert_eq!(result.diagnostics.warnings().len(), 1);
    assert_eq!(result.diagnostics.warnings()[0].field, "noSuchField");
}

#[test]
fn unresolvable_sort_field_is_skipped() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        sort: vec![
            Sort {
                field: "ghost".into(),
                direction: SortDirection::Asc,
            },
            Sort {
                field: "familyName".into(),
                direction: SortDirection::Asc,
            },
        ],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(
        family_names(&result.envelope.data),
        ["Froning", "Johnson", "Jordan"]
    );
    assert_eq!(result.diagnostics.warnings().len(), 1);
}

#[test]
fn unresolvable_aggregate_field_contributes_nothing() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        aggregates: vec![Aggregate {
            field: "ghost".into(),
            function: AggregateFn::Sum,
        }],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert!(result.envelope.aggregates.is_empty());
    assert_eq!(result.diagnostics.warnings().len(), 1);
}

#[test]
fn sum_over_string_field_warns_and_contributes_nothing() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        aggregates: vec![Aggregate {
            field: "familyName".into(),
            function: AggregateFn::Sum,
        }],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert!(result.envelope.aggregates.is_empty());
    assert_eq!(result.diagnostics.warnings().len(), 1);
}

// ── Sorting ─────────────────────────────────────────────────────

#[test]
fn multi_key_sort_breaks_ties_in_order() {
    let engine = identity_engine();
    let source = MemorySource::new(vec![
        person("Smith", "Alice", 30),
        person("Smith", "Bob", 25),
        person("Adams", "Carol", 35),
    ]);
    let request = GridRequest {
        sort: vec![
            Sort {
                field: "familyName".into(),
                direction: SortDirection::Asc,
            },
            Sort {
                field: "age".into(),
                direction: SortDirection::Desc,
            },
        ],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    let pairs: Vec<(&str, i64)> = result
        .envelope
        .data
        .iter()
        .map(|p| (p.family_name.as_str(), p.age))
        .collect();
    assert_eq!(pairs, [("Adams", 35), ("Smith", 30), ("Smith", 25)]);
}

// ── View-model mapping ──────────────────────────────────────────

#[test]
fn renamed_field_filters_and_sorts_through_mapping() {
    let engine = view_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("surname", Operator::StartsWith, "jo")),
        sort: sort_by("surname", SortDirection::Asc),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    let surnames: Vec<&str> = result
        .envelope
        .data
        .iter()
        .map(|v| v.surname.as_str())
        .collect();
    assert_eq!(surnames, ["Johnson", "Jordan"]);
    assert_eq!(result.envelope.total, 2);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn computed_field_filters_through_mapping() {
    let engine = view_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("fullName", Operator::Contains, "michael jo")),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(result.envelope.data.len(), 1);
    assert_eq!(result.envelope.data[0].full_name, "Michael Jordan");
}

#[test]
fn entity_fields_still_resolve_for_view_requests() {
    let engine = view_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        filter: Some(condition("age", Operator::Gt, "28")),
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(result.envelope.total, 2);
}

// ── Source failures ─────────────────────────────────────────────

struct FailingSource;

#[derive(Debug)]
struct Unavailable;

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store unavailable")
    }
}

impl std::error::Error for Unavailable {}

impl DataSource<Person> for FailingSource {
    type Error = Unavailable;

    fn fetch(&self, _includes: &[String]) -> Result<Vec<Person>, Self::Error> {
        Err(Unavailable)
    }
}

#[test]
fn source_failure_propagates() {
    let engine = identity_engine();
    let err = engine
        .execute(&FailingSource, &GridRequest::default())
        .unwrap_err();
    match err {
        EngineError::Source(inner) => assert_eq!(inner.to_string(), "store unavailable"),
    }
}

// ── End-to-end through the JSON wire parser ─────────────────────

#[test]
fn json_request_round_trip() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = parse_json(
        r#"{
            "page": 1, "pageSize": 2,
            "filter": {"logic": "or", "filters": [
                {"field": "familyName", "operator": "startswith", "value": "Jo"},
                {"field": "age", "operator": "lt", "value": 28}
            ]},
            "sort": [{"field": "familyName", "dir": "asc"}],
            "aggregate": [{"field": "age", "aggregate": "sum"}]
        }"#,
    )
    .unwrap();

    let result = engine.execute(&source, &request).unwrap();
    assert_eq!(family_names(&result.envelope.data), ["Froning", "Johnson"]);
    assert_eq!(result.envelope.total, 3);
    assert_eq!(
        result.envelope.aggregates.get("sum__age"),
        Some(&Value::Int(95))
    );
}

#[test]
fn envelope_serializes_with_stable_keys() {
    let engine = identity_engine();
    let source = MemorySource::new(people());
    let request = GridRequest {
        take: Some(1),
        sort: sort_by("age", SortDirection::Asc),
        aggregates: vec![Aggregate {
            field: "age".into(),
            function: AggregateFn::Sum,
        }],
        ..Default::default()
    };

    let result = engine.execute(&source, &request).unwrap();
    let aggregates = serde_json::to_value(&result.envelope.aggregates).unwrap();
    assert_eq!(aggregates, serde_json::json!({"sum__age": 95}));
    assert_eq!(result.envelope.total, 3);
}
