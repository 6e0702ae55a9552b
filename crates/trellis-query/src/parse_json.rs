use serde::Deserialize;

use crate::aggregate::{Aggregate, AggregateFn, Group};
use crate::filter::{Filter, FilterGroup, FilterNode, LogicalOp};
use crate::operator::Operator;
use crate::request::GridRequest;
use crate::sort::{Sort, SortDirection};

/// Parse error for structured grid documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "grid request parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Parse a structured JSON grid document into a grid request.
///
/// A document that fails to deserialize is a caller-visible error. Within a
/// well-formed document, single entries with unknown operator or aggregate
/// spellings (or non-scalar filter values) are dropped rather than failing
/// the whole request.
pub fn parse_json(body: &str) -> Result<GridRequest, ParseError> {
    let doc: GridDocument = serde_json::from_str(body)
        .map_err(|e| ParseError(format!("malformed grid document: {e}")))?;

    Ok(GridRequest {
        filter: doc.filter.and_then(|f| convert_filter(&f)),
        sort: doc.sort.iter().map(convert_sort).collect(),
        groups: doc.group.iter().map(convert_group).collect(),
        aggregates: doc
            .aggregate
            .iter()
            .filter_map(convert_aggregate)
            .collect(),
        take: doc.take,
        skip: doc.skip,
        page: doc.page,
        page_size: doc.page_size,
    })
}

// ── Document shape ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GridDocument {
    take: Option<usize>,
    skip: Option<usize>,
    page: Option<usize>,
    #[serde(rename = "pageSize")]
    page_size: Option<usize>,
    filter: Option<FilterDoc>,
    #[serde(default)]
    sort: Vec<SortDoc>,
    #[serde(default)]
    group: Vec<GroupDoc>,
    #[serde(default)]
    aggregate: Vec<AggregateDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilterDoc {
    Group {
        logic: String,
        #[serde(default)]
        filters: Vec<FilterDoc>,
    },
    Leaf {
        field: String,
        operator: String,
        #[serde(default)]
        value: serde_json::Value,
        #[serde(rename = "ignoreCase", default)]
        ignore_case: Option<bool>,
    },
}

#[derive(Debug, Deserialize)]
struct SortDoc {
    field: String,
    #[serde(default)]
    dir: String,
}

#[derive(Debug, Deserialize)]
struct GroupDoc {
    field: String,
    #[serde(default)]
    dir: String,
    #[serde(default)]
    aggregates: Vec<AggregateDoc>,
}

#[derive(Debug, Deserialize)]
struct AggregateDoc {
    field: String,
    aggregate: String,
}

// ── Conversion ──────────────────────────────────────────────────

fn convert_filter(doc: &FilterDoc) -> Option<FilterNode> {
    match doc {
        FilterDoc::Group { logic, filters } => {
            let children: Vec<FilterNode> = filters.iter().filter_map(convert_filter).collect();
            if children.is_empty() {
                return None;
            }
            Some(FilterNode::Group(FilterGroup {
                logic: LogicalOp::parse(logic),
                children,
            }))
        }
        FilterDoc::Leaf {
            field,
            operator,
            value,
            ignore_case,
        } => {
            let operator = Operator::parse(operator)?;
            let value = normalize_value(value)?;
            Some(FilterNode::Condition(Filter {
                field: field.clone(),
                operator,
                value,
                ignore_case: ignore_case.unwrap_or(true),
            }))
        }
    }
}

/// Normalize a JSON filter literal to its canonical string form. Arrays and
/// objects have no scalar form and drop the condition.
fn normalize_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null => Some(String::new()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

fn convert_sort(doc: &SortDoc) -> Sort {
    Sort {
        field: doc.field.clone(),
        direction: SortDirection::parse(&doc.dir),
    }
}

fn convert_group(doc: &GroupDoc) -> Group {
    Group {
        field: doc.field.clone(),
        direction: SortDirection::parse(&doc.dir),
        aggregates: doc.aggregates.iter().filter_map(convert_aggregate).collect(),
    }
}

fn convert_aggregate(doc: &AggregateDoc) -> Option<Aggregate> {
    Some(Aggregate {
        field: doc.field.clone(),
        function: AggregateFn::parse(&doc.aggregate)?,
    })
}
