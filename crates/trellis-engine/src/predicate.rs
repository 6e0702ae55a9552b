use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use trellis_query::{Filter, FilterGroup, FilterNode, LogicalOp, Operator};

use crate::diagnostics::Diagnostics;
use crate::mapping::{FieldAccess, ResolvedMappings, resolve_field};
use crate::record::Record;
use crate::schema::FieldKind;
use crate::value::Value;

pub(crate) type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Compile a filter tree into a composed predicate over the entity type.
///
/// Returns `None` when nothing survives compilation (an empty group, or a
/// tree whose conditions were all dropped as unresolvable) — the caller
/// applies no filtering in that case. Conditions whose field resolves but
/// whose operator or literal is unusable for the declared kind compile to
/// always-false instead of dropping, so they still exclude rows.
pub(crate) fn compile<E: Record + 'static>(
    node: &FilterNode,
    mappings: &ResolvedMappings<E>,
    diags: &mut Diagnostics,
) -> Option<Predicate<E>> {
    match node {
        FilterNode::Condition(filter) => compile_condition(filter, mappings, diags),
        FilterNode::Group(group) => compile_group(group, mappings, diags),
    }
}

fn compile_group<E: Record + 'static>(
    group: &FilterGroup,
    mappings: &ResolvedMappings<E>,
    diags: &mut Diagnostics,
) -> Option<Predicate<E>> {
    let children: Vec<Predicate<E>> = group
        .children
        .iter()
        .filter_map(|child| compile(child, mappings, diags))
        .collect();
    if children.is_empty() {
        return None;
    }
    Some(match group.logic {
        LogicalOp::And => Box::new(move |row| children.iter().all(|p| p(row))),
        LogicalOp::Or => Box::new(move |row| children.iter().any(|p| p(row))),
    })
}

fn compile_condition<E: Record + 'static>(
    filter: &Filter,
    mappings: &ResolvedMappings<E>,
    diags: &mut Diagnostics,
) -> Option<Predicate<E>> {
    let access = resolve_field(&filter.field, mappings, diags)?;
    Some(match access.kind() {
        FieldKind::String => compile_string(access, filter, diags),
        FieldKind::Int | FieldKind::Float => compile_numeric(access, filter, diags),
        FieldKind::Date => compile_date(access, filter, diags),
        FieldKind::Bool => compile_bool(access, filter, diags),
    })
}

fn always_false<E>() -> Predicate<E> {
    Box::new(|_| false)
}

/// String comparison is case-insensitive by construction — both operands are
/// lower-cased regardless of the wire `ignoreCase` flag. A Null (or
/// non-string) source value never matches.
fn compile_string<E: Record + 'static>(
    access: FieldAccess<E>,
    filter: &Filter,
    diags: &mut Diagnostics,
) -> Predicate<E> {
    let test: fn(&str, &str) -> bool = match filter.operator {
        Operator::Eq => |hay, needle| hay == needle,
        Operator::Neq => |hay, needle| hay != needle,
        Operator::Contains => |hay, needle| hay.contains(needle),
        Operator::DoesNotContain => |hay, needle| !hay.contains(needle),
        Operator::StartsWith => |hay, needle| hay.starts_with(needle),
        Operator::EndsWith => |hay, needle| hay.ends_with(needle),
        Operator::Gte | Operator::Gt | Operator::Lte | Operator::Lt => {
            diags.warn(
                &filter.field,
                "ordering operators are not supported on string fields",
            );
            return always_false();
        }
    };
    let needle = filter.value.to_lowercase();
    Box::new(move |row| match access.get(row) {
        Value::String(s) => test(&s.to_lowercase(), &needle),
        _ => false,
    })
}

fn compile_numeric<E: Record + 'static>(
    access: FieldAccess<E>,
    filter: &Filter,
    diags: &mut Diagnostics,
) -> Predicate<E> {
    let Some(matches) = ordering_test(filter.operator) else {
        diags.warn(
            &filter.field,
            "operator is not supported on numeric fields",
        );
        return always_false();
    };
    let Ok(literal) = filter.value.trim().parse::<f64>() else {
        diags.warn(
            &filter.field,
            format!("literal {:?} is not numeric", filter.value),
        );
        return always_false();
    };
    Box::new(move |row| match access.get(row).as_number() {
        Some(n) => matches(n.partial_cmp(&literal).unwrap_or(Ordering::Equal)),
        None => false,
    })
}

fn compile_date<E: Record + 'static>(
    access: FieldAccess<E>,
    filter: &Filter,
    diags: &mut Diagnostics,
) -> Predicate<E> {
    let Some(matches) = ordering_test(filter.operator) else {
        diags.warn(&filter.field, "operator is not supported on date fields");
        return always_false();
    };
    let Some(literal) = parse_date_literal(&filter.value) else {
        diags.warn(
            &filter.field,
            format!("literal {:?} is not a recognized date", filter.value),
        );
        return always_false();
    };
    Box::new(move |row| match access.get(row) {
        Value::Date(millis) => matches(millis.cmp(&literal)),
        _ => false,
    })
}

fn compile_bool<E: Record + 'static>(
    access: FieldAccess<E>,
    filter: &Filter,
    diags: &mut Diagnostics,
) -> Predicate<E> {
    let expected = match filter.value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => true,
        "false" | "0" => false,
        other => {
            diags.warn(&filter.field, format!("literal {other:?} is not a boolean"));
            return always_false();
        }
    };
    let test: fn(bool, bool) -> bool = match filter.operator {
        Operator::Eq => |b, expected| b == expected,
        Operator::Neq => |b, expected| b != expected,
        _ => {
            diags.warn(&filter.field, "operator is not supported on boolean fields");
            return always_false();
        }
    };
    Box::new(move |row| match access.get(row) {
        Value::Bool(b) => test(b, expected),
        _ => false,
    })
}

fn ordering_test(operator: Operator) -> Option<fn(Ordering) -> bool> {
    match operator {
        Operator::Eq => Some(|o| o == Ordering::Equal),
        Operator::Neq => Some(|o| o != Ordering::Equal),
        Operator::Gt => Some(|o| o == Ordering::Greater),
        Operator::Gte => Some(|o| o != Ordering::Less),
        Operator::Lt => Some(|o| o == Ordering::Less),
        Operator::Lte => Some(|o| o != Ordering::Greater),
        _ => None,
    }
}

/// Parse a wire date literal to epoch milliseconds.
///
/// Browser grids send `Date.toString()` output with a ` GMT+hhmm (...)`
/// suffix; that suffix is stripped before trying a fixed set of
/// locale-independent formats.
fn parse_date_literal(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let stripped = match trimmed.find(" GMT") {
        Some(i) => trimmed[..i].trim_end(),
        None => trimmed,
    };
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(stripped) {
        return Some(dt.timestamp_millis());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%a %b %d %Y %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(stripped, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}
