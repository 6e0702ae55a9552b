use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::aggregate::{Aggregate, AggregateFn, Group};
use crate::filter::{Filter, FilterGroup, FilterNode, LogicalOp};
use crate::operator::Operator;
use crate::request::GridRequest;
use crate::sort::{Sort, SortDirection};

/// Parse a raw query string (`take=10&sort%5B0%5D.field=name&...`) into a
/// grid request. Splits on `&`, treats `+` as space, and percent-decodes
/// keys and values before handing them to [`parse_pairs`].
pub fn parse_query(query: &str) -> GridRequest {
    let pairs = query.split('&').filter(|s| !s.is_empty()).map(|pair| {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        (decode(key), decode(value))
    });
    parse_pairs(pairs)
}

fn decode(s: &str) -> String {
    let plus_to_space = s.replace('+', " ");
    percent_decode_str(&plus_to_space)
        .decode_utf8_lossy()
        .into_owned()
}

/// Parse decoded key/value pairs (query string or form fields) into a grid
/// request.
///
/// The flat format never fails: HTML forms over-supply empty strings, so an
/// unparsable scalar reads as absent rather than erroring.
/// Filters arrive in at most two slots (`field1/operator1/value1/ignoreCase1`,
/// `field2/...`) joined by `logic`; sort, group, and aggregate arrive as
/// indexed keys (`sort[0].field`, ...) scanned from index 0 — the first
/// missing index terminates the scan.
pub fn parse_pairs<I, K, V>(pairs: I) -> GridRequest
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let map: HashMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    GridRequest {
        filter: parse_filter_slots(&map),
        sort: parse_sorts(&map),
        groups: parse_groups(&map),
        aggregates: parse_aggregates(&map),
        take: scalar(&map, "take"),
        skip: scalar(&map, "skip"),
        page: scalar(&map, "page"),
        page_size: scalar(&map, "pageSize"),
    }
}

fn scalar(map: &HashMap<String, String>, key: &str) -> Option<usize> {
    map.get(key).and_then(|v| v.trim().parse().ok())
}

fn parse_filter_slots(map: &HashMap<String, String>) -> Option<FilterNode> {
    let mut conditions = Vec::new();
    for slot in 1..=2 {
        let Some(field) = map.get(&format!("field{slot}")) else {
            continue;
        };
        if field.trim().is_empty() {
            continue;
        }
        let Some(operator) = map
            .get(&format!("operator{slot}"))
            .and_then(|s| Operator::parse(s))
        else {
            continue;
        };
        let value = map
            .get(&format!("value{slot}"))
            .cloned()
            .unwrap_or_default();
        let ignore_case = map
            .get(&format!("ignoreCase{slot}"))
            .map_or(true, |s| !s.trim().eq_ignore_ascii_case("false"));
        conditions.push(Filter {
            field: field.clone(),
            operator,
            value,
            ignore_case,
        });
    }

    match conditions.len() {
        0 => None,
        1 => conditions.pop().map(FilterNode::Condition),
        _ => {
            let logic = map.get("logic").map_or(LogicalOp::And, |s| LogicalOp::parse(s));
            Some(FilterNode::Group(FilterGroup {
                logic,
                children: conditions.into_iter().map(FilterNode::Condition).collect(),
            }))
        }
    }
}

fn parse_sorts(map: &HashMap<String, String>) -> Vec<Sort> {
    let mut sorts = Vec::new();
    for index in 0.. {
        let Some(field) = map.get(&format!("sort[{index}].field")) else {
            break;
        };
        let direction = map
            .get(&format!("sort[{index}].dir"))
            .map_or(SortDirection::Asc, |s| SortDirection::parse(s));
        sorts.push(Sort {
            field: field.clone(),
            direction,
        });
    }
    sorts
}

fn parse_groups(map: &HashMap<String, String>) -> Vec<Group> {
    let mut groups = Vec::new();
    for index in 0.. {
        let Some(field) = map.get(&format!("group[{index}].field")) else {
            break;
        };
        let direction = map
            .get(&format!("group[{index}].dir"))
            .map_or(SortDirection::Asc, |s| SortDirection::parse(s));
        groups.push(Group {
            field: field.clone(),
            direction,
            aggregates: Vec::new(),
        });
    }
    groups
}

fn parse_aggregates(map: &HashMap<String, String>) -> Vec<Aggregate> {
    let mut aggregates = Vec::new();
    for index in 0.. {
        let Some(field) = map.get(&format!("aggregate[{index}].field")) else {
            break;
        };
        // Unknown function spellings drop the entry but keep scanning.
        if let Some(function) = map
            .get(&format!("aggregate[{index}].aggregate"))
            .and_then(|s| AggregateFn::parse(s))
        {
            aggregates.push(Aggregate {
                field: field.clone(),
                function,
            });
        }
    }
    aggregates
}
