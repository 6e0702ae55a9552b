use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use trellis_query::{Aggregate, AggregateFn, GridRequest, SortDirection};

use crate::diagnostics::Diagnostics;
use crate::envelope::ResultEnvelope;
use crate::error::EngineError;
use crate::mapping::{self, FieldAccess, MappingProfile, ResolvedMappings, resolve_field};
use crate::predicate;
use crate::record::Record;
use crate::schema::FieldKind;
use crate::source::DataSource;
use crate::value::Value;

/// The envelope plus the conditions that were silently dropped while
/// serving the request. Hosts serialize `envelope`; `diagnostics` is for
/// operators and tests.
#[derive(Debug)]
pub struct GridResult<V> {
    pub envelope: ResultEnvelope<V>,
    pub diagnostics: Diagnostics,
}

/// Executes grid requests over a data source of `E`, shaping results as `V`.
///
/// Construction resolves the profile's field-mapping table (cached per
/// `(E, V)` type pair for the process lifetime); `execute` is then a pure
/// per-request pipeline: fetch, filter, count, sort, page, aggregate,
/// convert.
pub struct GridEngine<E, V> {
    profile: MappingProfile<E, V>,
    mappings: Arc<ResolvedMappings<E>>,
}

impl<E, V> GridEngine<E, V>
where
    E: Record + 'static,
    V: 'static,
{
    pub fn new(profile: MappingProfile<E, V>) -> Self {
        let mappings = mapping::resolve(&profile);
        Self { profile, mappings }
    }

    pub fn execute<S>(&self, source: &S, request: &GridRequest) -> Result<GridResult<V>, EngineError>
    where
        S: DataSource<E>,
    {
        let mut diags = Diagnostics::default();

        let rows = source
            .fetch(self.profile.includes())
            .map_err(|e| EngineError::Source(Box::new(e)))?;

        let compiled = request
            .filter
            .as_ref()
            .and_then(|node| predicate::compile(node, &self.mappings, &mut diags));
        let mut filtered = match compiled {
            Some(p) => rows.into_iter().filter(|row| p(row)).collect(),
            None => rows,
        };

        // Total reflects the filtered set, before paging.
        let total = filtered.len() as u64;

        let keys = self.sort_keys(request, &mut diags);
        if !keys.is_empty() {
            filtered.sort_by(|a, b| compare_rows(a, b, &keys));
        }

        // Aggregates run over the filtered, pre-paging set.
        let aggregates = self.compute_aggregates(&filtered, request, &mut diags);

        let (skip, take) = request.resolved_skip_take();
        let paged = filtered.iter().skip(skip.unwrap_or(0));
        let data: Vec<V> = match take {
            Some(n) => paged.take(n).map(|row| self.profile.convert(row)).collect(),
            None => paged.map(|row| self.profile.convert(row)).collect(),
        };

        Ok(GridResult {
            envelope: ResultEnvelope {
                data,
                total,
                aggregates,
            },
            diagnostics: diags,
        })
    }

    fn sort_keys(
        &self,
        request: &GridRequest,
        diags: &mut Diagnostics,
    ) -> Vec<(FieldAccess<E>, SortDirection)> {
        request
            .sort
            .iter()
            .filter_map(|sort| {
                resolve_field(&sort.field, &self.mappings, diags)
                    .map(|access| (access, sort.direction))
            })
            .collect()
    }

    fn compute_aggregates(
        &self,
        rows: &[E],
        request: &GridRequest,
        diags: &mut Diagnostics,
    ) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        let wanted = request
            .aggregates
            .iter()
            .chain(request.groups.iter().flat_map(|g| g.aggregates.iter()));
        for aggregate in wanted {
            let key = aggregate.key();
            if out.contains_key(&key) {
                continue;
            }
            if let Some(value) = self.compute_aggregate(rows, aggregate, diags) {
                out.insert(key, value);
            }
        }
        out
    }

    fn compute_aggregate(
        &self,
        rows: &[E],
        aggregate: &Aggregate,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        if aggregate.function == AggregateFn::Count {
            return Some(Value::Int(rows.len() as i64));
        }

        let access = resolve_field(&aggregate.field, &self.mappings, diags)?;
        let kind = access.kind();

        match aggregate.function {
            AggregateFn::Count => unreachable!("handled above"),
            AggregateFn::Sum | AggregateFn::Average if !kind.is_numeric() => {
                diags.warn(
                    &aggregate.field,
                    format!("{} requires a numeric field", aggregate.function.as_str()),
                );
                None
            }
            AggregateFn::Sum => {
                let sum: f64 = numbers(rows, &access).sum();
                Some(numeric_value(kind, sum))
            }
            AggregateFn::Average => {
                let (count, sum) = numbers(rows, &access)
                    .fold((0u64, 0.0), |(c, s), n| (c + 1, s + n));
                if count == 0 {
                    Some(Value::Null)
                } else {
                    Some(Value::Float(sum / count as f64))
                }
            }
            AggregateFn::Max | AggregateFn::Min => self.extremum(rows, aggregate, &access, diags),
        }
    }

    fn extremum(
        &self,
        rows: &[E],
        aggregate: &Aggregate,
        access: &FieldAccess<E>,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        let kind = access.kind();
        if !kind.is_numeric() && kind != FieldKind::Date {
            diags.warn(
                &aggregate.field,
                format!(
                    "{} requires a numeric or date field",
                    aggregate.function.as_str()
                ),
            );
            return None;
        }
        let mut best: Option<Value> = None;
        for row in rows {
            let value = access.get(row);
            if value.is_null() {
                continue;
            }
            let replace = match &best {
                None => true,
                Some(current) => {
                    let ord = Value::compare(&value, current);
                    match aggregate.function {
                        AggregateFn::Max => ord == Ordering::Greater,
                        _ => ord == Ordering::Less,
                    }
                }
            };
            if replace {
                best = Some(value);
            }
        }
        Some(best.unwrap_or(Value::Null))
    }
}

fn numbers<'a, E: Record>(
    rows: &'a [E],
    access: &'a FieldAccess<E>,
) -> impl Iterator<Item = f64> + 'a {
    rows.iter().filter_map(|row| access.get(row).as_number())
}

fn compare_rows<E: Record>(
    a: &E,
    b: &E,
    keys: &[(FieldAccess<E>, SortDirection)],
) -> Ordering {
    for (access, direction) in keys {
        let ord = Value::compare(&access.get(a), &access.get(b));
        let ord = match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn numeric_value(kind: FieldKind, n: f64) -> Value {
    match kind {
        FieldKind::Int => Value::Int(n as i64),
        _ => Value::Float(n),
    }
}
