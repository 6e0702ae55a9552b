use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::diagnostics::Diagnostics;
use crate::record::Record;
use crate::schema::FieldKind;
use crate::value::Value;

pub type Accessor<E> = Arc<dyn Fn(&E) -> Value + Send + Sync>;

/// How a view-model field name maps back to the entity side.
pub enum FieldSource<E> {
    /// A renamed field: the entity path to resolve through the schema.
    Path(String),
    /// A computed field: the accessor to evaluate, with its kind declared
    /// up front since there is no schema entry to consult.
    Computed { kind: FieldKind, get: Accessor<E> },
}

impl<E> Clone for FieldSource<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Path(p) => Self::Path(p.clone()),
            Self::Computed { kind, get } => Self::Computed {
                kind: *kind,
                get: Arc::clone(get),
            },
        }
    }
}

impl<E> std::fmt::Debug for FieldSource<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Computed { kind, .. } => {
                f.debug_struct("Computed").field("kind", kind).finish_non_exhaustive()
            }
        }
    }
}

struct FieldMapping<E> {
    target: String,
    source: FieldSource<E>,
}

/// Declares how view model `V` is produced from entity `E`: a conversion
/// function, the non-trivial field entries (renamed or computed — same-named
/// direct copies need no entry), and any eager-load paths the data source
/// should honor.
///
/// Passed explicitly to [`GridEngine::new`](crate::GridEngine::new); there is
/// no ambient mapping state.
pub struct MappingProfile<E, V> {
    includes: Vec<String>,
    entries: Vec<FieldMapping<E>>,
    convert: Arc<dyn Fn(&E) -> V + Send + Sync>,
}

impl<E: 'static, V: 'static> MappingProfile<E, V> {
    pub fn new(convert: impl Fn(&E) -> V + Send + Sync + 'static) -> Self {
        Self {
            includes: Vec::new(),
            entries: Vec::new(),
            convert: Arc::new(convert),
        }
    }

    /// Map a view-model field name to a differently-named entity path.
    pub fn map_path(mut self, target: impl Into<String>, entity_path: impl Into<String>) -> Self {
        self.entries.push(FieldMapping {
            target: target.into(),
            source: FieldSource::Path(entity_path.into()),
        });
        self
    }

    /// Map a view-model field name to a computed accessor over the entity.
    pub fn map_computed(
        mut self,
        target: impl Into<String>,
        kind: FieldKind,
        get: impl Fn(&E) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.entries.push(FieldMapping {
            target: target.into(),
            source: FieldSource::Computed {
                kind,
                get: Arc::new(get),
            },
        });
        self
    }

    /// Add an eager-load navigation path handed to the data source on fetch.
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub(crate) fn convert(&self, row: &E) -> V {
        (self.convert)(row)
    }
}

impl<E: Clone + 'static> MappingProfile<E, E> {
    /// Identity profile for `E == V`: no entries, clone conversion.
    pub fn identity() -> Self {
        Self::new(E::clone)
    }
}

// ── Resolution and cache ────────────────────────────────────────

/// Field-name lookup table resolved from a profile, keyed by lowercased
/// target name. First writer wins on duplicate targets.
pub(crate) struct ResolvedMappings<E> {
    by_target: HashMap<String, FieldSource<E>>,
}

impl<E> ResolvedMappings<E> {
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            by_target: HashMap::new(),
        }
    }

    pub(crate) fn lookup(&self, field: &str) -> Option<&FieldSource<E>> {
        self.by_target.get(&field.to_ascii_lowercase())
    }
}

type CacheMap = HashMap<(TypeId, TypeId), Arc<dyn Any + Send + Sync>>;

fn cache() -> &'static RwLock<CacheMap> {
    static CACHE: OnceLock<RwLock<CacheMap>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve a profile into its lookup table, cached per `(E, V)` type pair
/// for the process lifetime. Entries are inserted whole, so concurrent
/// first-time resolutions race harmlessly to an identical table and readers
/// never observe partial state.
pub(crate) fn resolve<E, V>(profile: &MappingProfile<E, V>) -> Arc<ResolvedMappings<E>>
where
    E: 'static,
    V: 'static,
{
    let key = (TypeId::of::<E>(), TypeId::of::<V>());
    {
        let guard = cache().read().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = guard
            .get(&key)
            .and_then(|entry| Arc::clone(entry).downcast::<ResolvedMappings<E>>().ok())
        {
            return hit;
        }
    }

    let mut by_target: HashMap<String, FieldSource<E>> = HashMap::new();
    for entry in &profile.entries {
        by_target
            .entry(entry.target.to_ascii_lowercase())
            .or_insert_with(|| entry.source.clone());
    }
    let built = Arc::new(ResolvedMappings { by_target });

    let mut guard = cache().write().unwrap_or_else(|e| e.into_inner());
    let stored = guard
        .entry(key)
        .or_insert_with(|| Arc::clone(&built) as Arc<dyn Any + Send + Sync>);
    Arc::clone(stored)
        .downcast::<ResolvedMappings<E>>()
        .unwrap_or(built)
}

// ── Field access ────────────────────────────────────────────────

/// A client field name resolved to an entity-side accessor: either a
/// canonical schema path or a computed accessor from the mapping table.
pub(crate) enum FieldAccess<E> {
    Path { path: String, kind: FieldKind },
    Computed { kind: FieldKind, get: Accessor<E> },
}

impl<E: Record> FieldAccess<E> {
    pub(crate) fn kind(&self) -> FieldKind {
        match self {
            Self::Path { kind, .. } | Self::Computed { kind, .. } => *kind,
        }
    }

    pub(crate) fn get(&self, row: &E) -> Value {
        match self {
            Self::Path { path, .. } => row.value(path),
            Self::Computed { get, .. } => get(row),
        }
    }
}

/// Translate a client field name (view-model vocabulary) into an entity-side
/// accessor: mapping table first, then the schema directly. Unresolvable
/// names warn and yield `None` — the caller drops whatever referenced them.
pub(crate) fn resolve_field<E: Record>(
    field: &str,
    mappings: &ResolvedMappings<E>,
    diags: &mut Diagnostics,
) -> Option<FieldAccess<E>> {
    if let Some(source) = mappings.lookup(field) {
        return match source {
            FieldSource::Path(path) => match E::schema().resolve(path) {
                Some((canonical, kind)) => Some(FieldAccess::Path {
                    path: canonical.to_string(),
                    kind,
                }),
                None => {
                    diags.warn(field, format!("mapped path {path:?} is not a declared field"));
                    None
                }
            },
            FieldSource::Computed { kind, get } => Some(FieldAccess::Computed {
                kind: *kind,
                get: Arc::clone(get),
            }),
        };
    }
    match E::schema().resolve(field) {
        Some((canonical, kind)) => Some(FieldAccess::Path {
            path: canonical.to_string(),
            kind,
        }),
        None => {
            diags.warn(field, "does not resolve to a declared field");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_targets_first_writer_wins() {
        struct Entity;
        struct View;
        let profile = MappingProfile::<Entity, View>::new(|_| View)
            .map_path("name", "First")
            .map_path("name", "Second");
        let resolved = resolve(&profile);
        match resolved.lookup("Name") {
            Some(FieldSource::Path(p)) => assert_eq!(p, "First"),
            other => panic!("expected path mapping, got {other:?}"),
        }
    }

    #[test]
    fn cache_returns_same_table_per_type_pair() {
        struct Entity;
        struct View;
        let profile = MappingProfile::<Entity, View>::new(|_| View).map_path("a", "B");
        let first = resolve(&profile);
        let second = resolve(&profile);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn later_profile_for_cached_pair_is_ignored() {
        struct Entity;
        struct View;
        let first = resolve(&MappingProfile::<Entity, View>::new(|_| View).map_path("a", "B"));
        let second = resolve(&MappingProfile::<Entity, View>::new(|_| View).map_path("a", "C"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        struct Entity;
        struct View;
        let profile =
            MappingProfile::<Entity, View>::new(|_| View).map_path("fullName", "FamilyName");
        let resolved = resolve(&profile);
        assert!(resolved.lookup("FULLNAME").is_some());
        assert!(resolved.lookup("missing").is_none());
    }
}
