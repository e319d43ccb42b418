//! Per-type attribute metadata tables, cached process-wide.
//!
//! Each strategy keeps its own cache keyed by `TypeId`, populated lazily on
//! the first comparison involving a type and never invalidated (types are
//! stable for the process lifetime). Lookup is read-many: a read-lock probe,
//! then on a miss the table is built outside the lock and published with an
//! insert-if-absent. Under contention the builder may run more than once,
//! but every reader converges on the single published table and never sees a
//! partial one.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::reflect::{AccessorReflect, FieldSpec, MethodSpec, StateReflect};

/// Ordered attribute-name to state-slot mapping for one type.
pub(crate) type FieldTable = BTreeMap<String, &'static FieldSpec>;

/// Ordered attribute-name to accessor mapping for one type.
pub(crate) type MethodTable = BTreeMap<String, &'static MethodSpec>;

// The reflection plumbing accessor, never an attribute.
const TYPE_NAME_ACCESSOR: &str = "type_name";

static STATE_TABLES: OnceLock<RwLock<HashMap<TypeId, Arc<FieldTable>>>> = OnceLock::new();
static ACCESSOR_TABLES: OnceLock<RwLock<HashMap<TypeId, Arc<MethodTable>>>> = OnceLock::new();

/// The state metadata table for an object's runtime type.
pub(crate) fn state_table(obj: &dyn StateReflect) -> Arc<FieldTable> {
    let tables = STATE_TABLES.get_or_init(|| RwLock::new(HashMap::new()));
    let id = obj.as_any().type_id();
    if let Some(table) = tables.read().expect("lock poisoned").get(&id) {
        return Arc::clone(table);
    }
    let built = build_field_table(obj.state_fields());
    debug!(
        type_name = obj.type_name(),
        attributes = built.len(),
        "built state metadata table"
    );
    let mut map = tables.write().expect("lock poisoned");
    Arc::clone(map.entry(id).or_insert_with(|| Arc::new(built)))
}

/// The accessor metadata table for an object's runtime type.
pub(crate) fn accessor_table(obj: &dyn AccessorReflect) -> Arc<MethodTable> {
    let tables = ACCESSOR_TABLES.get_or_init(|| RwLock::new(HashMap::new()));
    let id = obj.as_any().type_id();
    if let Some(table) = tables.read().expect("lock poisoned").get(&id) {
        return Arc::clone(table);
    }
    let built = build_method_table(obj.accessor_methods());
    debug!(
        type_name = obj.type_name(),
        attributes = built.len(),
        "built accessor metadata table"
    );
    let mut map = tables.write().expect("lock poisoned");
    Arc::clone(map.entry(id).or_insert_with(|| Arc::new(built)))
}

fn build_field_table(fields: &'static [FieldSpec]) -> FieldTable {
    let mut table = FieldTable::new();
    for spec in fields {
        if !spec.user_declared {
            continue;
        }
        // First registration wins: most-derived entries come first.
        table.entry(spec.name.to_string()).or_insert(spec);
    }
    table
}

fn build_method_table(methods: &'static [MethodSpec]) -> MethodTable {
    let mut table = MethodTable::new();
    for spec in methods {
        if !spec.public || !spec.user_declared {
            continue;
        }
        let Some(attribute) = attribute_name(spec) else {
            continue;
        };
        table.entry(attribute).or_insert(spec);
    }
    table
}

/// The attribute name an accessor maps to, or `None` if the method does not
/// follow the `get*` / `is*` conventions.
fn attribute_name(spec: &MethodSpec) -> Option<String> {
    if spec.method_name == TYPE_NAME_ACCESSOR {
        return None;
    }
    if let Some(rest) = spec.method_name.strip_prefix("is") {
        // `is*` methods are attributes only when boolean-shaped.
        return if spec.returns_bool {
            normalized(rest)
        } else {
            None
        };
    }
    if let Some(rest) = spec.method_name.strip_prefix("get") {
        return normalized(rest);
    }
    None
}

fn normalized(rest: &str) -> Option<String> {
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    if rest.is_empty() {
        return None;
    }
    Some(uncapitalize(rest))
}

/// Lowercase the first character. Operates on whole `char`s, so names
/// starting with multi-byte or case-expanding characters stay intact.
fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
