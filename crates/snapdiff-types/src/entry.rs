//! Diff entries: one attribute found to differ between two snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One differing attribute.
///
/// Built fresh per comparison and never mutated after return; it has no
/// identity beyond structural equality of its fields. The type descriptors
/// are independently nullable because an attribute may exist on only one
/// side of the comparison. For whole-value (scalar) comparisons the entry
/// describes the pair itself, named after the value kind rather than a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Attribute name, or the value kind name for a whole-value entry.
    pub name: String,
    /// Declared type on the first side, if the attribute exists there.
    pub first_type: Option<String>,
    /// Declared type on the second side, if the attribute exists there.
    pub second_type: Option<String>,
    /// The first side's value (`Value::Null` when absent).
    pub first_value: Value,
    /// The second side's value (`Value::Null` when absent).
    pub second_value: Value,
}

impl DiffEntry {
    /// Create an entry with per-side type descriptors.
    pub fn new(
        name: impl Into<String>,
        first_type: Option<String>,
        second_type: Option<String>,
        first_value: Value,
        second_value: Value,
    ) -> Self {
        Self {
            name: name.into(),
            first_type,
            second_type,
            first_value,
            second_value,
        }
    }

    /// Create an entry for a whole-value comparison: one type on both sides.
    pub fn whole_value(
        name: impl Into<String>,
        type_name: impl Into<String>,
        first_value: Value,
        second_value: Value,
    ) -> Self {
        let type_name = type_name.into();
        Self {
            name: name.into(),
            first_type: Some(type_name.clone()),
            second_type: Some(type_name),
            first_value,
            second_value,
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.name, self.first_value, self.second_value)
    }
}
