//! Accessor-based comparison: attributes discovered from public,
//! zero-argument `get*` / `is*` methods.

use std::collections::{BTreeMap, BTreeSet};

use snapdiff_types::{DiffEntry, Value};
use tracing::trace;

use crate::cache;
use crate::comparator::Comparator;
use crate::error::{DiffError, DiffResult};
use crate::policy::{self, ComparePolicy};
use crate::reflect::AccessorReflect;

/// Compares two objects by their public getter surface.
///
/// Attribute metadata comes from [`AccessorReflect::accessor_methods`],
/// filtered by the `get*` / `is*` naming conventions and cached per runtime
/// type.
#[derive(Clone, Debug, Default)]
pub struct AccessorComparator {
    policy: ComparePolicy,
}

impl AccessorComparator {
    /// No filters; compare only attributes present on both sides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose intersection (`true`) or union (`false`) attribute selection.
    pub fn with_mode(both_exist_only: bool) -> Self {
        Self {
            policy: ComparePolicy::with_mode(both_exist_only),
        }
    }

    /// Include and exclude filters; empty means no restriction.
    pub fn with_filters<I, J>(include: I, exclude: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        Self {
            policy: ComparePolicy::with_filters(include, exclude),
        }
    }

    /// Filters and attribute-set mode together.
    pub fn with_config<I, J>(include: I, exclude: J, both_exist_only: bool) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        Self {
            policy: ComparePolicy::with_config(include, exclude, both_exist_only),
        }
    }

    /// The active comparison policy.
    pub fn policy(&self) -> &ComparePolicy {
        &self.policy
    }

    /// Mutable access to the policy. Not safe against in-flight comparisons.
    pub fn policy_mut(&mut self) -> &mut ComparePolicy {
        &mut self.policy
    }
}

/// The whole value of one side: its scalar form, or its attribute surface
/// captured accessor by accessor as a map.
fn whole_value(obj: &dyn AccessorReflect, scalar: Option<Value>) -> DiffResult<Value> {
    if let Some(value) = scalar {
        return Ok(value);
    }
    let table = cache::accessor_table(obj);
    let mut entries = BTreeMap::new();
    for (name, spec) in table.iter() {
        let value = (spec.invoke)(obj.as_any()).ok_or_else(|| DiffError::AccessorInvoke {
            name: name.clone(),
        })?;
        entries.insert(name.clone(), value);
    }
    Ok(Value::Map(entries))
}

impl Comparator for AccessorComparator {
    type Subject = dyn AccessorReflect;

    fn diff_fields(
        &self,
        first: Option<&dyn AccessorReflect>,
        second: Option<&dyn AccessorReflect>,
    ) -> DiffResult<Vec<DiffEntry>> {
        if first.is_none() && second.is_none() {
            return Ok(Vec::new());
        }

        let first_scalar = first.and_then(AccessorReflect::as_scalar);
        let second_scalar = second.and_then(AccessorReflect::as_scalar);
        if first_scalar.is_some() || second_scalar.is_some() {
            let first_whole = match first {
                Some(obj) => Some((obj.type_name(), whole_value(obj, first_scalar)?)),
                None => None,
            };
            let second_whole = match second {
                Some(obj) => Some((obj.type_name(), whole_value(obj, second_scalar)?)),
                None => None,
            };
            return Ok(policy::compare_whole_values(first_whole, second_whole));
        }

        let first_table = first.map(cache::accessor_table);
        let second_table = second.map(cache::accessor_table);
        let names: BTreeSet<&str> = match (&first_table, &second_table) {
            (Some(table), None) | (None, Some(table)) => {
                table.keys().map(String::as_str).collect()
            }
            (Some(first_table), Some(second_table)) => {
                self.policy.select_names(first_table, second_table)
            }
            (None, None) => BTreeSet::new(),
        };

        let mut diffs = Vec::new();
        for name in names {
            let first_method = first_table.as_ref().and_then(|table| table.get(name));
            let second_method = second_table.as_ref().and_then(|table| table.get(name));

            let (first_value, first_type) = match (first_method, first) {
                (Some(spec), Some(obj)) => {
                    let value =
                        (spec.invoke)(obj.as_any()).ok_or_else(|| DiffError::AccessorInvoke {
                            name: name.to_string(),
                        })?;
                    (value, Some(spec.return_type.to_string()))
                }
                _ => (Value::Null, None),
            };
            let (second_value, second_type) = match (second_method, second) {
                (Some(spec), Some(obj)) => {
                    let value =
                        (spec.invoke)(obj.as_any()).ok_or_else(|| DiffError::AccessorInvoke {
                            name: name.to_string(),
                        })?;
                    (value, Some(spec.return_type.to_string()))
                }
                _ => (Value::Null, None),
            };

            let entry = DiffEntry::new(name, first_type, second_type, first_value, second_value);
            if !self.policy.is_entry_equal(&entry) {
                diffs.push(entry);
            }
        }
        trace!(diffs = diffs.len(), "accessor comparison complete");
        Ok(diffs)
    }
}
