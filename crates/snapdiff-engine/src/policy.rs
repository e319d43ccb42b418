//! The shared comparison policy: attribute filtering, intersection/union
//! name-set selection, and nullable-aware equality.

use std::collections::{BTreeMap, BTreeSet};

use snapdiff_types::{DiffEntry, Value};

/// Filtering and selection rules shared by both comparator strategies.
///
/// Immutable per comparator instance in normal use. The setters exist for
/// staged configuration and must not be called concurrently with in-flight
/// comparisons.
#[derive(Clone, Debug)]
pub struct ComparePolicy {
    include_fields: BTreeSet<String>,
    exclude_fields: BTreeSet<String>,
    both_exist_only: bool,
}

impl Default for ComparePolicy {
    fn default() -> Self {
        Self {
            include_fields: BTreeSet::new(),
            exclude_fields: BTreeSet::new(),
            both_exist_only: true,
        }
    }
}

impl ComparePolicy {
    /// No filters; compare only attributes present on both sides.
    pub fn new() -> Self {
        Self::default()
    }

    /// No filters; `both_exist_only` picks intersection (`true`) or union
    /// (`false`) of the two attribute sets.
    pub fn with_mode(both_exist_only: bool) -> Self {
        Self {
            both_exist_only,
            ..Self::default()
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
            include_fields: include.into_iter().map(Into::into).collect(),
            exclude_fields: exclude.into_iter().map(Into::into).collect(),
            ..Self::default()
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
            both_exist_only,
            ..Self::with_filters(include, exclude)
        }
    }

    /// Names restricted to, when non-empty.
    pub fn include_fields(&self) -> &BTreeSet<String> {
        &self.include_fields
    }

    /// Names always treated as non-differing.
    pub fn exclude_fields(&self) -> &BTreeSet<String> {
        &self.exclude_fields
    }

    /// Whether only attributes present on both sides are compared.
    pub fn both_exist_only(&self) -> bool {
        self.both_exist_only
    }

    /// Replace the include filter. Not safe against in-flight comparisons.
    pub fn set_include_fields<I>(&mut self, include: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.include_fields = include.into_iter().map(Into::into).collect();
    }

    /// Replace the exclude filter. Not safe against in-flight comparisons.
    pub fn set_exclude_fields<I>(&mut self, exclude: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.exclude_fields = exclude.into_iter().map(Into::into).collect();
    }

    /// Switch between intersection and union attribute-set selection.
    pub fn set_both_exist_only(&mut self, both_exist_only: bool) {
        self.both_exist_only = both_exist_only;
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude_fields.contains(name)
    }

    fn is_included(&self, name: &str) -> bool {
        self.include_fields.is_empty() || self.include_fields.contains(name)
    }

    /// Whether an entry counts as equal under the active filters.
    ///
    /// Exclusion wins over inclusion: an excluded attribute is never
    /// considered different, even if it is also listed as included.
    pub fn is_entry_equal(&self, entry: &DiffEntry) -> bool {
        if self.is_excluded(&entry.name) {
            return true;
        }
        if !self.is_included(&entry.name) {
            return true;
        }
        nullable_equals(&entry.first_value, &entry.second_value)
    }

    /// The comparable attribute names for two present sides: intersection or
    /// union per `both_exist_only`.
    pub(crate) fn select_names<'a, V>(
        &self,
        first: &'a BTreeMap<String, V>,
        second: &'a BTreeMap<String, V>,
    ) -> BTreeSet<&'a str> {
        if self.both_exist_only {
            first
                .keys()
                .filter(|name| second.contains_key(*name))
                .map(String::as_str)
                .collect()
        } else {
            first
                .keys()
                .chain(second.keys())
                .map(String::as_str)
                .collect()
        }
    }
}

/// Deep equality tolerant of absent sides.
///
/// When both values are collection-shaped, their element sequences are
/// compared element-wise with the same rule, so a `Seq` and a `Set` holding
/// equal elements in equal order are equal. Everything else falls back to
/// structural equality, under which `Null` equals only `Null`.
pub fn nullable_equals(first: &Value, second: &Value) -> bool {
    if let (Some(a), Some(b)) = (first.as_elements(), second.as_elements()) {
        return a.len() == b.len() && a.iter().zip(b).all(|(x, y)| nullable_equals(x, y));
    }
    first == second
}

/// Compare two whole values (the simple-value short-circuit).
///
/// Each present side supplies its runtime type name and whole value: its
/// scalar form, or its captured attribute map when it has none. An unequal
/// pair yields one entry named by the scalar's kind. Filters do not apply
/// here.
pub(crate) fn compare_whole_values(
    first: Option<(&'static str, Value)>,
    second: Option<(&'static str, Value)>,
) -> Vec<DiffEntry> {
    let first_type = first.as_ref().map(|(t, _)| t.to_string());
    let second_type = second.as_ref().map(|(t, _)| t.to_string());
    let first_value = first.map(|(_, v)| v).unwrap_or(Value::Null);
    let second_value = second.map(|(_, v)| v).unwrap_or(Value::Null);
    if nullable_equals(&first_value, &second_value) {
        return Vec::new();
    }
    let name = if first_value.is_scalar() {
        first_value.kind_name()
    } else {
        second_value.kind_name()
    };
    vec![DiffEntry::new(
        name,
        first_type,
        second_type,
        first_value,
        second_value,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, first: Value, second: Value) -> DiffEntry {
        DiffEntry::new(name, None, None, first, second)
    }

    #[test]
    fn default_mode_is_intersection() {
        assert!(ComparePolicy::new().both_exist_only());
        assert!(!ComparePolicy::with_mode(false).both_exist_only());
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let policy = ComparePolicy::with_filters(["name"], ["name"]);
        let differing = entry("name", Value::from(1), Value::from(2));
        assert!(policy.is_entry_equal(&differing));
    }

    #[test]
    fn attributes_outside_include_list_are_equal() {
        let policy = ComparePolicy::with_filters(["name"], Vec::<String>::new());
        let differing = entry("age", Value::from(1), Value::from(2));
        assert!(policy.is_entry_equal(&differing));

        let included = entry("name", Value::from(1), Value::from(2));
        assert!(!policy.is_entry_equal(&included));
    }

    #[test]
    fn empty_filters_compare_everything() {
        let policy = ComparePolicy::new();
        assert!(!policy.is_entry_equal(&entry("x", Value::from(1), Value::from(2))));
        assert!(policy.is_entry_equal(&entry("x", Value::from(1), Value::from(1))));
    }

    #[test]
    fn setters_replace_filters() {
        let mut policy = ComparePolicy::new();
        policy.set_exclude_fields(["skip"]);
        assert!(policy.is_entry_equal(&entry("skip", Value::from(1), Value::from(2))));
        policy.set_both_exist_only(false);
        assert!(!policy.both_exist_only());
    }

    #[test]
    fn select_names_intersection_and_union() {
        let first: BTreeMap<String, ()> = [("a", ()), ("b", ())]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let second: BTreeMap<String, ()> = [("b", ()), ("c", ())]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let both = ComparePolicy::new();
        assert_eq!(both.select_names(&first, &second), ["b"].into());

        let either = ComparePolicy::with_mode(false);
        assert_eq!(either.select_names(&first, &second), ["a", "b", "c"].into());
    }

    #[test]
    fn nullable_equals_crosses_collection_kinds() {
        let seq = Value::Seq(vec![Value::Int(1), Value::Int(2)]);
        let set = Value::Set(vec![Value::Int(1), Value::Int(2)]);
        assert!(nullable_equals(&seq, &set));

        let shorter = Value::Set(vec![Value::Int(1)]);
        assert!(!nullable_equals(&seq, &shorter));
    }

    #[test]
    fn nullable_equals_recurses_into_nested_collections() {
        let outer_seq = Value::Seq(vec![Value::Seq(vec![Value::Int(1)])]);
        let outer_set = Value::Seq(vec![Value::Set(vec![Value::Int(1)])]);
        assert!(nullable_equals(&outer_seq, &outer_set));
    }

    #[test]
    fn null_equals_only_null() {
        assert!(nullable_equals(&Value::Null, &Value::Null));
        assert!(!nullable_equals(&Value::Null, &Value::from(0)));
    }

    #[test]
    fn whole_value_comparison_names_the_kind() {
        let diff = compare_whole_values(
            Some(("i32", Value::from(1))),
            Some(("i32", Value::from(2))),
        );
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].name, "Integer");
        assert_eq!(diff[0].first_value, Value::Int(1));
        assert_eq!(diff[0].second_value, Value::Int(2));

        assert!(compare_whole_values(
            Some(("i32", Value::from(1))),
            Some(("i32", Value::from(1))),
        )
        .is_empty());
    }

    #[test]
    fn whole_value_comparison_with_absent_side() {
        let diff = compare_whole_values(Some(("i32", Value::from(1))), None);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].name, "Integer");
        assert_eq!(diff[0].second_type, None);
        assert_eq!(diff[0].second_value, Value::Null);
    }
}
