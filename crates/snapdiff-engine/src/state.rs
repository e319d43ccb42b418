//! State-based comparison: attributes discovered from an object's held
//! state, private fields included.

use std::collections::{BTreeMap, BTreeSet};

use snapdiff_types::{DiffEntry, Value};
use tracing::trace;

use crate::cache;
use crate::comparator::Comparator;
use crate::error::{DiffError, DiffResult};
use crate::policy::{self, ComparePolicy};
use crate::reflect::StateReflect;

/// Compares two objects by their declared state slots.
///
/// Attribute metadata comes from [`StateReflect::state_fields`] and is cached
/// per runtime type. Comparing the same instance short-circuits to an empty
/// diff without any attribute access.
#[derive(Clone, Debug, Default)]
pub struct StateComparator {
    policy: ComparePolicy,
}

impl StateComparator {
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

fn same_instance(first: &dyn StateReflect, second: &dyn StateReflect) -> bool {
    // An object and a field at its first offset share a data pointer, so
    // address equality alone is not identity: the runtime types must match
    // too. Two zero-sized instances of one type can still collide, but they
    // carry no state to differ on. Vtable pointers may legitimately differ
    // for one instance, so only data pointers are compared.
    first.as_any().type_id() == second.as_any().type_id()
        && std::ptr::eq(
            first as *const dyn StateReflect as *const (),
            second as *const dyn StateReflect as *const (),
        )
}

/// The whole value of one side: its scalar form, or its state captured
/// attribute by attribute as a map.
fn whole_value(obj: &dyn StateReflect, scalar: Option<Value>) -> DiffResult<Value> {
    if let Some(value) = scalar {
        return Ok(value);
    }
    let table = cache::state_table(obj);
    let mut entries = BTreeMap::new();
    for (name, spec) in table.iter() {
        let value = (spec.get)(obj.as_any()).ok_or_else(|| DiffError::FieldRead {
            name: name.clone(),
        })?;
        entries.insert(name.clone(), value);
    }
    Ok(Value::Map(entries))
}

impl Comparator for StateComparator {
    type Subject = dyn StateReflect;

    fn diff_fields(
        &self,
        first: Option<&dyn StateReflect>,
        second: Option<&dyn StateReflect>,
    ) -> DiffResult<Vec<DiffEntry>> {
        match (first, second) {
            (None, None) => return Ok(Vec::new()),
            (Some(a), Some(b)) if same_instance(a, b) => return Ok(Vec::new()),
            _ => {}
        }

        let first_scalar = first.and_then(StateReflect::as_scalar);
        let second_scalar = second.and_then(StateReflect::as_scalar);
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

        let first_table = first.map(cache::state_table);
        let second_table = second.map(cache::state_table);
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
            let first_slot = first_table.as_ref().and_then(|table| table.get(name));
            let second_slot = second_table.as_ref().and_then(|table| table.get(name));

            let (first_value, first_type) = match (first_slot, first) {
                (Some(spec), Some(obj)) => {
                    let value =
                        (spec.get)(obj.as_any()).ok_or_else(|| DiffError::FieldRead {
                            name: name.to_string(),
                        })?;
                    (value, Some(spec.type_name.to_string()))
                }
                _ => (Value::Null, None),
            };
            let (second_value, second_type) = match (second_slot, second) {
                (Some(spec), Some(obj)) => {
                    let value =
                        (spec.get)(obj.as_any()).ok_or_else(|| DiffError::FieldRead {
                            name: name.to_string(),
                        })?;
                    (value, Some(spec.type_name.to_string()))
                }
                _ => (Value::Null, None),
            };

            let entry = DiffEntry::new(name, first_type, second_type, first_value, second_value);
            if !self.policy.is_entry_equal(&entry) {
                diffs.push(entry);
            }
        }
        trace!(diffs = diffs.len(), "state comparison complete");
        Ok(diffs)
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use proptest::prelude::*;

    use crate::reflect::FieldSpec;

    use super::*;

    struct Account {
        id: u64,
        name: String,
        active: bool,
        tags: Vec<String>,
    }

    impl StateReflect for Account {
        fn type_name(&self) -> &'static str {
            "Account"
        }

        fn state_fields(&self) -> &'static [FieldSpec] {
            static FIELDS: [FieldSpec; 4] = [
                FieldSpec::new("id", "u64", |obj: &dyn Any| {
                    obj.downcast_ref::<Account>().map(|a| Value::from(a.id))
                }),
                FieldSpec::new("name", "String", |obj: &dyn Any| {
                    obj.downcast_ref::<Account>()
                        .map(|a| Value::from(a.name.clone()))
                }),
                FieldSpec::new("active", "bool", |obj: &dyn Any| {
                    obj.downcast_ref::<Account>().map(|a| Value::from(a.active))
                }),
                FieldSpec::new("tags", "Vec<String>", |obj: &dyn Any| {
                    obj.downcast_ref::<Account>()
                        .map(|a| Value::from(a.tags.clone()))
                }),
            ];
            &FIELDS
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn account() -> Account {
        Account {
            id: 1,
            name: "ada".to_string(),
            active: true,
            tags: vec!["admin".to_string()],
        }
    }

    #[test]
    fn same_instance_is_equal_without_attribute_access() {
        struct Unreadable;

        impl StateReflect for Unreadable {
            fn type_name(&self) -> &'static str {
                "Unreadable"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                // Any attribute access would fail.
                static FIELDS: [FieldSpec; 1] = [FieldSpec::new("broken", "()", |_| None)];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let obj = Unreadable;
        let cmp = StateComparator::new();
        assert!(cmp.is_equal(Some(&obj), Some(&obj)).unwrap());
    }

    #[test]
    fn both_absent_is_equal() {
        let cmp = StateComparator::new();
        assert!(cmp.is_equal(None, None).unwrap());
    }

    #[test]
    fn overlapping_distinct_objects_are_not_identical() {
        struct Inner {
            n: i64,
        }

        impl StateReflect for Inner {
            fn type_name(&self) -> &'static str {
                "Inner"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                static FIELDS: [FieldSpec; 1] = [FieldSpec::new("n", "i64", |obj: &dyn Any| {
                    obj.downcast_ref::<Inner>().map(|i| Value::from(i.n))
                })];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        // Inner sits at offset zero, so outer and outer.inner share an
        // address while being different objects.
        #[repr(C)]
        struct Outer {
            inner: Inner,
            label: String,
        }

        impl StateReflect for Outer {
            fn type_name(&self) -> &'static str {
                "Outer"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                static FIELDS: [FieldSpec; 1] =
                    [FieldSpec::new("label", "String", |obj: &dyn Any| {
                        obj.downcast_ref::<Outer>()
                            .map(|o| Value::from(o.label.clone()))
                    })];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let outer = Outer {
            inner: Inner { n: 7 },
            label: "x".to_string(),
        };

        let cmp = StateComparator::with_mode(false);
        let diff = cmp.diff_fields(Some(&outer), Some(&outer.inner)).unwrap();
        let names: Vec<&str> = diff.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["label", "n"]);
        assert_eq!(diff[0].first_value, Value::from("x"));
        assert_eq!(diff[0].second_type, None);
    }

    #[test]
    fn scalar_pair_reports_one_whole_value_entry() {
        let cmp = StateComparator::new();

        let diff = cmp.diff_fields(Some(&1i32), Some(&2i32)).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].name, "Integer");
        assert_eq!(diff[0].first_value, Value::Int(1));
        assert_eq!(diff[0].second_value, Value::Int(2));
        assert!(!cmp.is_equal(Some(&1i32), Some(&2i32)).unwrap());

        let one = 1i32;
        let other = 1i32;
        assert!(cmp.is_equal(Some(&one), Some(&other)).unwrap());
    }

    #[test]
    fn string_pair_reports_one_whole_value_entry() {
        let cmp = StateComparator::new();
        let first = "1".to_string();
        let second = "12".to_string();

        let diff = cmp.diff_fields(Some(&first), Some(&second)).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].name, "String");
        assert_eq!(diff[0].first_value, Value::from("1"));
        assert_eq!(diff[0].second_value, Value::from("12"));

        let same = "1".to_string();
        assert!(cmp.is_equal(Some(&first), Some(&same)).unwrap());
    }

    #[test]
    fn scalar_against_complex_keeps_both_values() {
        let cmp = StateComparator::new();
        let first = 1i32;
        let second = account();

        let diff = cmp.diff_fields(Some(&first), Some(&second)).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].name, "Integer");
        assert_eq!(diff[0].first_value, Value::Int(1));
        assert_eq!(diff[0].second_type.as_deref(), Some("Account"));
        match &diff[0].second_value {
            Value::Map(entries) => assert_eq!(entries["name"], Value::from("ada")),
            other => panic!("expected Map, got {other:?}"),
        }
    }

    #[test]
    fn differing_attributes_are_listed_in_name_order() {
        let first = account();
        let second = Account {
            id: 2,
            name: "bob".to_string(),
            active: true,
            tags: vec!["admin".to_string()],
        };

        let cmp = StateComparator::new();
        let diff = cmp.diff_fields(Some(&first), Some(&second)).unwrap();
        let names: Vec<&str> = diff.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["id", "name"]);
        assert_eq!(diff[0].first_value, Value::Int(1));
        assert_eq!(diff[0].second_value, Value::Int(2));
        assert_eq!(diff[0].first_type.as_deref(), Some("u64"));
    }

    #[test]
    fn excluded_attribute_never_differs() {
        let first = account();
        let second = Account {
            id: 2,
            ..account()
        };

        let cmp = StateComparator::with_filters(["id"], ["id"]);
        assert!(cmp.is_equal(Some(&first), Some(&second)).unwrap());
    }

    #[test]
    fn include_filter_restricts_comparison() {
        let first = account();
        let second = Account {
            id: 2,
            name: "bob".to_string(),
            ..account()
        };

        let cmp = StateComparator::with_filters(["name"], Vec::<String>::new());
        let diff = cmp.diff_fields(Some(&first), Some(&second)).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].name, "name");
    }

    #[test]
    fn absent_side_compares_against_every_attribute() {
        let first = account();
        let cmp = StateComparator::new();

        let diff = cmp.diff_fields(Some(&first), None).unwrap();
        assert_eq!(diff.len(), 4);
        assert!(diff.iter().all(|e| e.second_type.is_none()));
        assert!(diff.iter().all(|e| e.second_value.is_null()));
    }

    #[test]
    fn read_failure_aborts_with_the_attribute_name() {
        struct Broken;

        impl StateReflect for Broken {
            fn type_name(&self) -> &'static str {
                "Broken"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                static FIELDS: [FieldSpec; 1] = [FieldSpec::new("oops", "i64", |_| None)];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let first = Broken;
        let second = Broken;
        let cmp = StateComparator::new();
        match cmp.diff_fields(Some(&first), Some(&second)) {
            Err(DiffError::FieldRead { name }) => assert_eq!(name, "oops"),
            other => panic!("expected FieldRead error, got {other:?}"),
        }
    }

    mod attribute_sets {
        use super::*;

        struct WithAb {
            a: i64,
            b: i64,
        }

        impl StateReflect for WithAb {
            fn type_name(&self) -> &'static str {
                "WithAb"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                static FIELDS: [FieldSpec; 2] = [
                    FieldSpec::new("a", "i64", |obj: &dyn Any| {
                        obj.downcast_ref::<WithAb>().map(|v| Value::from(v.a))
                    }),
                    FieldSpec::new("b", "i64", |obj: &dyn Any| {
                        obj.downcast_ref::<WithAb>().map(|v| Value::from(v.b))
                    }),
                ];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        struct WithBc {
            b: i64,
            c: i64,
        }

        impl StateReflect for WithBc {
            fn type_name(&self) -> &'static str {
                "WithBc"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                static FIELDS: [FieldSpec; 2] = [
                    FieldSpec::new("b", "i64", |obj: &dyn Any| {
                        obj.downcast_ref::<WithBc>().map(|v| Value::from(v.b))
                    }),
                    FieldSpec::new("c", "i64", |obj: &dyn Any| {
                        obj.downcast_ref::<WithBc>().map(|v| Value::from(v.c))
                    }),
                ];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        #[test]
        fn intersection_compares_shared_attributes_only() {
            let first = WithAb { a: 1, b: 2 };
            let second = WithBc { b: 3, c: 4 };

            let cmp = StateComparator::new();
            let diff = cmp.diff_fields(Some(&first), Some(&second)).unwrap();
            assert_eq!(diff.len(), 1);
            assert_eq!(diff[0].name, "b");
            assert_eq!(diff[0].first_value, Value::Int(2));
            assert_eq!(diff[0].second_value, Value::Int(3));
        }

        #[test]
        fn union_treats_missing_sides_as_absent() {
            let first = WithAb { a: 1, b: 2 };
            let second = WithBc { b: 2, c: 4 };

            let cmp = StateComparator::with_mode(false);
            let diff = cmp.diff_fields(Some(&first), Some(&second)).unwrap();
            let names: Vec<&str> = diff.iter().map(|e| e.name.as_str()).collect();
            // b is equal on both sides; a and c exist on one side each.
            assert_eq!(names, ["a", "c"]);
            assert_eq!(diff[0].second_value, Value::Null);
            assert_eq!(diff[0].second_type, None);
            assert_eq!(diff[1].first_value, Value::Null);
        }
    }

    mod collections {
        use super::*;

        struct VecHolder {
            items: Vec<i64>,
        }

        impl StateReflect for VecHolder {
            fn type_name(&self) -> &'static str {
                "VecHolder"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                static FIELDS: [FieldSpec; 1] = [FieldSpec::new(
                    "items",
                    "Vec<i64>",
                    |obj: &dyn Any| {
                        obj.downcast_ref::<VecHolder>()
                            .map(|v| Value::from(v.items.clone()))
                    },
                )];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        struct ArrayHolder {
            items: [i64; 3],
        }

        impl StateReflect for ArrayHolder {
            fn type_name(&self) -> &'static str {
                "ArrayHolder"
            }

            fn state_fields(&self) -> &'static [FieldSpec] {
                static FIELDS: [FieldSpec; 1] = [FieldSpec::new(
                    "items",
                    "[i64; 3]",
                    |obj: &dyn Any| {
                        obj.downcast_ref::<ArrayHolder>()
                            .map(|v| Value::from(v.items))
                    },
                )];
                &FIELDS
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        #[test]
        fn equal_elements_across_container_kinds_are_equal() {
            let first = VecHolder {
                items: vec![1, 2, 3],
            };
            let second = ArrayHolder { items: [1, 2, 3] };

            let cmp = StateComparator::new();
            assert!(cmp.is_equal(Some(&first), Some(&second)).unwrap());
        }

        #[test]
        fn differing_elements_are_reported_once() {
            let first = VecHolder {
                items: vec![1, 2, 3],
            };
            let second = ArrayHolder { items: [1, 2, 4] };

            let cmp = StateComparator::new();
            let diff = cmp.diff_fields(Some(&first), Some(&second)).unwrap();
            assert_eq!(diff.len(), 1);
            assert_eq!(diff[0].name, "items");
        }
    }

    proptest! {
        #[test]
        fn identity_implies_equality(x in any::<i64>()) {
            let cmp = StateComparator::new();
            prop_assert!(cmp.is_equal(Some(&x), Some(&x)).unwrap());
        }

        #[test]
        fn equal_scalars_by_value_have_empty_diff(x in any::<i64>()) {
            let copy = x;
            let cmp = StateComparator::new();
            prop_assert!(cmp.is_equal(Some(&x), Some(&copy)).unwrap());
        }

        #[test]
        fn distinct_scalars_produce_one_integer_entry(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            let cmp = StateComparator::new();
            let diff = cmp.diff_fields(Some(&a), Some(&b)).unwrap();
            prop_assert_eq!(diff.len(), 1);
            prop_assert_eq!(diff[0].name.as_str(), "Integer");
            prop_assert_eq!(&diff[0].first_value, &Value::Int(a));
            prop_assert_eq!(&diff[0].second_value, &Value::Int(b));
        }
    }
}
