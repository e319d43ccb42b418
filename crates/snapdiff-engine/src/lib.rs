//! Introspective diff engine for entity snapshots.
//!
//! Computes which attributes differ between two objects without the objects
//! implementing any comparison contract themselves. Types opt in by
//! supplying attribute metadata through one of two capability traits, and a
//! comparator walks the resulting per-type table (cached process-wide) to
//! produce an ordered list of differing attributes.
//!
//! # Key Types
//!
//! - [`Comparator`] -- The two-operation contract: `is_equal` / `diff_fields`
//! - [`StateComparator`] / [`StateReflect`] -- Attributes from held state,
//!   private fields included
//! - [`AccessorComparator`] / [`AccessorReflect`] -- Attributes from public
//!   zero-argument `get*` / `is*` methods
//! - [`ComparePolicy`] -- Include/exclude filters and intersection vs union
//!   attribute-set selection
//! - [`DiffEntry`] / [`Value`] -- One differing attribute and its captured
//!   values (re-exported from `snapdiff-types`)
//!
//! Scalars (booleans, characters, numbers, strings) short-circuit: comparing
//! `1` and `2` yields a single entry named `"Integer"` holding both values.

pub mod accessor;
mod cache;
pub mod comparator;
pub mod error;
pub mod policy;
pub mod reflect;
pub mod state;

pub use accessor::AccessorComparator;
pub use comparator::Comparator;
pub use error::{DiffError, DiffResult};
pub use policy::{nullable_equals, ComparePolicy};
pub use reflect::{AccessorReflect, FieldSpec, MethodSpec, StateReflect};
pub use snapdiff_types::{DiffEntry, Value};
pub use state::StateComparator;
