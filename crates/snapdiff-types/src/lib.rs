//! Foundation types for SnapDiff.
//!
//! Everything an attribute comparison produces or consumes lives here:
//!
//! - [`Value`] -- Owned, deeply comparable representation of an attribute value
//! - [`DiffEntry`] -- One attribute found to differ between two snapshots

pub mod entry;
pub mod value;

pub use entry::DiffEntry;
pub use value::Value;
