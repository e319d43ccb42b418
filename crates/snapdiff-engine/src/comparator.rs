//! The comparator contract shared by both strategies.

use snapdiff_types::DiffEntry;

use crate::error::DiffResult;

/// A comparison strategy over some reflectable subject.
///
/// Both operations are pure with respect to their inputs; the only observable
/// side effect is population of the per-type metadata cache. Either the full
/// diff list is produced or the call fails outright -- there is no partial
/// result.
pub trait Comparator {
    /// The reflectable object kind this strategy compares.
    type Subject: ?Sized;

    /// The differing attributes between two snapshots, in name order.
    ///
    /// `None` stands for an absent object; an attribute present on only one
    /// side is reported with a `None` type and a null value on the other.
    fn diff_fields(
        &self,
        first: Option<&Self::Subject>,
        second: Option<&Self::Subject>,
    ) -> DiffResult<Vec<DiffEntry>>;

    /// `true` iff [`diff_fields`](Comparator::diff_fields) is empty.
    fn is_equal(
        &self,
        first: Option<&Self::Subject>,
        second: Option<&Self::Subject>,
    ) -> DiffResult<bool> {
        Ok(self.diff_fields(first, second)?.is_empty())
    }
}
