//! The `PackageIndex` contract (spec.md §4.1 / §6).

use crate::error::IndexError;
use crate::package::Package;
use crate::store::data::DataStore;
use std::sync::Arc;

/// An index of packages available in a distribution repository.
///
/// Implementations must cache their results within one lifetime: two calls
/// with the same `(suite, section, arch)` triple return the same set of
/// packages. `release()` is the only way to drop that cache.
pub trait PackageIndex: Send + Sync {
    /// Returns the package set for a `(suite, section, arch)` triple.
    ///
    /// `with_long_descs = false` is a performance hint permitting
    /// implementations to omit description text (used by cleanup, which only
    /// needs pkids).
    fn packages_for(
        &self,
        suite: &str,
        section: &str,
        arch: &str,
        with_long_descs: bool,
    ) -> Result<Vec<Arc<dyn Package>>, IndexError>;

    /// Resolves a single file path to its package representation, if the
    /// backend supports targeted single-file processing.
    fn package_for_file(
        &self,
        path: &str,
        suite: Option<&str>,
        section: Option<&str>,
    ) -> Result<Option<Arc<dyn Package>>, IndexError> {
        let _ = (path, suite, section);
        Err(IndexError::Unsupported)
    }

    /// Returns `true` if the upstream index has changed since the last
    /// generator run for this triple. Must be stable for the lifetime of
    /// this index instance; implementations may persist mtimes/digests via
    /// `DataStore::{get,set}_repo_info`.
    fn has_changes(&self, dstore: &DataStore, suite: &str, section: &str, arch: &str) -> bool;

    /// Drops cached package sets to bound memory use.
    fn release(&self);

    /// Installation prefix assumed when inspecting package contents.
    fn data_prefix(&self) -> &str {
        "/usr"
    }
}
