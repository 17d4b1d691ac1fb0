//! A fixed, no-archive-I/O backend used to exercise the engine end-to-end
//! without a real distribution repository.
//!
//! Grounded on `original_source/src/backends/dummy/{dummypkg,pkgindex}.cpp`:
//! a single invented package with fixed contents, and an index that always
//! reports exactly that one package and always claims to have changed.

use crate::error::IndexError;
use crate::index::PackageIndex;
use crate::package::Package;
use crate::store::data::DataStore;
use std::collections::HashMap;
use std::sync::Arc;

pub struct DummyPackage {
    name: String,
    version: String,
    arch: String,
    description: HashMap<String, String>,
    contents: Vec<String>,
}

impl DummyPackage {
    pub fn new(name: &str, version: &str, arch: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            arch: arch.to_string(),
            description: HashMap::new(),
            contents: vec!["NOTHING1".to_string(), "NOTHING2".to_string()],
        }
    }
}

impl Package for DummyPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn arch(&self) -> &str {
        &self.arch
    }

    fn maintainer(&self) -> &str {
        "Someone <someone@example.com>"
    }

    fn description(&self) -> &HashMap<String, String> {
        &self.description
    }

    fn filename(&self) -> &str {
        "/dev/null"
    }

    fn contents(&self) -> &[String] {
        &self.contents
    }

    fn get_file_data(&self, fname: &str) -> Vec<u8> {
        if fname == "TEST" {
            b"NOTHING".to_vec()
        } else {
            Vec::new()
        }
    }

    fn finish(&self) {}
}

/// An index that always returns one [`DummyPackage`] for every triple and
/// always claims the repository has changed.
#[derive(Default)]
pub struct DummyPackageIndex;

impl DummyPackageIndex {
    pub fn new() -> Self {
        Self
    }
}

impl PackageIndex for DummyPackageIndex {
    fn packages_for(
        &self,
        _suite: &str,
        _section: &str,
        arch: &str,
        _with_long_descs: bool,
    ) -> Result<Vec<Arc<dyn Package>>, IndexError> {
        let pkg: Arc<dyn Package> = Arc::new(DummyPackage::new("test", "1.0", arch));
        Ok(vec![pkg])
    }

    fn has_changes(&self, _dstore: &DataStore, _suite: &str, _section: &str, _arch: &str) -> bool {
        true
    }

    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_package_has_fixed_contents() {
        let pkg = DummyPackage::new("test", "1.0", "amd64");
        assert_eq!(pkg.contents(), &["NOTHING1".to_string(), "NOTHING2".to_string()][..]);
    }

    #[test]
    fn dummy_package_returns_fixed_test_file() {
        let pkg = DummyPackage::new("test", "1.0", "amd64");
        assert_eq!(pkg.get_file_data("TEST"), b"NOTHING".to_vec());
        assert!(pkg.get_file_data("OTHER").is_empty());
    }

    #[test]
    fn dummy_index_always_returns_one_package() {
        let index = DummyPackageIndex::new();
        let pkgs = index.packages_for("sid", "main", "amd64", true).unwrap();
        assert_eq!(pkgs.len(), 1);
        assert_eq!(pkgs[0].id(), "test/1.0/amd64");
    }

    #[test]
    fn dummy_index_always_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let dstore = DataStore::open(dir.path().join("data.json"), dir.path().join("media")).unwrap();
        let index = DummyPackageIndex::new();
        assert!(index.has_changes(&dstore, "sid", "main", "amd64"));
        assert!(index.has_changes(&dstore, "sid", "main", "amd64"));
    }
}
