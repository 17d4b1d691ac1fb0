//! The seed phase: populate `ContentsStore` from package file listings and
//! classify each package as interesting/ignored (spec.md §4.4).
//!
//! Grounded on `original_source/src/engine.cpp` `Engine::seedContentsData`
//! and the free function `packageIsInteresting`.

use super::Engine;
use crate::error::EngineError;
use crate::package::Package;
use crate::suite::Suite;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const INTERESTING_PREFIXES: [&str; 4] = [
    "/usr/share/applications/",
    "/usr/share/metainfo/",
    "/usr/local/share/applications/",
    "/usr/local/share/metainfo/",
];

/// A package is interesting if any of its payload paths sit under an
/// applications/metainfo directory, or it advertises a non-empty GStreamer
/// codec capability (spec.md §4.4 step 4, §8 properties 6/boundary cases).
///
/// Monotone by construction: adding a path or a non-empty `gst` can only
/// flip a `false` result to `true`, never the reverse (spec.md §8 property
/// 6).
pub fn package_is_interesting(pkg: &dyn Package) -> bool {
    let has_interesting_path = pkg
        .contents()
        .iter()
        .any(|path| INTERESTING_PREFIXES.iter().any(|prefix| path.starts_with(prefix)));
    if has_interesting_path {
        return true;
    }
    pkg.gst().map(|g| g.is_not_empty()).unwrap_or(false)
}

/// Paths worth tracking as "icon files" separately from the rest of a
/// package's contents: anything under a `.../icons/...` theme directory,
/// matching the fixed layout `DataInjectPackage` also writes to.
fn icon_paths(contents: &[String]) -> Vec<String> {
    contents.iter().filter(|p| p.contains("/icons/")).cloned().collect()
}

/// Work-unit size for the seed phase's chunked parallel scan: `min(30,
/// processors * 2)` (spec.md §4.4 "Concurrency discipline").
fn seed_work_unit_size(processors: usize) -> usize {
    (processors * 2).min(30).max(1)
}

impl Engine {
    /// Scans `pkgs` (or, if empty, everything `packages_for` returns for
    /// this triple) into the contents store, marking uninteresting packages
    /// ignored in the data store. Returns whether anything interesting was
    /// found (spec.md §4.4).
    pub fn seed_contents_data(
        &self,
        suite: &Suite,
        section: &str,
        arch: &str,
        pkgs: &[Arc<dyn Package>],
    ) -> Result<bool, EngineError> {
        if pkgs.is_empty() && !self.pkg_index.has_changes(&self.dstore, &suite.name, section, arch) && !self.forced()
        {
            return Ok(false);
        }

        let targets: Vec<Arc<dyn Package>> = if !pkgs.is_empty() {
            pkgs.to_vec()
        } else {
            self.pkg_index.packages_for(&suite.name, section, arch, true)?
        };

        let work_unit_size = seed_work_unit_size(self.pool.current_num_threads());
        let interesting_found = AtomicBool::new(false);

        if let Some(base_suite) = &suite.base_suite {
            let base_pkgs = self.pkg_index.packages_for(base_suite, section, arch, true)?;
            self.pool.install(|| {
                base_pkgs.par_chunks(work_unit_size).for_each(|chunk| {
                    for pkg in chunk {
                        let pkid = pkg.id();
                        if !self.cstore.package_exists(&pkid) {
                            let contents = pkg.contents().to_vec();
                            let icons = icon_paths(&contents);
                            self.cstore.set_contents(&pkid, contents, icons);
                        }
                        pkg.cleanup_temp();
                    }
                });
            });
        }

        self.pool.install(|| {
            targets.par_chunks(work_unit_size).for_each(|chunk| {
                for pkg in chunk {
                    let pkid = pkg.id();

                    if self.cstore.package_exists(&pkid) {
                        if self.dstore.package_exists(&pkid) {
                            if !self.dstore.is_ignored(&pkid) {
                                interesting_found.store(true, Ordering::Relaxed);
                            }
                            continue;
                        }
                    } else {
                        let contents = pkg.contents().to_vec();
                        let icons = icon_paths(&contents);
                        self.cstore.set_contents(&pkid, contents, icons);
                    }

                    if package_is_interesting(pkg.as_ref()) {
                        interesting_found.store(true, Ordering::Relaxed);
                    } else {
                        self.dstore.set_package_ignore(&pkid);
                        pkg.finish();
                    }
                }
            });
        });

        self.cstore.sync()?;
        Ok(interesting_found.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::dummy::{DummyPackage, DummyPackageIndex};
    use crate::engine::Engine;
    use crate::report::NoopReportGenerator;
    use crate::result::NullExtractor;
    use crate::suite::Config;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct FixedContentsPackage {
        name: String,
        version: String,
        arch: String,
        contents: Vec<String>,
    }

    impl Package for FixedContentsPackage {
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
            ""
        }
        fn description(&self) -> &HashMap<String, String> {
            static EMPTY: once_cell::sync::Lazy<HashMap<String, String>> =
                once_cell::sync::Lazy::new(HashMap::new);
            &EMPTY
        }
        fn filename(&self) -> &str {
            ""
        }
        fn contents(&self) -> &[String] {
            &self.contents
        }
        fn get_file_data(&self, _fname: &str) -> Vec<u8> {
            Vec::new()
        }
        fn finish(&self) {}
    }

    #[test]
    fn package_with_only_doc_paths_is_not_interesting() {
        let pkg = FixedContentsPackage {
            name: "foo".into(),
            version: "1.0".into(),
            arch: "amd64".into(),
            contents: vec!["/usr/share/doc/foo/changelog.gz".into()],
        };
        assert!(!package_is_interesting(&pkg));
    }

    #[test]
    fn package_with_desktop_entry_is_interesting() {
        let pkg = FixedContentsPackage {
            name: "foo".into(),
            version: "1.0".into(),
            arch: "amd64".into(),
            contents: vec!["/usr/share/applications/foo.desktop".into()],
        };
        assert!(package_is_interesting(&pkg));
    }

    #[test]
    fn package_with_metainfo_is_interesting() {
        let pkg = FixedContentsPackage {
            name: "foo".into(),
            version: "1.0".into(),
            arch: "amd64".into(),
            contents: vec!["/usr/share/metainfo/foo.appdata.xml".into()],
        };
        assert!(package_is_interesting(&pkg));
    }

    #[test]
    fn package_with_nonempty_gst_is_interesting_regardless_of_paths() {
        struct GstPackage;
        impl Package for GstPackage {
            fn name(&self) -> &str {
                "gst-plugin"
            }
            fn version(&self) -> &str {
                "1.0"
            }
            fn arch(&self) -> &str {
                "amd64"
            }
            fn maintainer(&self) -> &str {
                ""
            }
            fn description(&self) -> &HashMap<String, String> {
                static EMPTY: once_cell::sync::Lazy<HashMap<String, String>> =
                    once_cell::sync::Lazy::new(HashMap::new);
                &EMPTY
            }
            fn filename(&self) -> &str {
                ""
            }
            fn contents(&self) -> &[String] {
                &[]
            }
            fn get_file_data(&self, _fname: &str) -> Vec<u8> {
                Vec::new()
            }
            fn finish(&self) {}
            fn gst(&self) -> Option<crate::package::GStreamer> {
                Some(crate::package::GStreamer {
                    decoders: vec!["vorbisdec".into()],
                    ..Default::default()
                })
            }
        }
        assert!(package_is_interesting(&GstPackage));
    }

    fn test_engine(workspace: &std::path::Path) -> Engine {
        let config = Config::new("asgen", workspace);
        Engine::new(
            config,
            Arc::new(DummyPackageIndex::new()),
            Arc::new(NullExtractor),
            Arc::new(NoopReportGenerator),
        )
        .unwrap()
    }

    #[test]
    fn empty_pkgs_unchanged_index_not_forced_skips_without_io() {
        // DummyPackageIndex::has_changes always returns true, so this
        // boundary is exercised through a package index stub instead.
        struct NeverChangedIndex;
        impl crate::index::PackageIndex for NeverChangedIndex {
            fn packages_for(
                &self,
                _suite: &str,
                _section: &str,
                _arch: &str,
                _with_long_descs: bool,
            ) -> Result<Vec<Arc<dyn Package>>, crate::error::IndexError> {
                panic!("packages_for must not be called when nothing changed");
            }
            fn has_changes(
                &self,
                _dstore: &crate::store::DataStore,
                _suite: &str,
                _section: &str,
                _arch: &str,
            ) -> bool {
                false
            }
            fn release(&self) {}
        }

        let dir = tempdir().unwrap();
        let config = Config::new("asgen", dir.path());
        let engine = Engine::new(
            config,
            Arc::new(NeverChangedIndex),
            Arc::new(NullExtractor),
            Arc::new(NoopReportGenerator),
        )
        .unwrap();

        let suite = Suite::new("testing");
        let found = engine.seed_contents_data(&suite, "main", "amd64", &[]).unwrap();
        assert!(!found);
    }

    #[test]
    fn dummy_backend_has_no_interesting_paths_first_run() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let suite = Suite::new("testing");
        let found = engine.seed_contents_data(&suite, "main", "amd64", &[]).unwrap();
        assert!(!found);
        assert!(engine.data_store().is_ignored("test/1.0/amd64"));
        assert!(engine.contents_store().package_exists("test/1.0/amd64"));
    }

    #[test]
    fn package_with_interesting_path_is_flagged_and_not_ignored() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let suite = Suite::new("testing");
        let pkg: Arc<dyn Package> = Arc::new(FixedContentsPackage {
            name: "test".into(),
            version: "1.0".into(),
            arch: "amd64".into(),
            contents: vec!["/usr/share/applications/foo.desktop".into()],
        });
        let found = engine.seed_contents_data(&suite, "main", "amd64", &[pkg]).unwrap();
        assert!(found);
        assert!(!engine.data_store().is_ignored("test/1.0/amd64"));
    }
}
