//! The process phase: run the (external) component extractor over every
//! not-yet-processed package and persist its `GeneratorResult`, plus the
//! extra-metainfo injection step (spec.md §4.5, §4.6).
//!
//! Grounded on `original_source/src/engine.cpp` `Engine::processPackages`
//! and `Engine::processExtraMetainfoData`.

use super::Engine;
use crate::datainject::DataInjectPackage;
use crate::icons::IconHandler;
use crate::modifications::InjectedModifications;
use crate::package::Package;
use crate::suite::Suite;
use rayon::prelude::*;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Work-unit size for the process phase's chunked parallel scan:
/// `max(10, min(100, total/processors/10))` (spec.md §4.4 "Concurrency
/// discipline" — the same formula the extract phase uses).
fn process_work_unit_size(total: usize, processors: usize) -> usize {
    if processors == 0 || total == 0 {
        return 10;
    }
    (total / processors / 10).clamp(10, 100)
}

impl Engine {
    /// Extracts component data for every package in `pkgs` not already
    /// present in the data store, writing each result back under a
    /// store-write critical section (spec.md §4.5).
    pub fn process_packages(
        &self,
        pkgs: &[Arc<dyn Package>],
        _iconh: &IconHandler,
        _inj_mods: &InjectedModifications,
    ) {
        let work_unit_size = process_work_unit_size(pkgs.len(), self.pool.current_num_threads());
        let write_lock = Mutex::new(());

        debug!(
            count = pkgs.len(),
            work_unit_size, "analyzing packages for metadata extraction"
        );

        self.pool.install(|| {
            pkgs.par_chunks(work_unit_size).for_each(|chunk| {
                for pkg in chunk {
                    let pkid = pkg.id();
                    if self.dstore.package_exists(&pkid) {
                        continue;
                    }

                    let result = self.extractor.extract(pkg.as_ref());

                    {
                        let _guard = write_lock.lock().unwrap();
                        let components_count = result.components_count();
                        let hints_count = result.hints_count();
                        self.dstore.add_generator_result(self.config.data_type, result, false);
                        info!(pkid = %pkid, components_count, hints_count, "processed package");
                    }

                    pkg.finish();
                }
            });
        });
    }

    /// Injects locally-provided metainfo/icons (and component-removal
    /// overlays) as a synthetic package, so downstream export sees them
    /// like any other package (spec.md §4.6).
    ///
    /// Returns `None` if there is nothing to inject: no `extra_metainfo_dir`
    /// configured and no pending removal requests.
    pub fn process_extra_metainfo_data(
        &self,
        suite: &Suite,
        _iconh: &IconHandler,
        section: &str,
        arch: &str,
        inj_mods: &InjectedModifications,
    ) -> Option<Arc<dyn Package>> {
        if suite.extra_metainfo_dir.is_none() && !inj_mods.has_removed_components() {
            return None;
        }

        // `extra_metainfo_dir` may legitimately be unset here: a suite with no
        // local metainfo overlay but pending removal requests still needs the
        // synthetic package constructed below, just with nothing to scan.
        let extra_dir = suite
            .extra_metainfo_dir
            .as_ref()
            .map(|dir| dir.join(section))
            .unwrap_or_default();
        let arch_extra_dir = extra_dir.join(arch);

        if suite.extra_metainfo_dir.is_some() {
            info!(suite = %suite.name, section, arch, "loading additional metainfo from local directory");
        } else {
            info!(suite = %suite.name, section, arch, "injecting component removal requests");
        }

        let dipkg = DataInjectPackage::new("_locally-injected_", arch, "/usr")
            .with_maintainer("AppStream Generator Maintainer")
            .with_data_location(extra_dir.display().to_string())
            .with_arch_data_location(arch_extra_dir.display().to_string());
        let pkid = dipkg.id();

        // This synthetic package never changes version, so cruft removal
        // won't naturally retire a stale result for it; force reprocessing
        // every run instead (spec.md §4.6 step 3).
        self.dstore.remove_package(&pkid);

        let mut result = self.extractor.extract(&dipkg);
        inj_mods.add_removal_requests_to_result(&mut result);
        self.dstore.add_generator_result(self.config.data_type, result, true);

        Some(Arc::new(dipkg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::dummy::DummyPackageIndex;
    use crate::engine::Engine;
    use crate::report::NoopReportGenerator;
    use crate::result::NullExtractor;
    use crate::suite::Config;
    use std::collections::HashMap;
    use tempfile::tempdir;

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

    fn icon_handler(engine: &Engine) -> IconHandler {
        IconHandler::new(
            Arc::clone(engine.contents_store()),
            engine.config().media_pool_dir(),
            HashMap::new(),
            None,
        )
    }

    #[test]
    fn process_work_unit_size_has_floor_and_ceiling() {
        assert_eq!(process_work_unit_size(0, 4), 10);
        assert_eq!(process_work_unit_size(100, 0), 10);
        assert_eq!(process_work_unit_size(40, 4), 10);
        assert_eq!(process_work_unit_size(100_000, 4), 100);
    }

    #[test]
    fn interesting_package_yields_a_component_and_no_ignore_flag() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let iconh = icon_handler(&engine);
        let inj_mods = InjectedModifications::default();

        struct InterestingPackage;
        impl Package for InterestingPackage {
            fn name(&self) -> &str {
                "test"
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
                static CONTENTS: once_cell::sync::Lazy<Vec<String>> =
                    once_cell::sync::Lazy::new(|| vec!["/usr/share/applications/foo.desktop".into()]);
                &CONTENTS
            }
            fn get_file_data(&self, _fname: &str) -> Vec<u8> {
                Vec::new()
            }
            fn finish(&self) {}
        }

        let pkgs: Vec<Arc<dyn Package>> = vec![Arc::new(InterestingPackage)];
        engine.process_packages(&pkgs, &iconh, &inj_mods);

        assert!(engine.data_store().package_exists("test/1.0/amd64"));
        assert!(!engine.data_store().is_ignored("test/1.0/amd64"));
        assert_eq!(engine.data_store().gcids_for_package("test/1.0/amd64").len(), 1);
    }

    #[test]
    fn already_present_package_is_skipped() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let iconh = icon_handler(&engine);
        let inj_mods = InjectedModifications::default();

        engine.data_store().set_package_ignore("test/1.0/amd64");
        let pkgs: Vec<Arc<dyn Package>> = engine
            .pkg_index
            .packages_for("testing", "main", "amd64", true)
            .unwrap();
        engine.process_packages(&pkgs, &iconh, &inj_mods);
        // Still ignored: process_packages must not have re-extracted it.
        assert!(engine.data_store().is_ignored("test/1.0/amd64"));
    }

    #[test]
    fn no_extra_dir_and_no_removals_yields_nothing_to_inject() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let iconh = icon_handler(&engine);
        let suite = Suite::new("testing");
        let inj_mods = InjectedModifications::default();

        let result = engine.process_extra_metainfo_data(&suite, &iconh, "main", "amd64", &inj_mods);
        assert!(result.is_none());
    }

    #[test]
    fn pending_removal_requests_alone_still_yield_a_fake_package() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let iconh = icon_handler(&engine);
        let suite = Suite::new("testing");
        let inj_mods = InjectedModifications::with_removed_cids(vec!["org.example.Foo".into()]);

        let result = engine.process_extra_metainfo_data(&suite, &iconh, "main", "amd64", &inj_mods);
        let pkg = result.expect("removal requests alone must still construct the synthetic package");
        assert!(pkg.contents().is_empty());

        let stored = engine
            .data_store()
            .hints_for_package(&pkg.id());
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tag, "component-removed");
    }

    #[test]
    fn extra_metainfo_dir_yields_a_fake_package() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let iconh = icon_handler(&engine);

        let extra_dir = dir.path().join("extra");
        std::fs::create_dir_all(extra_dir.join("main")).unwrap();
        std::fs::write(extra_dir.join("main/foo.xml"), b"<component/>").unwrap();

        let mut suite = Suite::new("testing");
        suite.extra_metainfo_dir = Some(extra_dir);
        let inj_mods = InjectedModifications::default();

        let result = engine.process_extra_metainfo_data(&suite, &iconh, "main", "amd64", &inj_mods);
        assert!(result.is_some());
        let pkg = result.unwrap();
        assert_eq!(pkg.version(), "0~0");
        assert!(engine.data_store().package_exists(&pkg.id()));
    }
}
