//! The export phase: assemble the compressed catalog, CID index, hints and
//! icon tarballs for a `(suite, section, arch)` triple, materializing
//! per-suite hardlinked media views under the immutable-suites feature
//! (spec.md §4.7).
//!
//! Grounded on `original_source/src/engine.cpp` `Engine::getMetadataHead`,
//! `Engine::exportMetadata`, `Engine::exportIconTarballs`,
//! `Engine::getIconCandidatePackages`.

use super::Engine;
use crate::archive;
use crate::error::EngineError;
use crate::package::Package;
use crate::suite::{DataType, Suite};
use crate::util;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::info;

impl Engine {
    /// Assembles the catalog head: format-version, origin, and the optional
    /// `priority`/`media_baseurl`/`time` attributes gated by suite and
    /// feature configuration (spec.md §6 "Catalog head").
    pub fn metadata_head(&self, suite: &Suite, section: &str) -> String {
        let origin = self.config.origin(&suite.name, section);
        let media_base_url = self.config.media_base_url_for(&suite.name);
        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        match self.config.data_type {
            DataType::Xml => {
                let mut head = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
                head.push_str(&format!(
                    "<components version=\"{}\" origin=\"{}\"",
                    self.config.format_version, origin
                ));
                if suite.data_priority != 0 {
                    head.push_str(&format!(" priority=\"{}\"", suite.data_priority));
                }
                if let Some(url) = &media_base_url {
                    head.push_str(&format!(" media_baseurl=\"{url}\""));
                }
                if self.config.features.metadata_timestamps {
                    head.push_str(&format!(" time=\"{now}\""));
                }
                head.push('>');
                head
            }
            DataType::Yaml => {
                let mut head = format!(
                    "%YAML 1.2\n---\nFile: DEP-11\nVersion: '{}'\nOrigin: {}",
                    self.config.format_version, origin
                );
                if let Some(url) = &media_base_url {
                    head.push_str(&format!("\nMediaBaseUrl: {url}"));
                }
                if suite.data_priority != 0 {
                    head.push_str(&format!("\nPriority: {}", suite.data_priority));
                }
                if self.config.features.metadata_timestamps {
                    head.push_str(&format!("\nTime: '{now}'"));
                }
                head
            }
        }
    }

    /// Writes the compressed catalog, CID index and hints for one
    /// `(suite, section, arch)` triple, and (under immutable suites)
    /// hardlinks each referenced gcid's media from the shared pool into the
    /// suite-specific directory (spec.md §4.7).
    pub fn export_metadata(
        &self,
        suite: &Suite,
        section: &str,
        arch: &str,
        pkgs: &[Arc<dyn Package>],
    ) -> Result<(), EngineError> {
        info!(suite = %suite.name, section, arch, "exporting data");

        let body = Mutex::new(String::new());
        let cid_gcid_map: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());
        let hint_entries: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let use_immutable_suites = self.config.features.immutable_suites;
        let media_export_dir = if use_immutable_suites {
            self.config.media_suite_dir(&suite.name)
        } else {
            self.dstore.media_export_pool_dir().to_path_buf()
        };

        self.pool.install(|| {
            pkgs.par_iter().for_each(|pkg| {
                let pkid = pkg.id();
                let gcids = self.dstore.gcids_for_package(&pkid);
                if !gcids.is_empty() {
                    let mdata = self.dstore.metadata_for_package(self.config.data_type, &pkid);
                    if !mdata.is_empty() {
                        let mut buf = body.lock().unwrap();
                        for md in &mdata {
                            buf.push_str(&util::sanitize_utf8(md.as_bytes()));
                            buf.push('\n');
                        }
                    }

                    for gcid in &gcids {
                        match util::cid_from_gcid(gcid) {
                            Some(cid) => {
                                cid_gcid_map.lock().unwrap().insert(cid.to_string(), gcid.clone());
                            }
                            None => {
                                tracing::error!(gcid, "could not extract component-ID from GCID");
                            }
                        }

                        if use_immutable_suites {
                            let pool_path = self.dstore.media_export_pool_dir().join(gcid);
                            let suite_path = media_export_dir.join(gcid);
                            if pool_path.exists() && !suite_path.exists() {
                                if let Err(e) = archive::hardlink_copy_dir(&pool_path, &suite_path) {
                                    tracing::warn!(gcid, error = %e, "failed to hardlink media into suite directory");
                                }
                            }
                        }
                    }
                }

                for hint in self.dstore.hints_for_package(&pkid) {
                    if let Ok(entry) = serde_json::to_string_pretty(&hint) {
                        hint_entries.lock().unwrap().push(entry);
                    }
                }
            });
        });

        let data_export_dir = self.config.data_dir(&suite.name, section);
        let hints_export_dir = self.config.hints_dir(&suite.name, section);
        std::fs::create_dir_all(&data_export_dir).map_err(|source| crate::error::StoreError::Io {
            path: data_export_dir.clone(),
            source,
        })?;
        std::fs::create_dir_all(&hints_export_dir).map_err(|source| crate::error::StoreError::Io {
            path: hints_export_dir.clone(),
            source,
        })?;

        let mut mdata_file = self.metadata_head(suite, section);
        mdata_file.push('\n');
        mdata_file.push_str(&body.into_inner().unwrap());
        if self.config.data_type == DataType::Xml {
            mdata_file.push_str("</components>\n");
        }

        let components_base = data_export_dir.join(format!("Components-{arch}.{}", self.config.data_type.extension()));
        archive::save_gz_and_xz(&components_base, mdata_file.as_bytes())
            .map_err(|source| crate::error::StoreError::Io { path: components_base.clone(), source })?;

        let cid_index_json: serde_json::Value = cid_gcid_map.into_inner().unwrap().into_iter().collect::<HashMap<_, _>>().into();
        let cid_index_str =
            serde_json::to_string_pretty(&cid_index_json).map_err(crate::error::StoreError::from)?;
        let cid_index_base = data_export_dir.join(format!("CID-Index-{arch}.json"));
        archive::save_gz_only(&cid_index_base, cid_index_str.as_bytes())
            .map_err(|source| crate::error::StoreError::Io { path: cid_index_base.clone(), source })?;

        let mut hints_file = String::from("[\n");
        hints_file.push_str(&hint_entries.into_inner().unwrap().join(",\n"));
        hints_file.push_str("\n]\n");
        let hints_base = hints_export_dir.join(format!("Hints-{arch}.json"));
        archive::save_gz_and_xz(&hints_base, hints_file.as_bytes())
            .map_err(|source| crate::error::StoreError::Io { path: hints_base.clone(), source })?;

        let hint_defs_dir = self.config.hints_suite_root_dir(&suite.name);
        std::fs::create_dir_all(&hint_defs_dir).map_err(|source| crate::error::StoreError::Io {
            path: hint_defs_dir.clone(),
            source,
        })?;
        let hint_defs_path = hint_defs_dir.join("hint-definitions.json");
        let hint_defs_str = serde_json::to_string_pretty(&crate::hints::registry_as_json())
            .map_err(crate::error::StoreError::from)?;
        std::fs::write(&hint_defs_path, hint_defs_str).map_err(|source| crate::error::StoreError::Io {
            path: hint_defs_path.clone(),
            source,
        })?;

        Ok(())
    }

    /// Writes one `icons-<tag>.tar.gz` per configured cached icon tier,
    /// collecting files from every package's gcid-keyed icon directory and
    /// deduplicating by containing directory (spec.md §4.7
    /// `exportIconTarballs`).
    pub fn export_icon_tarballs(
        &self,
        suite: &Suite,
        section: &str,
        pkgs: &[Arc<dyn Package>],
    ) -> Result<(), EngineError> {
        let data_export_dir = self.config.data_dir(&suite.name, section);
        std::fs::create_dir_all(&data_export_dir).map_err(|source| crate::error::StoreError::Io {
            path: data_export_dir.clone(),
            source,
        })?;

        let use_immutable_suites = self.config.features.immutable_suites;
        let media_export_dir = if use_immutable_suites {
            self.config.media_suite_dir(&suite.name)
        } else {
            self.dstore.media_export_pool_dir().to_path_buf()
        };

        let cached_tiers = self.config.icon_policy.cached_tiers();
        let icon_files: Mutex<HashMap<String, Vec<std::path::PathBuf>>> = Mutex::new(
            cached_tiers.iter().map(|tier| (tier.tag(), Vec::new())).collect(),
        );
        let processed_dirs: Mutex<HashSet<std::path::PathBuf>> = Mutex::new(HashSet::new());

        info!(suite = %suite.name, section, "creating icon tarballs");

        self.pool.install(|| {
            pkgs.par_iter().for_each(|pkg| {
                let pkid = pkg.id();
                let gcids = self.dstore.gcids_for_package(&pkid);
                if gcids.is_empty() {
                    return;
                }

                for gcid in &gcids {
                    for tier in &cached_tiers {
                        let icon_dir = media_export_dir.join(gcid).join("icons").join(tier.tag());
                        {
                            let mut dirs = processed_dirs.lock().unwrap();
                            if !dirs.insert(icon_dir.clone()) {
                                continue;
                            }
                        }

                        let Ok(entries) = std::fs::read_dir(&icon_dir) else {
                            continue;
                        };
                        for entry in entries.filter_map(Result::ok) {
                            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                                icon_files
                                    .lock()
                                    .unwrap()
                                    .entry(tier.tag())
                                    .or_default()
                                    .push(entry.path());
                            }
                        }
                    }
                }
            });
        });

        let icon_files = icon_files.into_inner().unwrap();
        for tier in &cached_tiers {
            let files = icon_files.get(&tier.tag()).cloned().unwrap_or_default();
            let entries: Vec<(String, std::path::PathBuf)> = files
                .into_iter()
                .map(|path| {
                    let archive_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (archive_name, path)
                })
                .collect();
            let tarball_path = data_export_dir.join(format!("icons-{}.tar.gz", tier.tag()));
            archive::write_icon_tarball(&tarball_path, entries)
                .map_err(|source| crate::error::StoreError::Io { path: tarball_path.clone(), source })?;
        }

        info!(suite = %suite.name, section, "icon tarballs built");
        Ok(())
    }

    /// Unions the target `(suite, section, arch)`'s packages with its
    /// `base_suite` counterpart and the configured auxiliary sections
    /// (spec.md §4.8 `getIconCandidatePackages`, §9 "hardcoded auxiliary
    /// sections" open question — moved to `Config::icon_candidate_sections`).
    pub fn get_icon_candidate_packages(
        &self,
        suite: &Suite,
        section: &str,
        arch: &str,
    ) -> HashMap<String, Arc<dyn Package>> {
        let mut pkg_map: HashMap<String, Arc<dyn Package>> = HashMap::new();

        for aux_section in &self.config.icon_candidate_sections {
            if section == aux_section || !suite.has_section(aux_section) {
                continue;
            }
            if let Ok(pkgs) = self.pkg_index.packages_for(&suite.name, aux_section, arch, true) {
                for pkg in pkgs {
                    pkg_map.insert(pkg.id(), pkg);
                }
            }
            if let Some(base) = &suite.base_suite {
                if let Ok(pkgs) = self.pkg_index.packages_for(base, aux_section, arch, true) {
                    for pkg in pkgs {
                        pkg_map.insert(pkg.id(), pkg);
                    }
                }
            }
        }

        if let Some(base) = &suite.base_suite {
            if let Ok(pkgs) = self.pkg_index.packages_for(base, section, arch, true) {
                for pkg in pkgs {
                    pkg_map.insert(pkg.id(), pkg);
                }
            }
        }

        if let Ok(pkgs) = self.pkg_index.packages_for(&suite.name, section, arch, true) {
            for pkg in pkgs {
                pkg_map.insert(pkg.id(), pkg);
            }
        }

        pkg_map
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

    #[test]
    fn metadata_head_only_emits_configured_attributes() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let suite = Suite::new("testing");
        let head = engine.metadata_head(&suite, "main");
        assert!(head.contains("origin=\"asgen-testing-main\""));
        assert!(!head.contains("priority="));
        assert!(!head.contains("media_baseurl="));
        assert!(!head.contains("time="));
    }

    #[test]
    fn metadata_head_includes_priority_when_set() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let mut suite = Suite::new("testing");
        suite.data_priority = 10;
        let head = engine.metadata_head(&suite, "main");
        assert!(head.contains("priority=\"10\""));
    }

    #[test]
    fn origin_is_lowercase_ascii() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let mut suite = Suite::new("Testing");
        suite.name = "Testing".to_string();
        let head = engine.metadata_head(&suite, "Main");
        let origin_attr = head.split("origin=\"").nth(1).unwrap().split('"').next().unwrap();
        assert_eq!(origin_attr, origin_attr.to_lowercase());
        assert!(origin_attr.is_ascii());
    }

    #[test]
    fn export_metadata_writes_components_file_for_interesting_package() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let suite = Suite::new("testing");

        let pkgs: Vec<Arc<dyn Package>> = engine
            .pkg_index
            .packages_for("testing", "main", "amd64", true)
            .unwrap();
        engine.seed_contents_data(&suite, "main", "amd64", &pkgs).unwrap();

        let mut result = crate::result::GeneratorResult::new("test/1.0/amd64");
        result.components.push(crate::result::Component {
            gcid: "test.desktop/1.0/amd64".into(),
            metadata_xml: "<component><id>test.desktop</id></component>".into(),
        });
        engine.data_store().add_generator_result(engine.config().data_type, result, false);

        engine.export_metadata(&suite, "main", "amd64", &pkgs).unwrap();

        let components_path = engine.config().data_dir("testing", "main").join("Components-amd64.xml.gz");
        assert!(components_path.exists());
        let cid_index_path = engine.config().data_dir("testing", "main").join("CID-Index-amd64.json.gz");
        assert!(cid_index_path.exists());
        let hint_defs_path = engine.config().hints_suite_root_dir("testing").join("hint-definitions.json");
        assert!(hint_defs_path.exists());
    }

    #[test]
    fn immutable_suites_hardlinks_pool_media_into_suite_directory() {
        let dir = tempdir().unwrap();
        let mut config = Config::new("asgen", dir.path());
        config.features.immutable_suites = true;
        let engine = Engine::new(
            config,
            Arc::new(DummyPackageIndex::new()),
            Arc::new(NullExtractor),
            Arc::new(NoopReportGenerator),
        )
        .unwrap();
        let suite = Suite::new("testing");

        let pkgs: Vec<Arc<dyn Package>> =
            engine.pkg_index.packages_for("testing", "main", "amd64", true).unwrap();
        engine.seed_contents_data(&suite, "main", "amd64", &pkgs).unwrap();

        let gcid = "x/y/1/z";
        let mut result = crate::result::GeneratorResult::new("test/1.0/amd64");
        result.components.push(crate::result::Component {
            gcid: gcid.into(),
            metadata_xml: "<component><id>x</id></component>".into(),
        });
        engine.data_store().add_generator_result(engine.config().data_type, result, false);

        let pool_gcid_dir = engine.data_store().media_export_pool_dir().join(gcid);
        std::fs::create_dir_all(&pool_gcid_dir).unwrap();
        std::fs::write(pool_gcid_dir.join("icon.png"), b"PNGDATA").unwrap();

        engine.export_metadata(&suite, "main", "amd64", &pkgs).unwrap();

        let suite_gcid_dir = engine.config().media_suite_dir("testing").join(gcid);
        let suite_icon = suite_gcid_dir.join("icon.png");
        assert!(suite_icon.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let pool_meta = std::fs::metadata(pool_gcid_dir.join("icon.png")).unwrap();
            let suite_meta = std::fs::metadata(&suite_icon).unwrap();
            assert_eq!(pool_meta.ino(), suite_meta.ino());
        }
    }

    #[test]
    fn icon_candidate_packages_unions_auxiliary_sections() {
        let dir = tempdir().unwrap();
        let engine = test_engine(dir.path());
        let mut suite = Suite::new("testing");
        suite.sections = vec!["main".to_string(), "universe".to_string()];

        let candidates = engine.get_icon_candidate_packages(&suite, "main", "amd64");
        // DummyPackageIndex always returns one package regardless of section,
        // so both "main" and "universe" lookups collapse onto the same pkid.
        assert!(candidates.contains_key("test/1.0/amd64"));
    }
}
