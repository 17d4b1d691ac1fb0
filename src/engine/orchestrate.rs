//! Top-level run orchestration: the seed → process → export sequence per
//! `(suite, section)`, the whole-suite `run`/`publish` entry points, and the
//! targeted single-file reprocessing path (spec.md §4.8).
//!
//! Grounded on `original_source/src/engine.cpp`
//! `Engine::processSuiteSection`, `Engine::run`, `Engine::publish`,
//! `Engine::publishMetadataForSuiteSection`, `Engine::processFile`.

use super::{Engine, RunStats};
use crate::error::EngineError;
use crate::icons::IconHandler;
use crate::modifications::InjectedModifications;
use crate::package::Package;
use crate::suite::Suite;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

impl Engine {
    /// Runs seed → process → extra-metainfo → export for one section across
    /// every architecture of `suite`, then (if any architecture changed)
    /// exports icon tarballs and reports. Returns whether any data changed.
    pub fn process_suite_section(&self, suite: &Suite, section: &str) -> Result<bool, EngineError> {
        let inj_mods = InjectedModifications::load_for_suite(&self.config.suite_config_dir(), &suite.name)
            .map_err(|e| EngineError::InjectedModifications(suite.name.clone(), e.to_string()))?;

        let mut suite_data_changed = false;
        let mut section_pkgs: Vec<Arc<dyn Package>> = Vec::new();

        for arch in &suite.architectures {
            let found_interesting = self.seed_contents_data(suite, section, arch, &[])? || self.forced();
            if !found_interesting {
                info!(suite = %suite.name, section, arch, "no interesting changes, skipping");
                continue;
            }

            let pkgs = self.pkg_index.packages_for(&suite.name, section, arch, true)?;

            let candidates = self.get_icon_candidate_packages(suite, section, arch);
            let iconh = IconHandler::new(
                Arc::clone(&self.cstore),
                self.config.media_pool_dir(),
                candidates,
                suite.icon_theme.clone(),
            );

            self.process_packages(&pkgs, &iconh, &inj_mods);

            let mut arch_pkgs = pkgs;
            if let Some(fake_pkg) =
                self.process_extra_metainfo_data(suite, &iconh, section, arch, &inj_mods)
            {
                arch_pkgs.push(fake_pkg);
            }

            self.export_metadata(suite, section, arch, &arch_pkgs)?;

            suite_data_changed = true;
            section_pkgs.extend(arch_pkgs);
        }

        if suite_data_changed {
            self.export_icon_tarballs(suite, section, &section_pkgs)?;
            self.report_gen.process_for(suite, section, &section_pkgs);
        }

        self.pkg_index.release();
        Ok(suite_data_changed)
    }

    /// Runs every section of `suite_name`, then refreshes its index pages
    /// and (only if anything changed) its statistics (spec.md §4.8 "run").
    pub fn run(&self, suite_name: &str) -> Result<(), EngineError> {
        let usability = self.check_suite_usable(suite_name)?;
        let sections = usability.suite.sections.clone();

        let mut any_changed = false;
        for section in &sections {
            let suite = self.config.suite(suite_name).expect("validated by check_suite_usable");
            if self.process_suite_section(suite, section)? {
                any_changed = true;
            }
        }

        self.report_gen.update_index_pages();
        if any_changed {
            self.report_gen.export_statistics();
        }
        Ok(())
    }

    /// Like [`Engine::process_suite_section`], but records per-phase wall-clock
    /// timing into a [`RunStats`] alongside the usual changed/unchanged
    /// result, mirroring the teacher's `HarvestStats` captured inside
    /// `HarvestPipeline::execute` (spec.md §9 "ambient concerns carried
    /// regardless of Non-goals" — basic timing, not metrics export).
    pub fn process_suite_section_with_stats(
        &self,
        suite: &Suite,
        section: &str,
    ) -> Result<(bool, RunStats), EngineError> {
        let inj_mods = InjectedModifications::load_for_suite(&self.config.suite_config_dir(), &suite.name)
            .map_err(|e| EngineError::InjectedModifications(suite.name.clone(), e.to_string()))?;

        let mut stats = RunStats::default();
        let mut suite_data_changed = false;
        let mut section_pkgs: Vec<Arc<dyn Package>> = Vec::new();

        for arch in &suite.architectures {
            let seed_start = Instant::now();
            let found_interesting = self.seed_contents_data(suite, section, arch, &[])? || self.forced();
            stats.seed_duration_ms += seed_start.elapsed().as_millis() as u64;
            if !found_interesting {
                info!(suite = %suite.name, section, arch, "no interesting changes, skipping");
                continue;
            }

            let pkgs = self.pkg_index.packages_for(&suite.name, section, arch, true)?;

            let candidates = self.get_icon_candidate_packages(suite, section, arch);
            let iconh = IconHandler::new(
                Arc::clone(&self.cstore),
                self.config.media_pool_dir(),
                candidates,
                suite.icon_theme.clone(),
            );

            let process_start = Instant::now();
            self.process_packages(&pkgs, &iconh, &inj_mods);
            stats.packages_processed += pkgs.len();

            let mut arch_pkgs = pkgs;
            if let Some(fake_pkg) =
                self.process_extra_metainfo_data(suite, &iconh, section, arch, &inj_mods)
            {
                arch_pkgs.push(fake_pkg);
            }
            stats.process_duration_ms += process_start.elapsed().as_millis() as u64;

            let export_start = Instant::now();
            self.export_metadata(suite, section, arch, &arch_pkgs)?;
            stats.export_duration_ms += export_start.elapsed().as_millis() as u64;

            suite_data_changed = true;
            section_pkgs.extend(arch_pkgs);
        }

        if suite_data_changed {
            let export_start = Instant::now();
            self.export_icon_tarballs(suite, section, &section_pkgs)?;
            stats.export_duration_ms += export_start.elapsed().as_millis() as u64;
            self.report_gen.process_for(suite, section, &section_pkgs);
        }

        self.pkg_index.release();
        Ok((suite_data_changed, stats))
    }

    /// Like [`Engine::run`], but accumulates [`RunStats`] across every
    /// section of `suite_name` instead of discarding timing information.
    pub fn run_with_stats(&self, suite_name: &str) -> Result<RunStats, EngineError> {
        let total_start = Instant::now();
        let usability = self.check_suite_usable(suite_name)?;
        let sections = usability.suite.sections.clone();

        let mut total = RunStats::default();
        let mut any_changed = false;
        for section in &sections {
            let suite = self.config.suite(suite_name).expect("validated by check_suite_usable");
            let (changed, stats) = self.process_suite_section_with_stats(suite, section)?;
            total.seed_duration_ms += stats.seed_duration_ms;
            total.process_duration_ms += stats.process_duration_ms;
            total.export_duration_ms += stats.export_duration_ms;
            total.packages_processed += stats.packages_processed;
            if changed {
                any_changed = true;
            }
        }

        self.report_gen.update_index_pages();
        if any_changed {
            self.report_gen.export_statistics();
        }
        total.total_duration_ms = total_start.elapsed().as_millis() as u64;
        Ok(total)
    }

    /// Runs a single named section of `suite_name`.
    pub fn run_section(&self, suite_name: &str, section: &str) -> Result<(), EngineError> {
        let usability = self.check_suite_usable(suite_name)?;
        if !usability.suite.has_section(section) {
            return Err(EngineError::SectionNotInSuite {
                suite: suite_name.to_string(),
                section: section.to_string(),
            });
        }

        let suite = self.config.suite(suite_name).expect("validated by check_suite_usable");
        let changed = self.process_suite_section(suite, section)?;

        self.report_gen.update_index_pages();
        if changed {
            self.report_gen.export_statistics();
        }
        Ok(())
    }

    /// Re-exports one section's metadata and icon tarballs from whatever is
    /// already in the data store, without seeding or processing — used to
    /// republish after an out-of-band data change (spec.md §4.8 "publish").
    pub fn publish_metadata_for_suite_section(&self, suite: &Suite, section: &str) -> Result<(), EngineError> {
        let mut section_pkgs: Vec<Arc<dyn Package>> = Vec::new();

        for arch in &suite.architectures {
            let pkgs = self.pkg_index.packages_for(&suite.name, section, arch, true)?;
            self.export_metadata(suite, section, arch, &pkgs)?;
            section_pkgs.extend(pkgs);
        }

        self.export_icon_tarballs(suite, section, &section_pkgs)?;
        self.report_gen.process_for(suite, section, &section_pkgs);
        self.pkg_index.release();
        Ok(())
    }

    /// Publishes every section of `suite_name`, unconditionally refreshing
    /// index pages and statistics afterward.
    pub fn publish(&self, suite_name: &str) -> Result<(), EngineError> {
        let usability = self.check_suite_usable(suite_name)?;
        let sections = usability.suite.sections.clone();

        for section in &sections {
            let suite = self.config.suite(suite_name).expect("validated by check_suite_usable");
            self.publish_metadata_for_suite_section(suite, section)?;
        }

        self.report_gen.update_index_pages();
        self.report_gen.export_statistics();
        Ok(())
    }

    /// Publishes a single named section of `suite_name`.
    pub fn publish_section(&self, suite_name: &str, section: &str) -> Result<(), EngineError> {
        let usability = self.check_suite_usable(suite_name)?;
        if !usability.suite.has_section(section) {
            return Err(EngineError::SectionNotInSuite {
                suite: suite_name.to_string(),
                section: section.to_string(),
            });
        }

        let suite = self.config.suite(suite_name).expect("validated by check_suite_usable");
        self.publish_metadata_for_suite_section(suite, section)?;

        self.report_gen.update_index_pages();
        self.report_gen.export_statistics();
        Ok(())
    }

    /// Targeted reprocessing of a small set of files, bypassing the normal
    /// whole-index seed/process/export sequence: resolves each file to a
    /// package via the backend, groups by architecture, seeds and processes
    /// each group, but does not export (spec.md §4.8 "process a file").
    pub fn process_file(
        &self,
        suite_name: &str,
        section: &str,
        files: &[String],
    ) -> Result<(), EngineError> {
        let usability = self.check_suite_usable(suite_name)?;
        if !usability.suite.has_section(section) {
            return Err(EngineError::SectionNotInSuite {
                suite: suite_name.to_string(),
                section: section.to_string(),
            });
        }
        let suite = self.config.suite(suite_name).expect("validated above").clone();

        let mut pkgs_by_arch: HashMap<String, Vec<Arc<dyn Package>>> = HashMap::new();
        for file in files {
            match self.pkg_index.package_for_file(file, Some(suite_name), Some(section))? {
                Some(pkg) => {
                    pkgs_by_arch.entry(pkg.arch().to_string()).or_default().push(pkg);
                }
                None => {
                    return Err(EngineError::FileResolution {
                        file: file.clone(),
                        reason: "backend could not resolve this path to a package".to_string(),
                    });
                }
            }
        }

        let inj_mods = InjectedModifications::load_for_suite(&self.config.suite_config_dir(), &suite.name)
            .map_err(|e| EngineError::InjectedModifications(suite.name.clone(), e.to_string()))?;

        for (arch, pkgs) in &pkgs_by_arch {
            let found_interesting = self.seed_contents_data(&suite, section, arch, pkgs)? || self.forced();
            if !found_interesting {
                continue;
            }

            let candidates = self.get_icon_candidate_packages(&suite, section, arch);
            let iconh = IconHandler::new(
                Arc::clone(&self.cstore),
                self.config.media_pool_dir(),
                candidates,
                suite.icon_theme.clone(),
            );
            self.process_packages(pkgs, &iconh, &inj_mods);
        }

        self.pkg_index.release();
        Ok(())
    }
}
