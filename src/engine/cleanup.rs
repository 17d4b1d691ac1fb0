//! Store-wide cruft removal: dropping entries for packages no longer
//! present in any non-immutable suite, forgetting a package on request, and
//! the hints/components reset used before reprocessing a suite from scratch
//! (spec.md §4.9).
//!
//! Grounded on `original_source/src/engine.cpp` `Engine::runCleanup`,
//! `Engine::removeHintsComponents`, `Engine::forgetPackage`.

use super::Engine;
use crate::error::EngineError;
use crate::package::{split_pkid, Package};
use std::collections::HashSet;
use tracing::info;

impl Engine {
    /// Removes every store entry whose pkid is no longer reachable from any
    /// non-immutable suite's current package sets, then compacts the media
    /// pool and statistics history.
    pub fn run_cleanup(&self) -> Result<(), EngineError> {
        let tmp_dir = self.config.tmp_dir();
        if tmp_dir.exists() {
            std::fs::remove_dir_all(&tmp_dir).map_err(|source| crate::error::StoreError::Io {
                path: tmp_dir.clone(),
                source,
            })?;
        }

        let mut stale_contents: HashSet<String> = self.cstore.get_package_id_set();
        let mut stale_data: HashSet<String> = self.dstore.get_package_id_set();

        for suite in &self.config.suites {
            if suite.is_immutable {
                continue;
            }
            for section in &suite.sections {
                for arch in &suite.architectures {
                    let pkgs = self.pkg_index.packages_for(&suite.name, section, arch, false)?;
                    for pkg in &pkgs {
                        let pkid = pkg.id();
                        stale_contents.remove(&pkid);
                        stale_data.remove(&pkid);
                    }

                    if let Some(base_suite) = &suite.base_suite {
                        let base_pkgs = self.pkg_index.packages_for(base_suite, section, arch, false)?;
                        for pkg in &base_pkgs {
                            let pkid = pkg.id();
                            stale_contents.remove(&pkid);
                            stale_data.remove(&pkid);
                        }
                    }
                }
            }
            self.pkg_index.release();
        }

        info!(
            stale_contents = stale_contents.len(),
            stale_data = stale_data.len(),
            "removing cruft from stores"
        );
        self.cstore.remove_packages(&stale_contents);
        self.dstore.remove_packages(&stale_data);

        self.dstore.cleanup_cruft()?;
        self.dstore.cleanup_statistics();
        Ok(())
    }

    /// Drops every data-store component/hint for packages currently present
    /// in `suite_name`, leaving ignored-package markers untouched — used to
    /// force a full reprocessing of a suite on the next run.
    pub fn remove_hints_components(&self, suite_name: &str) -> Result<(), EngineError> {
        let usability = self.check_suite_usable(suite_name)?;
        let suite = usability.suite.clone();

        for section in &suite.sections {
            for arch in &suite.architectures {
                let pkgs = self.pkg_index.packages_for(&suite.name, section, arch, false)?;
                for pkg in &pkgs {
                    let pkid = pkg.id();
                    if self.dstore.package_exists(&pkid) && !self.dstore.is_ignored(&pkid) {
                        self.dstore.remove_package(&pkid);
                    }
                }
            }
            self.pkg_index.release();
        }

        self.dstore.cleanup_cruft()?;
        Ok(())
    }

    /// Removes one package (an exact `name/version/arch` pkid) or every
    /// package whose pkid matches `identifier` as a prefix, from both
    /// stores (spec.md §4.9 "forget").
    pub fn forget_package(&self, identifier: &str) -> Result<(), EngineError> {
        if split_pkid(identifier).is_some() {
            if self.cstore.package_exists(identifier) {
                self.cstore.remove_package(identifier);
            }
            if self.dstore.package_exists(identifier) {
                self.dstore.remove_package(identifier);
            }
        } else {
            for pkid in self.dstore.pkids_matching(identifier) {
                self.dstore.remove_package(&pkid);
                if self.cstore.package_exists(&pkid) {
                    self.cstore.remove_package(&pkid);
                }
            }
        }

        self.dstore.cleanup_cruft()?;
        Ok(())
    }
}
