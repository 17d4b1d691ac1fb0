//! The orchestrating `Engine`: owns the stores, the package index, and the
//! (external) component extractor, and drives the seed → process → export →
//! cleanup pipeline described in spec.md §4.
//!
//! Grounded on `original_source/src/engine.cpp`'s `Engine` class — the
//! submodules here (`seed`, `process`, `export`, `orchestrate`, `cleanup`)
//! mirror that file's method groupings one-to-one.

pub mod cleanup;
pub mod export;
pub mod orchestrate;
pub mod process;
pub mod seed;

use crate::error::EngineError;
use crate::index::PackageIndex;
use crate::report::ReportGenerator;
use crate::result::ComponentExtractor;
use crate::store::{ContentsStore, DataStore};
use crate::suite::{Config, Suite};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Computes the bounded worker-pool size: `max(min(hw, 6), ceil(0.60 * hw))`
/// (spec.md §5 "Scheduling model"; §9 "Thread-pool bound" — a tunable, not a
/// correctness property).
pub fn worker_pool_size(hardware_concurrency: usize) -> usize {
    let capped = hardware_concurrency.min(6);
    let scaled = ((hardware_concurrency as f64) * 0.60).ceil() as usize;
    capped.max(scaled).max(1)
}

/// Resolution of `check_suite_usable`: either a usable, non-immutable suite
/// with sections and architectures defined, or a reason it's not.
pub struct SuiteUsability<'a> {
    pub suite: &'a Suite,
}

/// Per-phase wall-clock timing for one `run_with_stats` invocation, mirroring
/// the teacher's `HarvestStats` (generalized from extraction/analysis to
/// this engine's seed/process/export phases).
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub seed_duration_ms: u64,
    pub process_duration_ms: u64,
    pub export_duration_ms: u64,
    pub total_duration_ms: u64,
    pub packages_processed: usize,
}

/// Structured dump of both stores' knowledge about one pkid, returned by
/// `Engine::describe_package`.
#[derive(Debug, Clone, Default)]
pub struct PackageInfo {
    pub pkid: String,
    pub contents: Vec<String>,
    pub icon_files: Vec<String>,
    pub in_contents_store: bool,
    pub in_data_store: bool,
    pub ignored: bool,
    pub gcids: Vec<String>,
    pub metadata: Vec<String>,
    pub hints: Vec<crate::result::Hint>,
}

/// Orchestrates a full generation run over one distribution's suites.
pub struct Engine {
    pub(crate) config: Config,
    pub(crate) pkg_index: Arc<dyn PackageIndex>,
    pub(crate) extractor: Arc<dyn ComponentExtractor>,
    pub(crate) cstore: Arc<ContentsStore>,
    pub(crate) dstore: Arc<DataStore>,
    pub(crate) report_gen: Arc<dyn ReportGenerator>,
    pub(crate) pool: rayon::ThreadPool,
    forced: AtomicBool,
}

impl Engine {
    /// Builds an `Engine`, opening the contents/data stores under the
    /// config's workspace and sizing the bounded worker pool from the
    /// available hardware concurrency.
    pub fn new(
        config: Config,
        pkg_index: Arc<dyn PackageIndex>,
        extractor: Arc<dyn ComponentExtractor>,
        report_gen: Arc<dyn ReportGenerator>,
    ) -> Result<Self, EngineError> {
        let cstore = ContentsStore::open(config.cache_root_dir().join("contents.json"))?;
        let dstore = DataStore::open(config.cache_root_dir().join("data.json"), config.media_pool_dir())?;

        let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_pool_size(hw))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;

        Ok(Self {
            config,
            pkg_index,
            extractor,
            cstore: Arc::new(cstore),
            dstore: Arc::new(dstore),
            report_gen,
            pool,
            forced: AtomicBool::new(false),
        })
    }

    pub fn forced(&self) -> bool {
        self.forced.load(Ordering::Relaxed)
    }

    pub fn set_forced(&self, value: bool) {
        self.forced.store(value, Ordering::Relaxed);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn contents_store(&self) -> &Arc<ContentsStore> {
        &self.cstore
    }

    pub fn data_store(&self) -> &Arc<DataStore> {
        &self.dstore
    }

    /// Read-only diagnostic dump of everything both stores know about one
    /// pkid: contents, icon files, gcids, rendered metadata and hints.
    /// Grounded on `original_source/src/engine.cpp`'s `printPackageInfo`; this
    /// crate has no CLI, so it returns a structured report instead of
    /// printing one (formatting for a terminal is the caller's job).
    pub fn describe_package(&self, pkid: &str) -> PackageInfo {
        PackageInfo {
            pkid: pkid.to_string(),
            contents: self.cstore.get_contents(pkid).unwrap_or_default(),
            icon_files: self.cstore.get_icon_files(pkid).unwrap_or_default(),
            in_contents_store: self.cstore.package_exists(pkid),
            in_data_store: self.dstore.package_exists(pkid),
            ignored: self.dstore.is_ignored(pkid),
            gcids: self.dstore.gcids_for_package(pkid),
            metadata: self.dstore.metadata_for_package(self.config.data_type, pkid),
            hints: self.dstore.hints_for_package(pkid),
        }
    }

    /// Looks a suite up by name and validates it can be processed: it must
    /// exist, not be immutable, and have at least one section and one
    /// architecture configured (spec.md §7 "Configuration errors").
    pub fn check_suite_usable<'a>(&'a self, suite_name: &str) -> Result<SuiteUsability<'a>, EngineError> {
        let suite = self
            .config
            .suite(suite_name)
            .ok_or_else(|| EngineError::SuiteNotFound(suite_name.to_string()))?;

        if suite.is_immutable {
            return Err(EngineError::SuiteImmutable(suite.name.clone()));
        }
        if suite.sections.is_empty() {
            return Err(EngineError::NoSections(suite.name.clone()));
        }
        if suite.architectures.is_empty() {
            return Err(EngineError::NoArchitectures(suite.name.clone()));
        }

        Ok(SuiteUsability { suite })
    }
}
