//! `DataStore`: the generator's main durable record — per-pkid generator
//! results, per-suite repo-change fingerprints, and the content-addressed
//! media pool (spec.md §4.3).

use crate::error::StoreError;
use crate::result::GeneratorResult;
use crate::stats::{find_superseded, StatisticsEntry};
use crate::suite::DataType;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Immediate subdirectories of `dir`, skipping plain files (the media pool
/// tree only ever nests directories at each of its three levels).
fn read_dir_entries(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })? {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            entries.push(entry.path());
        }
    }
    Ok(entries)
}

/// Removes `dir` if cleaning up its children left it empty.
fn remove_if_empty(dir: &Path) -> Result<(), StoreError> {
    let is_empty = std::fs::read_dir(dir)
        .map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?
        .next()
        .is_none();
    if is_empty {
        std::fs::remove_dir(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct DataRow {
    result: GeneratorResult,
    /// Whether this pkid was last seen "ignored" (no components, possibly
    /// hints) so cleanup can distinguish "never processed" from "processed,
    /// nothing interesting".
    ignored: bool,
}

/// Backend identifier plus an opaque fingerprint (mtime, digest, ...) used
/// by [`crate::index::PackageIndex::has_changes`] implementations to decide
/// whether a `(suite, section, arch)` triple needs reprocessing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RepoInfo {
    pub fingerprint: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DataStoreSnapshot {
    rows: std::collections::HashMap<String, DataRow>,
    repo_info: std::collections::HashMap<String, RepoInfo>,
    /// Media pool: gcid -> absolute path on disk of the exported/cached
    /// media file, used for hardlinking into export trees instead of
    /// recopying (spec.md §4.3, §5 "the media pool persists under a stable
    /// path so repeated runs hardlink rather than recopy").
    media_pool: std::collections::HashMap<String, PathBuf>,
    statistics: std::collections::HashMap<i64, StatisticsEntry>,
}

/// The generator's durable per-run store.
pub struct DataStore {
    path: PathBuf,
    media_pool_dir: PathBuf,
    rows: DashMap<String, DataRow>,
    repo_info: DashMap<String, RepoInfo>,
    media_pool: DashMap<String, PathBuf>,
    statistics: DashMap<i64, StatisticsEntry>,
}

impl DataStore {
    /// Opens (or creates) the store at `path`. `media_pool_dir` is the root
    /// of the content-addressed media export pool (spec.md §4.3
    /// `mediaExportPoolDir`); it is not itself persisted in the JSON
    /// snapshot, only configured per run.
    pub fn open(path: impl AsRef<Path>, media_pool_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let data = std::fs::read(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if data.is_empty() {
                DataStoreSnapshot::default()
            } else {
                serde_json::from_slice(&data)?
            }
        } else {
            DataStoreSnapshot::default()
        };
        Ok(Self {
            path,
            media_pool_dir: media_pool_dir.into(),
            rows: snapshot.rows.into_iter().collect(),
            repo_info: snapshot.repo_info.into_iter().collect(),
            media_pool: snapshot.media_pool.into_iter().collect(),
            statistics: snapshot.statistics.into_iter().collect(),
        })
    }

    /// Root directory of the content-addressed media export pool (spec.md
    /// §4.3 `mediaExportPoolDir`).
    pub fn media_export_pool_dir(&self) -> &Path {
        &self.media_pool_dir
    }

    /// Atomically persists the metadata, hints, gcids and ignore flag from a
    /// `GeneratorResult` (spec.md §4.3 `addGeneratorResult`). `data_type` is
    /// accepted for contract fidelity; the rendered document already carries
    /// its format. Since a pkid bakes in the version, `always_overwrite` is
    /// a no-op here: a prior entry for the same pkid is always replaced.
    pub fn add_generator_result(&self, _data_type: DataType, result: GeneratorResult, _always_overwrite: bool) {
        let ignored = result.is_ignored();
        self.rows.insert(result.pkid.clone(), DataRow { result, ignored });
    }

    /// Marks `pkid` as ignored without an extraction pass (spec.md §4.4
    /// step 4 "not interesting" branch).
    pub fn set_package_ignore(&self, pkid: &str) {
        self.rows
            .entry(pkid.to_string())
            .and_modify(|row| row.ignored = true)
            .or_insert_with(|| DataRow {
                result: GeneratorResult::new(pkid),
                ignored: true,
            });
    }

    pub fn get_result(&self, pkid: &str) -> Option<GeneratorResult> {
        self.rows.get(pkid).map(|row| row.result.clone())
    }

    pub fn metadata_for_package(&self, _data_type: DataType, pkid: &str) -> Vec<String> {
        self.rows
            .get(pkid)
            .map(|row| row.result.components.iter().map(|c| c.metadata_xml.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_ignored(&self, pkid: &str) -> bool {
        self.rows.get(pkid).map(|row| row.ignored).unwrap_or(false)
    }

    pub fn package_exists(&self, pkid: &str) -> bool {
        self.rows.contains_key(pkid)
    }

    pub fn remove_package(&self, pkid: &str) {
        self.rows.remove(pkid);
    }

    pub fn remove_packages(&self, pkids: &HashSet<String>) {
        for pkid in pkids {
            self.rows.remove(pkid);
        }
    }

    /// All pkids currently tracked, for cleanup/garbage-collection passes.
    pub fn all_pkids(&self) -> Vec<String> {
        self.rows.iter().map(|e| e.key().clone()).collect()
    }

    pub fn get_package_id_set(&self) -> HashSet<String> {
        self.rows.iter().map(|e| e.key().clone()).collect()
    }

    /// pkids equal to or starting with `pattern` (used by `forget`'s
    /// prefix-query fallback).
    pub fn pkids_matching(&self, pattern: &str) -> Vec<String> {
        self.rows
            .iter()
            .map(|e| e.key().clone())
            .filter(|pkid| pkid == pattern || pkid.starts_with(pattern))
            .collect()
    }

    pub fn gcids_for_package(&self, pkid: &str) -> Vec<String> {
        self.rows
            .get(pkid)
            .map(|row| row.result.components.iter().map(|c| c.gcid.clone()).collect())
            .unwrap_or_default()
    }

    pub fn hints_for_package(&self, pkid: &str) -> Vec<crate::result::Hint> {
        self.rows.get(pkid).map(|row| row.result.hints.clone()).unwrap_or_default()
    }

    pub fn has_hints(&self, pkid: &str) -> bool {
        self.rows.get(pkid).map(|row| !row.result.hints.is_empty()).unwrap_or(false)
    }

    pub fn get_repo_info(&self, key: &str) -> Option<RepoInfo> {
        self.repo_info.get(key).map(|v| v.clone())
    }

    pub fn set_repo_info(&self, key: &str, info: RepoInfo) {
        self.repo_info.insert(key.to_string(), info);
    }

    pub fn get_media_path(&self, gcid: &str) -> Option<PathBuf> {
        self.media_pool.get(gcid).map(|v| v.clone())
    }

    pub fn set_media_path(&self, gcid: &str, path: PathBuf) {
        self.media_pool.insert(gcid.to_string(), path);
    }

    /// Removes every directory actually present under the media pool whose
    /// name (the `<cid>/<version>/<arch>` path relative to the pool root) is
    /// not a `gcid` referenced by any live row (spec.md §4.3 `cleanupCruft`,
    /// §8 property 3).
    ///
    /// A `gcid` always has exactly three path segments (see
    /// [`crate::result::GeneratorResult`]), so pool entries sit at a fixed
    /// depth; this walks that depth directly rather than trusting
    /// `set_media_path`/`get_media_path`, which nothing in the real pipeline
    /// calls.
    pub fn cleanup_cruft(&self) -> Result<(), StoreError> {
        if !self.media_pool_dir.exists() {
            return Ok(());
        }

        let live: HashSet<String> = self
            .rows
            .iter()
            .flat_map(|e| e.value().result.components.iter().map(|c| c.gcid.clone()).collect::<Vec<_>>())
            .collect();

        for cid_entry in read_dir_entries(&self.media_pool_dir)? {
            for version_entry in read_dir_entries(&cid_entry)? {
                for arch_entry in read_dir_entries(&version_entry)? {
                    let gcid = arch_entry
                        .strip_prefix(&self.media_pool_dir)
                        .expect("walked entry is under media_pool_dir")
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    if !live.contains(&gcid) {
                        std::fs::remove_dir_all(&arch_entry).map_err(|source| StoreError::Io {
                            path: arch_entry.clone(),
                            source,
                        })?;
                    }
                }
                remove_if_empty(&version_entry)?;
            }
            remove_if_empty(&cid_entry)?;
        }
        Ok(())
    }

    pub fn add_statistics(&self, entry: StatisticsEntry) {
        self.statistics.insert(entry.time, entry);
    }

    pub fn get_statistics(&self) -> Vec<StatisticsEntry> {
        self.statistics.iter().map(|e| e.value().clone()).collect()
    }

    pub fn remove_statistics(&self, time: i64) {
        self.statistics.remove(&time);
    }

    /// Deduplicates consecutive same-series statistics entries (spec.md
    /// §4.9 `cleanupStatistics`, §8 property 8 idempotence).
    pub fn cleanup_statistics(&self) {
        let entries = self.get_statistics();
        for time in find_superseded(&entries) {
            self.remove_statistics(time);
        }
    }

    pub fn sync(&self) -> Result<(), StoreError> {
        let snapshot = DataStoreSnapshot {
            rows: self.rows.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            repo_info: self
                .repo_info
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            media_pool: self
                .media_pool
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            statistics: self
                .statistics
                .iter()
                .map(|e| (*e.key(), e.value().clone()))
                .collect(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, data).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn close(&self) -> Result<(), StoreError> {
        self.sync()
    }
}
