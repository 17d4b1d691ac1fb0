//! `ContentsStore`: durable map from pkid to the package's file list
//! (spec.md §4.2), seeded once per run by `engine::seed::seed_contents_data`
//! and consulted afterwards to decide which packages are worth full
//! extraction.
//!
//! Modeled on the DashMap + JSON-index persistence shape of a concurrent
//! content-addressed store: an in-memory `DashMap` for lock-free concurrent
//! reads/writes during a run, flushed to a single JSON file on `sync`/`close`.

use crate::error::StoreError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct ContentsRow {
    contents: Vec<String>,
    icon_files: Vec<String>,
}

/// A durable, concurrently-accessible map from pkid to file listing.
pub struct ContentsStore {
    path: PathBuf,
    rows: DashMap<String, ContentsRow>,
}

impl ContentsStore {
    /// Opens (or creates) the store at `path`, loading any existing rows.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let rows: DashMap<String, ContentsRow> = if path.exists() {
            let data = std::fs::read(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if data.is_empty() {
                DashMap::new()
            } else {
                let map: std::collections::HashMap<String, ContentsRow> =
                    serde_json::from_slice(&data)?;
                map.into_iter().collect()
            }
        } else {
            DashMap::new()
        };
        Ok(Self { path, rows })
    }

    /// Records (or replaces) the contents/icon-file lists for `pkid`.
    pub fn set_contents(
        &self,
        pkid: &str,
        contents: Vec<String>,
        icon_files: Vec<String>,
    ) {
        self.rows
            .insert(pkid.to_string(), ContentsRow { contents, icon_files });
    }

    pub fn get_contents(&self, pkid: &str) -> Option<Vec<String>> {
        self.rows.get(pkid).map(|row| row.contents.clone())
    }

    pub fn get_icon_files(&self, pkid: &str) -> Option<Vec<String>> {
        self.rows.get(pkid).map(|row| row.icon_files.clone())
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

    pub fn get_package_id_set(&self) -> HashSet<String> {
        self.rows.iter().map(|e| e.key().clone()).collect()
    }

    pub fn contents_count(&self) -> usize {
        self.rows.len()
    }

    /// Flushes the current state to disk as a single JSON document.
    pub fn sync(&self) -> Result<(), StoreError> {
        let owned: std::collections::HashMap<String, ContentsRow> = self
            .rows
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let data = serde_json::to_vec_pretty(&owned)?;
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
