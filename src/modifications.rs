//! Per-suite injected modifications: an operator-authored overlay (currently
//! component-removal requests) loaded from a `modifications.json` file
//! alongside a suite's configuration (spec.md §4.6, §4.8 "load injected
//! modifications; if load fails, fatal per suite").

use crate::error::StoreError;
use crate::hints;
use crate::result::GeneratorResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ModificationsFile {
    #[serde(default)]
    remove_components: Vec<String>,
}

/// Suite-scoped overlay applied on top of whatever the extractor produces.
#[derive(Debug, Clone, Default)]
pub struct InjectedModifications {
    removed_cids: Vec<String>,
}

impl InjectedModifications {
    /// Builds an overlay directly from a set of component IDs to remove,
    /// bypassing the on-disk file — used by callers (and tests) that already
    /// have removal requests in hand.
    pub fn with_removed_cids(removed_cids: Vec<String>) -> Self {
        Self { removed_cids }
    }

    /// Loads `<suite_config_dir>/<suite>/modifications.json`. A missing file
    /// is not an error (empty overlay); a malformed one is, and per spec.md
    /// §4.8 that failure is fatal for the whole suite.
    pub fn load_for_suite(suite_config_dir: &Path, suite: &str) -> Result<Self, StoreError> {
        let path = suite_config_dir.join(suite).join("modifications.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed: ModificationsFile = serde_json::from_slice(&data)?;
        Ok(Self { removed_cids: parsed.remove_components })
    }

    pub fn has_removed_components(&self) -> bool {
        !self.removed_cids.is_empty()
    }

    /// Strips any component whose cid matches a removal request and records
    /// a `component-removed` hint for it (spec.md §4.6 step 4).
    pub fn add_removal_requests_to_result(&self, result: &mut GeneratorResult) {
        for cid in &self.removed_cids {
            if let Some(pos) = result.components.iter().position(|c| c.cid() == Some(cid.as_str())) {
                result.components.remove(pos);
            }
            let mut vars = HashMap::new();
            vars.insert("cid".to_string(), cid.clone());
            result.add_hint(hints::make_hint("component-removed", vars));
        }
    }
}
