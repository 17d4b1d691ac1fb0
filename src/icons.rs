//! `IconHandler`: the collaborator the engine hands to each processing
//! phase so per-package extraction can resolve an application's icon
//! against a theme and a pool of candidate packages.
//!
//! The actual icon lookup/rendering (theme traversal, scaling, pixbuf
//! decoding) lives in the extractor and is out of scope here (spec.md §1);
//! this type only carries the inputs the engine assembles for it
//! (`getIconCandidatePackages`, spec.md §4.8) through to that black box.

use crate::package::Package;
use crate::store::ContentsStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub struct IconHandler {
    cstore: Arc<ContentsStore>,
    media_pool_dir: PathBuf,
    candidate_pkgs: HashMap<String, Arc<dyn Package>>,
    icon_theme: Option<String>,
}

impl IconHandler {
    pub fn new(
        cstore: Arc<ContentsStore>,
        media_pool_dir: PathBuf,
        candidate_pkgs: HashMap<String, Arc<dyn Package>>,
        icon_theme: Option<String>,
    ) -> Self {
        Self { cstore, media_pool_dir, candidate_pkgs, icon_theme }
    }

    pub fn contents_store(&self) -> &ContentsStore {
        &self.cstore
    }

    pub fn media_pool_dir(&self) -> &std::path::Path {
        &self.media_pool_dir
    }

    pub fn candidate_packages(&self) -> &HashMap<String, Arc<dyn Package>> {
        &self.candidate_pkgs
    }

    pub fn icon_theme(&self) -> Option<&str> {
        self.icon_theme.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn exposes_constructed_fields() {
        let dir = tempdir().unwrap();
        let cstore = Arc::new(ContentsStore::open(dir.path().join("contents.json")).unwrap());
        let handler = IconHandler::new(
            cstore,
            dir.path().join("pool"),
            HashMap::new(),
            Some("hicolor".to_string()),
        );
        assert_eq!(handler.icon_theme(), Some("hicolor"));
        assert!(handler.candidate_packages().is_empty());
    }
}
