//! `DataInjectPackage`: a fake package that lets an operator inject extra
//! metainfo/icons into the catalog without those files existing in any real
//! archive (spec.md §4.4's "injected modifications"; grounded on
//! `original_source/src/datainjectpkg.cpp`).

use crate::package::{Package, PackageKind};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// A synthetic package whose "contents" are files discovered on disk under
/// a data-location directory, rather than extracted from an archive.
///
/// Configuration (`maintainer`, `data_location`, `arch_data_location`) is set
/// through the builder methods before the package is shared across threads;
/// `contents()` is memoized lazily and safely via `OnceCell` since it may be
/// called concurrently once the package sits behind an `Arc<dyn Package>`.
pub struct DataInjectPackage {
    name: String,
    arch: String,
    fake_prefix: String,
    maintainer: String,
    data_location: String,
    arch_data_location: String,
    description: HashMap<String, String>,
    contents: OnceCell<Vec<String>>,
}

impl DataInjectPackage {
    pub fn new(name: &str, arch: &str, prefix: &str) -> Self {
        let fake_prefix = if prefix.is_empty() { "/usr" } else { prefix };
        Self {
            name: name.to_string(),
            arch: arch.to_string(),
            fake_prefix: normalize_path(fake_prefix),
            maintainer: String::new(),
            data_location: String::new(),
            arch_data_location: String::new(),
            description: HashMap::new(),
            contents: OnceCell::new(),
        }
    }

    pub fn with_maintainer(mut self, value: impl Into<String>) -> Self {
        self.maintainer = value.into();
        self
    }

    pub fn with_data_location(mut self, value: impl Into<String>) -> Self {
        self.data_location = value.into();
        self
    }

    pub fn with_arch_data_location(mut self, value: impl Into<String>) -> Self {
        self.arch_data_location = value.into();
        self
    }

    pub fn data_location(&self) -> &str {
        &self.data_location
    }

    pub fn arch_data_location(&self) -> &str {
        &self.arch_data_location
    }

    /// Scans `data_location`/icons and `data_location`/`arch_data_location`
    /// for injectable files, building the fake-path -> local-path map once.
    fn discover(&self) -> Vec<InjectedFile> {
        if self.data_location.is_empty() || !Path::new(&self.data_location).is_dir() {
            return Vec::new();
        }

        let mut files: HashMap<String, String> = HashMap::new();

        let icon_location = Path::new(&self.data_location).join("icons");
        if icon_location.is_dir() {
            for entry in walkdir::WalkDir::new(&icon_location)
                .into_iter()
                .filter_map(Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !matches!(ext, "svg" | "svgz" | "png") {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&icon_location) else {
                    continue;
                };
                let fake_path = format!("/usr/share/icons/hicolor/{}", relative.display());
                files.insert(fake_path, path.display().to_string());
            }
        } else {
            debug!(path = %icon_location.display(), "no icons found for injected metadata");
        }

        scan_metainfo_dir(&self.data_location, &self.fake_prefix, &mut files, false);

        if !self.arch_data_location.is_empty() && Path::new(&self.arch_data_location).is_dir() {
            scan_metainfo_dir(&self.arch_data_location, &self.fake_prefix, &mut files, true);
        }

        files
            .into_iter()
            .map(|(fake_path, local_path)| InjectedFile { fake_path, local_path })
            .collect()
    }

}

/// A single discovered injectable file: its catalog-facing fake path, and
/// the real path on disk to read bytes from.
struct InjectedFile {
    fake_path: String,
    local_path: String,
}

fn scan_metainfo_dir(
    dir: &str,
    fake_prefix: &str,
    contents: &mut HashMap<String, String>,
    is_arch_override: bool,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir, error = %e, "error scanning metainfo directory");
            return;
        }
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let fake_path = format!("{fake_prefix}/share/metainfo/{basename}");
        if is_arch_override && contents.contains_key(&fake_path) {
            debug!(basename, "injected metainfo replacing generic one");
        }
        contents.insert(fake_path, path.display().to_string());
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Package for DataInjectPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "0~0"
    }

    fn arch(&self) -> &str {
        &self.arch
    }

    fn maintainer(&self) -> &str {
        &self.maintainer
    }

    fn kind(&self) -> PackageKind {
        PackageKind::Fake
    }

    fn description(&self) -> &HashMap<String, String> {
        &self.description
    }

    fn filename(&self) -> &str {
        "_local_"
    }

    fn contents(&self) -> &[String] {
        self.contents
            .get_or_init(|| {
                let mut discovered: Vec<InjectedFile> = self.discover();
                discovered.sort_by(|a, b| a.fake_path.cmp(&b.fake_path));
                discovered.into_iter().map(|f| f.fake_path).collect()
            })
            .as_slice()
    }

    fn get_file_data(&self, fname: &str) -> Vec<u8> {
        // `contents()` must run first so the lazy cache is populated; a
        // second, un-memoized discovery pass here just to resolve one path
        // would be wasteful. The common caller order (list, then fetch)
        // makes this cheap in practice: the cache is already warm.
        let _ = self.contents();
        self.discover()
            .into_iter()
            .find(|f| f.fake_path == fname)
            .and_then(|f| std::fs::read(f.local_path).ok())
            .unwrap_or_default()
    }

    fn finish(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_data_location_yields_empty_contents() {
        let pkg = DataInjectPackage::new("injected", "amd64", "/usr");
        assert!(pkg.contents().is_empty());
    }

    #[test]
    fn discovers_generic_metainfo_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.metainfo.xml"), b"<component/>").unwrap();

        let pkg = DataInjectPackage::new("injected", "amd64", "/usr")
            .with_data_location(dir.path().to_str().unwrap());

        let contents = pkg.contents();
        assert_eq!(contents, &["/usr/share/metainfo/foo.metainfo.xml".to_string()]);
        assert_eq!(pkg.get_file_data(&contents[0]), b"<component/>".to_vec());
    }

    #[test]
    fn arch_override_replaces_generic_metainfo() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.metainfo.xml"), b"generic").unwrap();
        let arch_dir = tempdir().unwrap();
        fs::write(arch_dir.path().join("foo.metainfo.xml"), b"arch-specific").unwrap();

        let pkg = DataInjectPackage::new("injected", "amd64", "/usr")
            .with_data_location(dir.path().to_str().unwrap())
            .with_arch_data_location(arch_dir.path().to_str().unwrap());

        let contents = pkg.contents();
        assert_eq!(contents.len(), 1);
        assert_eq!(pkg.get_file_data(&contents[0]), b"arch-specific".to_vec());
    }

    #[test]
    fn discovers_icons_under_fixed_hicolor_path() {
        let dir = tempdir().unwrap();
        let icons_dir = dir.path().join("icons").join("48x48");
        fs::create_dir_all(&icons_dir).unwrap();
        fs::write(icons_dir.join("foo.png"), b"PNGDATA").unwrap();

        let pkg = DataInjectPackage::new("injected", "amd64", "/usr")
            .with_data_location(dir.path().to_str().unwrap());

        let contents = pkg.contents();
        assert_eq!(contents, &["/usr/share/icons/hicolor/48x48/foo.png".to_string()]);
    }
}
