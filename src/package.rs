//! The `Package` contract: a capability set implemented by backends, not an
//! inheritance tree (see DESIGN.md / spec.md §9 "Polymorphic backend").

use std::collections::HashMap;

/// Type of a package the engine can process.
///
/// Distinguishes "real" packages from virtual/fake ones used internally
/// (e.g. [`crate::datainject::DataInjectPackage`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageKind {
    Unknown,
    #[default]
    Physical,
    Fake,
}

/// GStreamer codec capabilities a package may advertise.
///
/// A package with no interesting desktop/metainfo paths but a non-empty
/// `GStreamer` value is still considered "interesting" (spec.md §4.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GStreamer {
    pub decoders: Vec<String>,
    pub encoders: Vec<String>,
    pub elements: Vec<String>,
    pub uri_sinks: Vec<String>,
    pub uri_sources: Vec<String>,
}

impl GStreamer {
    pub fn is_not_empty(&self) -> bool {
        !(self.decoders.is_empty()
            && self.encoders.is_empty()
            && self.elements.is_empty()
            && self.uri_sinks.is_empty()
            && self.uri_sources.is_empty())
    }
}

/// The package-id: `name/version/arch`, unique per backend across all
/// suites/sections (spec.md GLOSSARY).
pub fn pkid(name: &str, version: &str, arch: &str) -> String {
    format!("{name}/{version}/{arch}")
}

/// Splits a pkid back into its three components.
///
/// Mirrors the original engine's `forgetPackage` slash-count check: a string
/// is only treated as a pkid if it contains *exactly* two `/` separators.
pub fn split_pkid(id: &str) -> Option<(&str, &str, &str)> {
    if id.matches('/').count() != 2 {
        return None;
    }
    let mut parts = id.splitn(3, '/');
    let name = parts.next()?;
    let version = parts.next()?;
    let arch = parts.next()?;
    Some((name, version, arch))
}

/// A distribution package as seen by the generator.
///
/// Implementations are capability sets: a `Fake` package like
/// `DataInjectPackage` implements every method but sources its `contents`
/// and file data from a local directory tree instead of an archive.
pub trait Package: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn arch(&self) -> &str;
    fn maintainer(&self) -> &str;

    /// Whether this package actually exists in the repository, or is a
    /// synthetic/fake package used internally. Defaults to `Physical`.
    fn kind(&self) -> PackageKind {
        PackageKind::Physical
    }

    /// Localized summary strings, keyed by locale. Empty by default.
    fn summary(&self) -> &HashMap<String, String> {
        static EMPTY: once_cell::sync::Lazy<HashMap<String, String>> =
            once_cell::sync::Lazy::new(HashMap::new);
        &EMPTY
    }

    /// Localized description strings, keyed by locale.
    fn description(&self) -> &HashMap<String, String>;

    /// Local filename, used only for issue reporting (never read directly;
    /// file contents always go through [`Package::get_file_data`]).
    fn filename(&self) -> &str;

    /// Ordered sequence of payload file paths contained in this package.
    /// Idempotent-memoized: the first call may do archive I/O, subsequent
    /// calls must return the same cached sequence.
    fn contents(&self) -> &[String];

    /// Retrieves the raw bytes of a single file from the package's payload.
    fn get_file_data(&self, fname: &str) -> Vec<u8>;

    /// Releases temporary extraction state without invalidating the package
    /// (it may be reopened later). No-op by default.
    fn cleanup_temp(&self) {}

    /// Closes the package permanently; no further file data will be
    /// requested from it.
    fn finish(&self);

    /// GStreamer codec capability advertised by this package, if any. `None`
    /// by default.
    fn gst(&self) -> Option<GStreamer> {
        None
    }

    /// Backend-specific desktop-file translation lookup (only meaningfully
    /// used by locale-aware backends). Empty by default.
    fn desktop_file_translations(&self, _desktop_text: &str) -> HashMap<String, String> {
        HashMap::new()
    }

    fn has_desktop_file_translations(&self) -> bool {
        false
    }

    /// Unique identifier for this package: `name/version/arch`.
    fn id(&self) -> String {
        pkid(self.name(), self.version(), self.arch())
    }

    /// A package is valid if it has a non-empty name, version, and arch.
    fn is_valid(&self) -> bool {
        !self.name().is_empty() && !self.version().is_empty() && !self.arch().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkid_format() {
        assert_eq!(pkid("foo", "1.0", "amd64"), "foo/1.0/amd64");
    }

    #[test]
    fn split_pkid_roundtrip() {
        assert_eq!(split_pkid("foo/1.0/amd64"), Some(("foo", "1.0", "amd64")));
    }

    #[test]
    fn split_pkid_rejects_wrong_shape() {
        assert_eq!(split_pkid("foo/1.0"), None);
        assert_eq!(split_pkid("foo/1.0/amd64/extra"), None);
        assert_eq!(split_pkid("foo"), None);
    }

    #[test]
    fn gstreamer_empty_by_default() {
        assert!(!GStreamer::default().is_not_empty());
    }

    #[test]
    fn gstreamer_nonempty_with_single_field() {
        let gst = GStreamer {
            decoders: vec!["vorbisdec".into()],
            ..Default::default()
        };
        assert!(gst.is_not_empty());
    }
}
