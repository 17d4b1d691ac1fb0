//! Configuration entities: `Suite`, `Config`, the icon size policy, and the
//! catalog output format selector (spec.md §3/§6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A named corpus with sections and architectures (spec.md §3 "Suite").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    /// A base suite whose packages only contribute content listings, never
    /// components (spec.md §4.4 step 3).
    #[serde(default)]
    pub base_suite: Option<String>,
    pub sections: Vec<String>,
    pub architectures: Vec<String>,
    #[serde(default)]
    pub extra_metainfo_dir: Option<PathBuf>,
    #[serde(default)]
    pub icon_theme: Option<String>,
    #[serde(default)]
    pub data_priority: i32,
    #[serde(default)]
    pub is_immutable: bool,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_suite: None,
            sections: Vec::new(),
            architectures: Vec::new(),
            extra_metainfo_dir: None,
            icon_theme: None,
            data_priority: 0,
            is_immutable: false,
        }
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.iter().any(|s| s == section)
    }
}

/// The rendered catalog's metadata format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Xml,
    Yaml,
}

impl DataType {
    pub fn extension(self) -> &'static str {
        match self {
            DataType::Xml => "xml",
            DataType::Yaml => "yml",
        }
    }
}

/// A `(size, scale)` icon tier, e.g. 64x64 at `@2` HiDPI scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IconSize {
    pub size: u32,
    pub scale: u32,
}

impl IconSize {
    pub fn new(size: u32, scale: u32) -> Self {
        Self { size, scale }
    }

    /// The tag used in `icons-<tag>.tar.gz` / pool subdirectory names.
    pub fn tag(&self) -> String {
        if self.scale <= 1 {
            format!("{0}x{0}", self.size)
        } else {
            format!("{0}x{0}@{1}", self.size, self.scale)
        }
    }
}

/// What the generator does with a configured icon tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IconState {
    /// Extracted and cached locally; included in tarball export.
    Cached,
    /// Not generated at all.
    Ignored,
    /// Left to be fetched from a remote icon theme at display time.
    RemoteOnly,
}

/// Maps each configured icon tier to its handling policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IconPolicy {
    states: HashMap<IconSize, IconState>,
}

impl IconPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, icon: IconSize, state: IconState) {
        self.states.insert(icon, state);
    }

    pub fn state_of(&self, icon: IconSize) -> IconState {
        self.states.get(&icon).copied().unwrap_or(IconState::Ignored)
    }

    /// All configured tiers whose state is `Cached` (spec.md §4.7
    /// `exportIconTarballs`: "whose state is cached, not Ignored or
    /// RemoteOnly").
    pub fn cached_tiers(&self) -> Vec<IconSize> {
        self.states
            .iter()
            .filter(|(_, state)| **state == IconState::Cached)
            .map(|(size, _)| *size)
            .collect()
    }
}

/// Feature toggles affecting catalog head fields and export layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// When set, per-suite directories materialize hardlinked copies from
    /// the content-addressed pool (spec.md GLOSSARY "Immutable suites").
    pub immutable_suites: bool,
    /// When set (and a media base URL is configured), the catalog head
    /// carries a `media_baseurl` attribute.
    pub store_screenshots: bool,
    /// When set, the catalog head carries an ISO-8601 `time` attribute.
    pub metadata_timestamps: bool,
}

/// Top-level generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub workspace_dir: PathBuf,
    pub suites: Vec<Suite>,
    pub data_type: DataType,
    #[serde(default)]
    pub icon_policy: IconPolicy,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub media_base_url: Option<String>,
    /// Auxiliary sections always unioned into icon-candidate package sets
    /// (spec.md §9 Open Question: moved out of code and into configuration).
    #[serde(default = "default_icon_candidate_sections")]
    pub icon_candidate_sections: Vec<String>,
    /// Catalog format version string emitted in the `version`/`Version`
    /// catalog head attribute (spec.md §6). Not otherwise specified by the
    /// format; defaults to the AppStream collection-metadata version this
    /// generator targets.
    #[serde(default = "default_format_version")]
    pub format_version: String,
}

fn default_icon_candidate_sections() -> Vec<String> {
    vec!["main".into(), "universe".into(), "core".into(), "extra".into()]
}

fn default_format_version() -> String {
    "0.14".to_string()
}

impl Config {
    pub fn new(project_name: impl Into<String>, workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            workspace_dir: workspace_dir.into(),
            suites: Vec::new(),
            data_type: DataType::Xml,
            icon_policy: IconPolicy::new(),
            features: FeatureFlags::default(),
            media_base_url: None,
            icon_candidate_sections: default_icon_candidate_sections(),
            format_version: default_format_version(),
        }
    }

    pub fn cache_root_dir(&self) -> PathBuf {
        self.workspace_dir.join("cache")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.cache_root_dir().join("tmp")
    }

    pub fn media_pool_dir(&self) -> PathBuf {
        self.workspace_dir.join("media").join("pool")
    }

    pub fn media_suite_dir(&self, suite: &str) -> PathBuf {
        self.workspace_dir.join("media").join(suite)
    }

    pub fn data_dir(&self, suite: &str, section: &str) -> PathBuf {
        self.workspace_dir.join("data").join(suite).join(section)
    }

    pub fn hints_dir(&self, suite: &str, section: &str) -> PathBuf {
        self.workspace_dir.join("hints").join(suite).join(section)
    }

    /// Suite-level hints root, holding `hint-definitions.json` (spec.md
    /// §4.7 step 5), shared across all of the suite's sections.
    pub fn hints_suite_root_dir(&self, suite: &str) -> PathBuf {
        self.workspace_dir.join("hints").join(suite)
    }

    /// Root directory under which each suite's `modifications.json` lives
    /// (spec.md §4.8 "load injected modifications").
    pub fn suite_config_dir(&self) -> PathBuf {
        self.workspace_dir.join("suites")
    }

    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.suites.iter().find(|s| s.name == name)
    }

    /// `origin = lower("<project>-<suite>-<section>")` (spec.md §6).
    pub fn origin(&self, suite: &str, section: &str) -> String {
        format!("{}-{}-{}", self.project_name, suite, section).to_lowercase()
    }

    pub fn media_base_url_for(&self, suite: &str) -> Option<String> {
        if !self.features.store_screenshots {
            return None;
        }
        let base = self.media_base_url.as_ref()?;
        if base.is_empty() {
            return None;
        }
        let tail = if self.features.immutable_suites { suite } else { "pool" };
        Some(format!("{}/{}", base.trim_end_matches('/'), tail))
    }
}
