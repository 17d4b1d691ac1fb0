//! `GeneratorResult`: the output of the (external) component data extractor,
//! and the `ComponentExtractor` contract it is produced through.
//!
//! The real extractor — reading a desktop entry or metainfo file and
//! emitting components — is explicitly out of scope (spec.md §1): it is
//! treated as a black-box `extract(pkg) -> GeneratorResult`. This module
//! defines the shape of that black box and a `NullExtractor` used by tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single application-catalog component extracted from a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Global component ID: a content-addressed identifier under which this
    /// component's media is stored in the pool. Its first path segment is
    /// the plain component ID (`cid`).
    pub gcid: String,

    /// The rendered metadata document (an XML or YAML fragment) for this
    /// component, in the catalog's configured format.
    pub metadata_xml: String,
}

impl Component {
    /// The plain component ID: the first path segment of `gcid`.
    pub fn cid(&self) -> Option<&str> {
        self.gcid.split('/').next().filter(|s| !s.is_empty())
    }
}

/// A structured issue note attached to a pkid (spec.md GLOSSARY "Hint").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hint {
    pub tag: String,
    pub severity: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub vars: HashMap<String, String>,
}

/// The per-package result of running the (external) extractor.
///
/// Invariant: every `Component` has a `gcid` derived from its content
/// digest; the extractor is responsible for this, the engine only threads
/// the result through to the stores.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratorResult {
    pub pkid: String,
    pub components: Vec<Component>,
    pub hints: Vec<Hint>,
}

impl GeneratorResult {
    pub fn new(pkid: impl Into<String>) -> Self {
        Self {
            pkid: pkid.into(),
            components: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn components_count(&self) -> usize {
        self.components.len()
    }

    pub fn hints_count(&self) -> usize {
        self.hints.len()
    }

    /// Whether this result carries no components (the package is ignored
    /// from the generator's point of view, though it may still have hints).
    pub fn is_ignored(&self) -> bool {
        self.components.is_empty()
    }

    pub fn add_hint(&mut self, hint: Hint) {
        self.hints.push(hint);
    }
}

/// The black-box component extractor contract (spec.md §1).
///
/// A real implementation parses desktop entries / AppStream metainfo files
/// out of a package's payload; this crate ships only [`NullExtractor`],
/// sufficient to drive the engine's tests end-to-end.
pub trait ComponentExtractor: Send + Sync {
    fn extract(&self, pkg: &dyn crate::package::Package) -> GeneratorResult;
}

/// An extractor that classifies a package as interesting using the same
/// path-prefix/GStreamer rule the engine itself uses for seeding, and
/// synthesizes one trivial component per interesting package. Good enough
/// to exercise the full pipeline in tests without a real metainfo parser.
#[derive(Debug, Default)]
pub struct NullExtractor;

impl ComponentExtractor for NullExtractor {
    fn extract(&self, pkg: &dyn crate::package::Package) -> GeneratorResult {
        let pkid = pkg.id();
        let mut result = GeneratorResult::new(&pkid);
        if crate::engine::seed::package_is_interesting(pkg) {
            let cid = format!("{}.desktop", pkg.name());
            let gcid = format!("{}/{}/{}", cid, pkg.version(), pkg.arch());
            result.components.push(Component {
                gcid,
                metadata_xml: format!("<component><id>{cid}</id></component>"),
            });
        }
        result
    }
}
