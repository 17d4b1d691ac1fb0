//! Error types for each stage of the generation pipeline.
//!
//! One enum per concern, following the shape of the store/index/engine split
//! rather than a single catch-all error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by `ContentsStore`/`DataStore` operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error accessing store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize store row: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed package id '{0}', expected name/version/arch")]
    MalformedPkid(String),
}

/// Errors raised by a `PackageIndex` implementation.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("repository manifest for {suite}/{section} [{arch}] could not be parsed: {reason}")]
    ManifestParse {
        suite: String,
        section: String,
        arch: String,
        reason: String,
    },

    #[error("package file lookup is not supported by this backend")]
    Unsupported,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the orchestrating `Engine`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("suite '{0}' was not found")]
    SuiteNotFound(String),

    #[error("suite '{0}' is marked as immutable, no changes are allowed")]
    SuiteImmutable(String),

    #[error("suite '{0}' has no sections defined")]
    NoSections(String),

    #[error("suite '{0}' has no architectures defined")]
    NoArchitectures(String),

    #[error("section '{section}' does not exist in suite '{suite}'")]
    SectionNotInSuite { suite: String, section: String },

    #[error("could not resolve file '{file}' via backend: {reason}")]
    FileResolution { file: String, reason: String },

    #[error("unable to load injected modifications for suite '{0}': {1}")]
    InjectedModifications(String, String),

    #[error("failed to build worker thread pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
