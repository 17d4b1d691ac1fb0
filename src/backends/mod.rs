//! Concrete `Package`/`PackageIndex` backends.
//!
//! Only the `dummy` backend (used for integration tests) ships here; real
//! backends (Debian, RPM, ...) are out of scope (spec.md Non-goals).

pub mod dummy;
