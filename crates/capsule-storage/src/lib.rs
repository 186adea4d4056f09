//! # capsule-storage
//!
//! Durable store for the Capsule registry: one JSON document per workspace,
//! guarded by a companion lock file and replaced by atomic rename.
//!
//! - `read()` is lock-free, migrates in memory, and quarantines bad entries.
//! - `mutate()` serializes every writer through an exclusive, bounded lock.
//! - `config_artifact` renders the machine-generated topic config and the
//!   registry hash used for drift detection.
//! - `artifacts` is the filesystem-backed tenant artifact source.

pub mod artifacts;
pub mod atomic;
pub mod config_artifact;
pub mod lock;
pub mod migrations;
pub mod store;

pub use artifacts::FsArtifactSource;
pub use config_artifact::{registry_hash, GeneratedConfig};
pub use store::{RegistryStore, Snapshot};
