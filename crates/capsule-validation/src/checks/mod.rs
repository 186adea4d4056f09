//! The validators, one module per concern.

pub mod config;
pub mod cross_ref;
pub mod jobs;
pub mod spam;
pub mod status;
pub mod structure;

pub use jobs::JobRegistry;
