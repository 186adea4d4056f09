//! # capsule-validation
//!
//! The check engine: a fixed, ordered list of validators over a tenant's
//! artifacts, its registry entry, and the generated topic config. Each
//! validator returns severity-tagged findings; the engine aggregates them into
//! a [`CheckReport`].

pub mod checks;
pub mod engine;
pub mod markdown;

pub use checks::jobs::JobRegistry;
pub use engine::{CheckContext, CheckEngine, CheckReport, CheckSettings, Validator};
