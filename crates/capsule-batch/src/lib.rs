//! # capsule-batch
//!
//! Periodic passes over every tenant: a pure eligibility filter, then a
//! per-tenant unit of work inside an error boundary, sequential paced
//! delivery, and a single reconciling registry mutation.

pub mod composer;
pub mod eligibility;
pub mod orchestrator;
pub mod pacer;
pub mod summary;

pub use composer::{PlainComposer, ReportComposer};
pub use eligibility::{eligible, EligibilityPolicy, EligibilityResult, PassKind, SkipReason};
pub use orchestrator::{BatchOrchestrator, BatchSettings};
pub use pacer::DeliveryPacer;
pub use summary::PassSummary;
