//! # capsule-commands
//!
//! The command surface: an authorization gate over an explicit command enum,
//! a router that turns each command into registry mutations, and the restart
//! throttle guarding gateway reloads.

pub mod authz;
pub mod restart;
pub mod router;

pub use authz::{authorize, AuthDecision, Command, Tier};
pub use restart::RestartThrottle;
pub use router::{CommandRequest, CommandResponse, CommandRouter, RouterSettings};
