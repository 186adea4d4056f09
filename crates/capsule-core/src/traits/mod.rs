//! Collaborator seams: time, outbound delivery, tenant artifacts, gateway.

pub mod artifact_source;
pub mod clock;
pub mod delivery;
pub mod gateway;

pub use artifact_source::ArtifactSource;
pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery::DeliveryChannel;
pub use gateway::GatewayControl;
