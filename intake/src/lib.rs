//! Customer intake: validators, the track state machine, sessions and the
//! service that ties them to the request store.

pub mod messages;
pub mod session;
pub mod validate;
pub mod workflow;

mod service;

pub use service::IntakeService;
