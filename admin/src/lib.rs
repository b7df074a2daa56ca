//! Admin review: a password-gated panel over the request store.

pub mod command;
pub mod export;
pub mod format;
pub mod gate;
pub mod session;

mod service;

pub use service::AdminService;
