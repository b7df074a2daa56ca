pub mod env_config;
pub mod error;
pub mod events;
pub mod http;
pub mod misc;
