pub mod config;
pub mod error;
pub mod identity;
pub mod store;
pub mod telemetry;
pub mod workflows;
