// ABOUTME: Library root for haven-verify - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod precondition;
pub mod report;
pub mod request;
pub mod retry;
pub mod scenario;
pub mod types;
pub mod verify;
