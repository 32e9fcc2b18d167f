//! WEALTHDESK: portfolio analytics, goal planning and advisor copilot
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod analytics;
pub mod recommend;
pub mod orders;
pub mod storage;
pub mod data;
pub mod copilot;
pub mod dashboard;
