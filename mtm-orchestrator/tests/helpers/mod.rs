//! Test Helper Utilities
//!
//! Shared utilities for testing mtm-orchestrator

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_gateway;

// Re-export commonly used items
pub use fixtures::{album, album_with_year, candidate, test_state, wait_for, wait_for_status};
pub use mock_gateway::{Call, MockGateway};
