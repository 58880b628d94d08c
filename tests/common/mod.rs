//! Common test utilities and helpers
//!
//! This module provides shared test infrastructure including:
//! - Request payload fixtures
//! - A repository that fails on demand
//! - API test client

#![allow(dead_code)]

pub mod fixtures;
pub mod test_app;

pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
