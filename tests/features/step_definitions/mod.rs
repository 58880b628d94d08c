//! Step definitions for Cucumber scenarios

pub mod audit_steps;
pub mod common_steps;
