//! Integration tests for the exchange portal
//!
//! These tests drive the API router and the services against the in-memory
//! and SQLite repositories with all middleware.

mod api_tests;
