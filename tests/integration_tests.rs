//! Integration tests for rust-schemadiff
//!
//! This file serves as the entry point for all integration tests.

#[path = "common/mod.rs"]
mod common;

#[path = "integration/pipeline_tests.rs"]
mod pipeline_tests;

#[path = "integration/cli_tests.rs"]
mod cli_tests;
