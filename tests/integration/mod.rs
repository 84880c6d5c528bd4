//! Integration test suite for taskloop.
//!
//! These tests drive the public Scheduler API end to end with scripted
//! executor and generator capabilities. No model is called, so they are
//! safe to run in CI.
//!
//! # Test Categories
//!
//! - `scheduler_e2e`: Loop behavior, ordering and termination
//! - `failure`: Capability failures and partial progress
//! - `cancellation`: Cooperative cancellation and the single-run guard


mod failure;
mod scheduler_e2e;
