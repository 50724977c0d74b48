//! Unit tests for the infraguard CLI
//!
//! These tests use mocked ports and run fast without spawning the
//! provisioning tool or touching the network.

mod helpers;
mod lifecycle_guard;
mod scenario_runner;
