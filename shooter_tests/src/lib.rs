//! `shooter_tests`
//!
//! Socket-level integration tests for the server live in `tests/`. This crate
//! only exists to host them inside the workspace.
