//! Host-side integration tests for matrix-core
//!
//! Run with `cargo test -p matrix-tests`; the bench with
//! `cargo bench -p matrix-tests`.

mod adapter_tests;
mod debounce_tests;
mod keyboard_tests;
mod scheduler_tests;
