//! Shared utilities for journal-core integration tests.
//!
//! `TestHarness` owns a temp directory with a file-backed database and a
//! media root, and can open a full `AppState` on top of them.

pub mod harness;

pub use harness::{png_bytes, TestHarness};
