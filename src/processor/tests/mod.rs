//! Tests for the processor module
//!
//! Exercise per-file extraction and the whole study pipeline against
//! small export trees built in temporary directories.

pub mod extraction_tests;
