//! CLI integration tests against an isolated store and registry.

mod common;

mod build_tests;
mod graph_tests;
