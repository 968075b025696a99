//! qtmd-lib: recipe engine for the QtMarkdown library
//!
//! The crate turns a package recipe into a verified, installed package:
//! - `recipe`: metadata, options, requirements and artifacts of a package
//! - `options`: per-platform option schemas and override resolution
//! - `graph`: dependency graph resolution against a `registry`
//! - `driver`: generate/configure/build/install state machine over a `tool`
//! - `artifact`: declared artifacts and their verification
//! - `pipeline`: the whole sequence, with caching and locking from `build`

pub mod artifact;
pub mod build;
pub mod consts;
pub mod driver;
pub mod export;
pub mod generate;
pub mod graph;
pub mod options;
pub mod pipeline;
pub mod placeholder;
pub mod platform;
pub mod recipe;
pub mod registry;
pub mod settings;
pub mod tool;
pub mod util;
