//! confseal: toggle encryption of named sections inside XML configuration files.
//!
//! A run resolves a fixed list of slash-delimited section paths against a loaded
//! document, flips each section into the requested protection state and commits the
//! document at most once.
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod document;
pub mod edit_plan;
pub mod error;
pub mod formats;
pub mod input;
pub mod orchestrator;
pub mod processor;
pub mod providers;
pub mod report;
pub mod resolver;
pub mod section;

pub use error::{Error, Result};

#[cfg(test)]
#[path = "tests/fixtures.rs"]
mod fixtures;
