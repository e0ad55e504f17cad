//! # contiguity
//!
//! Host-side pieces of the contiguity learner: configuration, the action
//! catalog, tree rendering and the CLI. The engine itself lives in
//! `contiguity-core`.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod render;
