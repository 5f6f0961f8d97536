//! Packyard - package registry that builds on demand
//!
//! Resolves packages and version tags of a package repository, builds each
//! (package, version) once with the packaging tool inside a disposable
//! container, and serves the stored artifacts over HTTP.

pub mod audit;
pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod resolve;
pub mod server;
pub mod store;
pub mod ui;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PackyardError, PackyardResult};
