//! Build dependency collection, PCH task generation and indexer scheduling
//! for C/C++ code intelligence.
//!
//! The pipeline runs in stages:
//! - [`project`] turns compilation databases into project parts
//! - [`dependencies`] collects the include graph and consulted macros of a part
//! - [`pch`] splits it into a system and a project precompiled header task
//! - [`indexer`] queues header builds and per-file indexing on bounded workers
//!
//! [`pipeline::Pipeline`] wires all of them together for one run.

pub mod cache;
pub mod dependencies;
pub mod error;
pub mod indexer;
pub mod io;
pub mod logging;
pub mod pch;
pub mod pipeline;
pub mod project;

#[cfg(test)]
mod test_utils;
