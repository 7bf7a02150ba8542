//! Core domain types
//!
//! These types describe a remote unit of work as seen by a watcher: its
//! identity, its status vocabulary and the snapshots produced by each query.

pub mod job;
