//! jobwatch core
//!
//! Core types shared by the jobwatch crates.
//!
//! This crate contains:
//! - Domain types: job identity, status and status snapshots
//! - DTOs: wire representations of the job status and submission endpoints

pub mod domain;
pub mod dto;

pub use domain::job::{JobHandle, JobId, JobStatus, UnknownStatus};
