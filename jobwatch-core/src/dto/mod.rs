//! Data Transfer Objects for the remote job endpoints
//!
//! DTOs mirror the JSON bodies exchanged with a job backend and are
//! converted into domain types at the client boundary.

pub mod job;
