//! Types shared between the diligence core and its front ends: identifiers,
//! the agent service envelope, the coordinator result schema and the error
//! taxonomy surfaced to renderers.

pub mod domain;
pub mod error;
pub mod protocol;
