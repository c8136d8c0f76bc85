//! Link bindings
//!
//! Glue between [`ChunkedTransport`](crate::ChunkedTransport) and one family
//! of physical links.

pub mod bus;
pub mod registry;
pub mod serial;
