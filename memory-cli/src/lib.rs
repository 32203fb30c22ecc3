//! Admin CLI for the memory worker: a thin wrapper over its HTTP API, not a
//! second storage implementation.

pub mod client;
pub mod errors;
pub mod output;
