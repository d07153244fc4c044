//! HTTP handlers for the server.

pub mod editing;
pub mod layout;
