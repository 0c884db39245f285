//! Types shared between the API surface and the database layer.

pub mod ballot;
pub mod slate;
