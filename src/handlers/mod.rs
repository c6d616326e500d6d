//! HTTP handlers for registered endpoints.

pub mod endpoint;
pub use endpoint::handle;
