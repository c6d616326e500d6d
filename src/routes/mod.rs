//! Route assembly.

pub mod common;
pub mod endpoint;

pub use common::common_routes;
pub use endpoint::endpoint_routes;
