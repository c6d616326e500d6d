//! Response states and the templates they render.

pub mod state;
pub mod template;

pub use state::*;
pub use template::*;
