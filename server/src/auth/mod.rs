//! Authentication for report and sequence routes.

mod middleware;

pub use middleware::*;
