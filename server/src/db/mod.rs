//! Database module for PostgreSQL persistence.

mod pool;
mod reports;
mod sequence;

pub use pool::*;
pub use reports::*;
pub use sequence::*;
