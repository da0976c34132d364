//! Request handlers for report storage and number issuance.

mod numbers;
mod reports;

pub use numbers::*;
pub use reports::*;
