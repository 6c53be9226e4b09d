//! Types library for basket wrapping and NFT swaps
//!
//! Shared identifier and numeric types used by the contract layer.
//!
//! # Modules
//! - `ids`: Addresses, basket ids, swap contract ids and hashlocks
//! - `numeric`: Fixed-point amounts and timestamps
//! - `errors`: Parse errors for the above

pub mod errors;
pub mod ids;
pub mod numeric;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
}
