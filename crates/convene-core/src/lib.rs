//! convene-core — shared types, configuration, and transaction identifiers.
//! All other Convene crates depend on this one.

pub mod config;
pub mod identity;
pub mod txid;

pub use identity::{EnrollmentMaterial, Identity, IdentityRole};
pub use txid::TxId;
