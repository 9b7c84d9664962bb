//! Top-level command drivers
//!
//! Each driver wires discovery, the extraction pipeline and one
//! downstream sink together. The binary entry point stays a thin
//! dispatcher over these.

pub mod find_lost;
pub mod full;
pub mod replay;
pub mod split;
