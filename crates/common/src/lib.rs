//! Common types and errors shared across `column-protect` crates.
//!
//! This crate carries no crypto or batch dependencies: it only describes
//! schemas, stream roles, and the error taxonomy.

pub mod error;
pub mod stream;
pub mod types;

pub use error::ProtectError;
pub use stream::StreamKind;
pub use types::{TypeDescription, TypeKind};
