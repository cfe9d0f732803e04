//! Query description types.
//!
//! Everything here is constructed per request (usually deserialized from a
//! JSON payload) and consumed by [`crate::compiler`].

pub mod conditions;
pub mod joins;
pub mod operators;
pub mod payload;
pub mod values;

pub use conditions::*;
pub use joins::*;
pub use operators::*;
pub use payload::*;
pub use values::*;
