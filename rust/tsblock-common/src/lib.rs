//! Core definitions (error types and validation helpers), relied upon by all tsblock-* crates.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
