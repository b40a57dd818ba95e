//! Core object model.
//!
//! Values, classes and instances that delegation operates on, plus the
//! error type, protocol dispatch and logging setup shared by the crate.

pub mod builtins;
pub mod error;
pub mod logging;
pub mod object;
pub mod protocol;
pub mod value;
