//! Delegation on top of the object model.
//!
//! - [`Delegator`]: one forwarding attribute, declared directly in a class body
//! - [`delegate`]: a decorator that installs delegators for a list of member names

pub mod decorator;
pub mod delegator;

pub use decorator::{Decorator, delegate};
pub use delegator::{Delegator, SELF_HOST};
