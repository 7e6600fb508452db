//! Authorization: permission resolution over the policy graph and the single
//! gate every filesystem handler goes through.

mod gate;
mod resolver;

pub use gate::{authorize, Decision, DenyReason, Operation};
pub use resolver::{effective_permissions, union_roles};
