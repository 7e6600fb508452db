//! Authenticated identity: bearer-token claims and the request principal.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod token;

pub use principal::Principal;
pub use token::{issue_token, verify_token, Claims};
