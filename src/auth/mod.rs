pub mod handlers;
pub mod provider;
pub mod redirect;
pub mod session;

pub use provider::{HttpIdentityProvider, Identity, IdentityProvider};
