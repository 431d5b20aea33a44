//! Token primitives: stateless confirmation codes and signed access tokens.

pub mod access;
pub mod confirmation;

pub use access::{AccessClaims, AccessTokenIssuer};
pub use confirmation::ConfirmationCodeIssuer;
