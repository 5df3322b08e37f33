//! Stored document shapes for principals and tokens

mod metadata;
mod principal;
mod token;

pub use metadata::Metadata;
pub use principal::{PrincipalDoc, PRINCIPAL_COLLECTION};
pub use token::{TokenDoc, TOKEN_COLLECTION};
