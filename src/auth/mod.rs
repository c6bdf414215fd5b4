pub mod identity;
pub mod jwks;

pub use identity::{ExternalIdentity, IdentityResolver, KindeIdentityResolver};
pub use jwks::{JwksClient, JwtVerifier, TokenVerifier, VerifyError};
