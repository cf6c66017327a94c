//! Authentication and authorization for Accolade.
//!
//! - [`PermissionCache`] memoises role → permission resolution per user.
//! - [`AuthorizationService`] answers permission and role checks through it.
//! - [`TokenService`] signs and verifies session tokens.
//! - [`Authenticator`] turns credentials into a session.
//! - [`Gate`] combines token parsing with a permission check.

pub mod authz;
pub mod cache;
pub mod gate;
pub mod login;
pub mod password;
pub mod token;

pub use authz::AuthorizationService;
pub use cache::{PermissionCache, Sweeper};
pub use gate::Gate;
pub use login::{Authenticator, LoginOutcome};
pub use password::{hash_password, verify_password};
pub use token::{Claims, IssuedToken, TokenService};
