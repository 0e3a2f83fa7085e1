//! Authentication for the posting service.
//!
//! Registration and password verification, opaque session token issuance,
//! and bearer-token resolution for protected endpoints.

pub mod guard;
pub mod handlers;
pub mod password;
pub mod service;
pub mod token;

pub use guard::{AccessGuard, AuthenticatedUser};
pub use service::{AuthService, IssuedSession};
