//! Persistence layer for the posting service.
//!
//! The core talks to storage only through the traits in [`store`]; each
//! backend translates its own engine errors into [`DatabaseError`](crate::error::DatabaseError).

pub mod memory;
pub mod models;
pub mod operations;
pub mod store;

pub use memory::InMemoryStore;
pub use models::{Post, Session, User};
pub use operations::DbOperations;
pub use store::{CredentialStore, PostStore, SessionStore};
