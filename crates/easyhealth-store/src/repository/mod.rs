//! # Repository Module
//!
//! SQL lives here and nowhere else.
//!
//! ## Available Repositories
//!
//! - [`CredentialRepository`] - key/value rows backing the credential store

pub mod credential;

pub use credential::CredentialRepository;
