//! Request extractors for the Podqueue API

pub mod auth;

pub use auth::AuthUser;
