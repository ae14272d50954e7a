//! # auth-adapters
//!
//! `AccessGuard` implementations for privileged routes.

pub mod bearer;

pub use bearer::BearerSecret;
