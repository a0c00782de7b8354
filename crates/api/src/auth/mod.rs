//! Token validation.
//!
//! - [`jwt`] -- HS256 access-token claims, validation, and a token minting
//!   helper used by tooling and tests.

pub mod jwt;
