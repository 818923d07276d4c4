//! contacts-api - A multi-tenant contacts management backend
//!
//! This crate provides the authentication and session-integrity core:
//! access/refresh token issuance and verification, email-verification and
//! password-reset flows, server-side revocation, and a read-through session
//! cache kept consistent with every mutating operation.

pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod email;
pub mod error;
pub mod models;
pub mod server;
