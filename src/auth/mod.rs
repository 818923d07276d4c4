//! Authentication system for contacts-api
//!
//! This module provides authentication and authorization functionality:
//! - Password hashing and verification
//! - Token issuance and verification for all four token kinds
//! - The authentication core (registration, login, refresh rotation,
//!   logout, email verification, password reset, current-user resolution)
//! - Role-based authorization guards

pub mod guard;
pub mod jwt;
pub mod password;
pub mod service;

pub use guard::{require_admin, require_role};
pub use jwt::{Claims, TokenCodec, TokenType};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, RegisterRequest};
