//! Authentication and accounts module
//!
//! - [`JwtService`]: token generation and validation
//! - [`CurrentUser`]: per-request user context, extracted from the token
//! - [`AuthService`]: registration, login, addresses, password reset
//! - [`password`]: Argon2 hashing

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
pub use service::{
    AddressInput, AuthService, LoginInput, LoginResponse, RegisterInput, UserProfile,
};
