pub mod auth_key;

pub mod auth_service;
pub use auth_service::{AuthError, AuthService, LoginResult};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod password;
pub use password::PasswordService;

pub mod token;
pub use token::{Claims, IssuedToken, TokenService};
