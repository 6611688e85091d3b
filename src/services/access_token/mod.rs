pub mod error;
pub mod secret;
pub mod service;

pub use error::TokenError;
pub use secret::TokenSecret;
pub use service::AccessTokenService;
