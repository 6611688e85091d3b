pub mod bearer;

pub use bearer::{AuthFailure, AuthenticatedToken, BearerAuthenticator, BearerOutcome};
