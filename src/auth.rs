//! Session credential model: redacted secrets, storage names, and access-token claims.

pub mod claims;
pub mod credential;
pub mod secret;

pub use claims::*;
pub use credential::*;
pub use secret::*;
