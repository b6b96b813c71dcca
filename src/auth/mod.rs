// Identity module
// Validates bearer tokens issued by the account service and the trusted
// shared-secret bypass; normalizes roles at the boundary.

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{AuthUser, Caller, BOT_SECRET_HEADER};
pub use models::Role;
pub use token::{Claims, TokenService};
