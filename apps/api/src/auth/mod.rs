// Credential store: user accounts, password hashing, bearer tokens.
// Handlers live here; the `AuthUser` extractor guards every protected route.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod store;
pub mod token;

pub use extractor::AuthUser;
pub use store::{PgUserStore, UserStore};
pub use token::TokenIssuer;
