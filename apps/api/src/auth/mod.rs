// Accounts, credentials and request authentication.
// Tokens are HMAC-signed and stateless; the user row is re-read on every request
// so deactivating an account takes effect immediately.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod token;

pub use extractor::AuthUser;
