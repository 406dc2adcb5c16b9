//! Authentication: password hashing and bearer-token extraction

mod extractor;
mod password;

pub use extractor::{bearer_token, AuthUser};
pub use password::{hash_password, verify_password};
