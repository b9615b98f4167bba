//! Credential hashing for password protected files

mod password;

pub use password::{Argon2PasswordHasher, PasswordError, PasswordHasher};
