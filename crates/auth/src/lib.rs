//! `stockroom-auth`: the login/registration gate.
//!
//! Pure building blocks: user records, registration rules, password hashing
//! and sessions. Storage of users and live sessions is handled by
//! `stockroom-infra`.

pub mod password;
pub mod session;
pub mod user;

pub use password::{PasswordError, hash_password, verify_password};
pub use session::{Session, SessionError, SessionToken, validate_session};
pub use user::{Registration, User};
