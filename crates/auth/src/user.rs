//! Registered users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, UserId};

const MIN_PASSWORD_LEN: usize = 8;

/// Registration form input. The password is only held long enough to hash it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Registration {
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if !is_plausible_email(self.email.trim()) {
            return Err(DomainError::validation("email is not valid"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Stored user record. Only the password hash is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build the stored record for a validated registration.
    pub fn register(
        id: UserId,
        registration: &Registration,
        password_hash: String,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        registration.validate()?;
        Ok(Self {
            id,
            username: registration.username.trim().to_string(),
            email: registration.email.trim().to_string(),
            password_hash,
            created_at,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: " ana ".to_string(),
            email: "ana@example.com".to_string(),
            password: "SecurePassword123!".to_string(),
        }
    }

    #[test]
    fn register_trims_identity_fields() {
        let hash = "$argon2id$x".to_string();
        let user = User::register(UserId::new(), &registration(), hash, Utc::now()).unwrap();
        assert_eq!(user.username, "ana");
        assert_eq!(user.email, "ana@example.com");
    }

    #[test]
    fn rejects_short_passwords_and_bad_emails() {
        let mut r = registration();
        r.password = "short".to_string();
        assert!(matches!(r.validate(), Err(DomainError::Validation(_))));

        let mut r = registration();
        r.email = "ana.example.com".to_string();
        assert!(matches!(r.validate(), Err(DomainError::Validation(_))));

        let mut r = registration();
        r.username = "   ".to_string();
        assert!(matches!(r.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let rendered = format!("{:?}", registration());
        assert!(!rendered.contains("SecurePassword123!"));
    }

    #[test]
    fn serialized_user_omits_the_hash() {
        let hash = "$argon2id$secret".to_string();
        let user = User::register(UserId::new(), &registration(), hash, Utc::now()).unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
    }
}
