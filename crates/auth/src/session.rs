use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use stockroom_core::UserId;

/// Opaque bearer token identifying a live session.
///
/// Random (UUIDv4), unlike entity ids, so it cannot be guessed from creation time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// An authenticated session, issued on successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Open a session lasting `ttl` from `issued_at`.
    ///
    /// Fails when the expiry falls outside the representable date range.
    pub fn issue(
        user_id: UserId,
        username: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, SessionError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or(SessionError::ExpiryOutOfRange)?;

        Ok(Self {
            token: SessionToken::generate(),
            user_id,
            username: username.into(),
            issued_at,
            expires_at,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has expired")]
    Expired,

    #[error("session not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid session time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("session lifetime reaches past the supported date range")]
    ExpiryOutOfRange,
}

/// Deterministically check a session's time window against `now`.
pub fn validate_session(session: &Session, now: DateTime<Utc>) -> Result<(), SessionError> {
    if session.expires_at <= session.issued_at {
        return Err(SessionError::InvalidTimeWindow);
    }
    if now < session.issued_at {
        return Err(SessionError::NotYetValid);
    }
    if now >= session.expires_at {
        return Err(SessionError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issued() -> Session {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        Session::issue(UserId::new(), "ana", at, Duration::hours(8)).unwrap()
    }

    #[test]
    fn valid_inside_window() {
        let s = issued();
        assert_eq!(validate_session(&s, s.issued_at), Ok(()));
        assert_eq!(validate_session(&s, s.expires_at - Duration::seconds(1)), Ok(()));
    }

    #[test]
    fn expired_at_and_after_expiry() {
        let s = issued();
        assert_eq!(validate_session(&s, s.expires_at), Err(SessionError::Expired));
        assert_eq!(
            validate_session(&s, s.expires_at + Duration::days(1)),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn rejects_future_and_empty_windows() {
        let s = issued();
        assert_eq!(
            validate_session(&s, s.issued_at - Duration::seconds(1)),
            Err(SessionError::NotYetValid)
        );

        let empty = Session::issue(UserId::new(), "ana", s.issued_at, Duration::zero()).unwrap();
        assert_eq!(validate_session(&empty, s.issued_at), Err(SessionError::InvalidTimeWindow));
    }

    #[test]
    fn oversized_lifetime_is_an_error() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let ttl = Duration::days(200_000_000);

        assert_eq!(
            Session::issue(UserId::new(), "ana", at, ttl),
            Err(SessionError::ExpiryOutOfRange)
        );
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
    }
}
