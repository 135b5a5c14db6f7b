//! Registration, login and sessions.
//!
//! Live sessions are held in memory only: restarting the process logs
//! everyone out. Nobody is logged in implicitly.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use stockroom_auth::{
    Registration, Session, SessionToken, User, hash_password, validate_session, verify_password,
};
use stockroom_core::UserId;

use crate::services::error::{ServiceResult, StockroomError};
use crate::store::UserStore;

#[derive(Debug)]
pub struct Gatekeeper<S> {
    store: Arc<S>,
    sessions: RwLock<HashMap<SessionToken, Session>>,
    session_ttl: Duration,
}

impl<S> Gatekeeper<S> {
    pub fn new(store: Arc<S>, session_ttl: Duration) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
            session_ttl,
        }
    }

    fn lock_poisoned() -> StockroomError {
        StockroomError::Storage("session table lock poisoned".to_string())
    }

    /// Check `token` against the session table at `now`.
    ///
    /// Expired sessions are dropped from the table.
    pub fn authenticate_at(
        &self,
        token: SessionToken,
        now: DateTime<Utc>,
    ) -> ServiceResult<Session> {
        let mut sessions = self.sessions.write().map_err(|_| Self::lock_poisoned())?;

        let session = sessions
            .get(&token)
            .cloned()
            .ok_or_else(|| StockroomError::InvalidSession("unknown session".to_string()))?;

        if let Err(e) = validate_session(&session, now) {
            sessions.remove(&token);
            return Err(e.into());
        }
        Ok(session)
    }

    pub fn authenticate(&self, token: SessionToken) -> ServiceResult<Session> {
        self.authenticate_at(token, Utc::now())
    }

    /// End a session. Returns whether it existed.
    pub fn logout(&self, token: SessionToken) -> ServiceResult<bool> {
        let mut sessions = self.sessions.write().map_err(|_| Self::lock_poisoned())?;
        Ok(sessions.remove(&token).is_some())
    }
}

impl<S> Gatekeeper<S>
where
    S: UserStore,
{
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> ServiceResult<User> {
        registration.validate()?;

        let username = registration.username.trim();
        if self.store.find_user_by_username(username).await?.is_some() {
            warn!("rejected duplicate username");
            return Err(StockroomError::DuplicateUsername(username.to_string()));
        }

        let hash = hash_password(&registration.password)?;
        let user = User::register(UserId::new(), &registration, hash, Utc::now())?;
        self.store.insert_user(&user).await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<Session> {
        self.login_at(username, password, Utc::now()).await
    }

    /// Verify credentials and open a session issued at `now`.
    ///
    /// Unknown users and wrong passwords fail the same way. Sessions already
    /// expired at `now` are dropped from the table.
    #[instrument(skip(self, password, now))]
    pub async fn login_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Session> {
        let Some(user) = self.store.find_user_by_username(username.trim()).await? else {
            warn!("login failed");
            return Err(StockroomError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!("login failed");
            return Err(StockroomError::InvalidCredentials);
        }

        let session = Session::issue(user.id, user.username.clone(), now, self.session_ttl)?;

        let mut sessions = self.sessions.write().map_err(|_| Self::lock_poisoned())?;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session.token, session.clone());
        drop(sessions);

        info!(user_id = %user.id, "login succeeded");
        Ok(session)
    }

    /// The user behind a valid session.
    pub async fn current_user(&self, token: SessionToken) -> ServiceResult<User> {
        let session = self.authenticate(token)?;
        self.store
            .get_user(session.user_id)
            .await?
            .ok_or_else(|| StockroomError::InvalidSession("user no longer exists".to_string()))
    }
}
