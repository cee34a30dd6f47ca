//! Authentication state and cookie custody

use super::RouterClient;
use crate::error::{Result, RouterError};
use crate::protocol::command::{CMD_GET_RANDOM_LOGIN, CMD_LOGIN, CMD_LOGOUT};
use crate::protocol::{Command, LoginCredentials, SuccessSignal};

/// Login state machine.
///
/// `Anonymous -> Authenticating -> Authenticated`, re-login from
/// `Authenticated` passes through `ReAuthenticating`. Logout, a failed login
/// and reboot invalidation all land on `Anonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    ReAuthenticating,
}

/// Session cookie plus login state for one router
#[derive(Debug, Default)]
pub struct Session {
    cookie: Option<String>,
    state: AuthState,
    /// Set when a reboot invalidated the session; cleared by a good login
    reauth_required: bool,
}

impl Session {
    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    pub(crate) fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub(crate) fn reauth_required(&self) -> bool {
        self.reauth_required
    }

    fn begin_login(&mut self) {
        self.state = match self.state {
            AuthState::Authenticated => AuthState::ReAuthenticating,
            _ => AuthState::Authenticating,
        };
    }

    fn complete_login(&mut self, cookie: Option<String>) {
        if cookie.is_some() {
            self.cookie = cookie;
        }
        self.state = AuthState::Authenticated;
        self.reauth_required = false;
    }

    pub(crate) fn clear(&mut self) {
        self.cookie = None;
        self.state = AuthState::Anonymous;
    }

    pub(crate) fn invalidate_after_reboot(&mut self) {
        self.clear();
        self.reauth_required = true;
    }

    /// Scratch copy that sends `cookie` instead of the stored one
    fn carrying(&self, cookie: &str) -> Session {
        Session {
            cookie: Some(cookie.to_string()),
            state: self.state,
            reauth_required: self.reauth_required,
        }
    }
}

impl RouterClient {
    /// Salted login handshake.
    ///
    /// On failure the session is left `Anonymous` with no cookie. Auth
    /// failures are never retried here.
    pub async fn login(&self, password: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.gate(&mut inner, true)?;

        inner.session.begin_login();
        tracing::debug!("[Router] Login started ({:?})", inner.session.state());

        match self.authenticate(&inner.session, password).await {
            Ok(cookie) => {
                inner.session.complete_login(cookie);
                tracing::info!(
                    "[Router] Logged in to {} (cookie: {})",
                    self.base_url(),
                    inner.session.has_cookie()
                );
                Ok(())
            }
            Err(e) => {
                inner.session.clear();
                tracing::warn!("[Router] Login failed: {}", e);
                Err(e)
            }
        }
    }

    async fn authenticate(&self, session: &Session, password: &str) -> Result<Option<String>> {
        // The salt read goes through the POST path, token fetch included.
        let salt_exchange = self
            .dispatch(session, &Command::post(CMD_GET_RANDOM_LOGIN), self.max_retries)
            .await?;

        // Single-valued in every capture so far; first occurrence.
        let salt = salt_exchange
            .response
            .first_text("random_login")
            .ok_or(RouterError::SaltMissing)?;

        let credentials = LoginCredentials::derive(&salt, password);
        let login = Command::post(CMD_LOGIN)
            .param("username", credentials.username)
            .param("password", credentials.password);

        // A cookie set along with the salt ties it to this login attempt.
        let salt_session;
        let login_session = match salt_exchange.cookie.as_deref() {
            Some(cookie) => {
                salt_session = session.carrying(cookie);
                &salt_session
            }
            None => session,
        };

        // A salt is good for one attempt, so LOGIN itself is sent once.
        let exchange = self.dispatch(login_session, &login, 0).await?;

        // 0 and 1 both mean success; first occurrence of `result`.
        if !SuccessSignal::ResultAtMost(1).is_met(&exchange.response) {
            return Err(RouterError::AuthFailure {
                result: exchange.response.first_text("result"),
            });
        }

        Ok(exchange.cookie.or(salt_exchange.cookie))
    }

    /// Best-effort logout. Local state is cleared whatever the outcome.
    pub async fn logout(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let outcome = match self.gate(&mut inner, true) {
            Ok(()) => {
                // Exact string "success", first occurrence; numeric 0 is a failure.
                let command =
                    Command::post(CMD_LOGOUT).expect(SuccessSignal::ResultEquals("success".to_string()));
                self.dispatch(&inner.session, &command, self.max_retries)
                    .await
                    .and_then(|exchange| self.check_success(&command, exchange.response))
                    .map(|_| ())
            }
            Err(e) => Err(e),
        };

        inner.session.clear();

        match &outcome {
            Ok(()) => tracing::info!("[Router] Logged out of {}", self.base_url()),
            Err(e) => tracing::warn!("[Router] Logout failed, local session dropped: {}", e),
        }
        outcome
    }

    /// Current login state, no I/O
    pub async fn auth_state(&self) -> AuthState {
        self.inner.lock().await.session.state()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.session.is_authenticated()
    }
}
