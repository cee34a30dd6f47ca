//! Single-use CSRF token
//!
//! The router hands out a new random `token` on every `get_token` read and
//! accepts it for exactly the next POST. The token is fetched inside
//! `RouterClient::post` while the session lock is held and moved into that
//! POST's form; it is neither `Clone` nor reachable from outside the client.

use super::{RouterClient, Session};
use crate::error::Result;
use crate::protocol::command::CMD_GET_TOKEN;
use crate::protocol::credentials::csrf_from_raw;
use crate::protocol::{Command, ParsedResponse};

#[derive(Debug)]
pub(crate) struct CsrfToken(Option<String>);

impl CsrfToken {
    /// Missing `token` means no session, so no `CSRFToken` field at all.
    /// An empty string is treated the same way.
    pub(crate) fn from_response(response: &ParsedResponse) -> Self {
        // get_token has never been seen repeating `token`; first occurrence.
        let derived = response
            .first_text("token")
            .filter(|raw| !raw.is_empty())
            .map(|raw| csrf_from_raw(&raw));
        Self(derived)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Consumes the token; it cannot be sent twice
    pub(crate) fn into_form_value(self) -> Option<String> {
        self.0
    }
}

impl RouterClient {
    /// One `get_token` round trip per call, no caching
    pub(crate) async fn next_token(&self, session: &Session) -> Result<CsrfToken> {
        let exchange = self.send_get(session, &Command::get(CMD_GET_TOKEN)).await?;
        let token = CsrfToken::from_response(&exchange.response);
        if token.is_empty() {
            tracing::debug!("[Router] No CSRF token issued (unauthenticated)");
        }
        Ok(token)
    }
}
