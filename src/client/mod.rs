//! Router admin client
//!
//! - `session`: login state machine and cookie custody
//! - `token`: single-use CSRF token, fetched only inside `post`
//! - `cookie`: `Set-Cookie` parsing
//!
//! One `RouterClient` talks to one router. Every public operation holds the
//! session lock from start to finish, so a token fetch and the POST that
//! consumes it are never interleaved with another request.

mod cookie;
mod session;
mod token;

pub use session::{AuthState, Session};

use std::time::Duration;

use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::protocol::{Command, Method, ParsedResponse, GET_PATH, POST_PATH, SESSION_COOKIE};
use crate::quiescence::{QuiescencePolicy, QuiescenceStatus};

/// State guarded by the per-client lock
#[derive(Debug)]
struct Inner {
    session: Session,
    quiescence: QuiescencePolicy,
}

/// One decoded HTTP exchange
#[derive(Debug)]
struct Exchange {
    response: ParsedResponse,
    /// `random` cookie, if the router set one
    cookie: Option<String>,
}

pub struct RouterClient {
    base_url: Url,
    get_url: Url,
    post_url: Url,
    user_agent: String,
    http_client: Client,
    max_retries: u32,
    retry_backoff: Duration,
    reboot_commands: Vec<String>,
    inner: Mutex<Inner>,
}

impl RouterClient {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RouterError::InvalidConfig(format!("base_url {}: {}", config.base_url, e)))?;
        let get_url = base_url
            .join(GET_PATH)
            .map_err(|e| RouterError::InvalidConfig(e.to_string()))?;
        let post_url = base_url
            .join(POST_PATH)
            .map_err(|e| RouterError::InvalidConfig(e.to_string()))?;

        if config.user_agent.trim().is_empty() {
            // The router drops requests without a User-Agent
            return Err(RouterError::InvalidConfig("user_agent must not be empty".to_string()));
        }

        let http_client = Client::builder()
            .danger_accept_invalid_certs(true) // Self-signed router certs
            .timeout(config.timeout())
            .build()
            .map_err(|e| RouterError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            get_url,
            post_url,
            user_agent: config.user_agent.clone(),
            http_client,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
            reboot_commands: config.reboot_commands.clone(),
            inner: Mutex::new(Inner {
                session: Session::default(),
                quiescence: QuiescencePolicy::new(config.quiescence()),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Read one command, or several comma-joined ones with `multi`
    pub async fn get(
        &self,
        command: &str,
        extra_params: &[(&str, &str)],
        multi: bool,
    ) -> Result<ParsedResponse> {
        let mut cmd = if multi {
            Command::get_multi(command.split(','))
        } else {
            Command::get(command)
        };
        cmd = cmd.params(extra_params.iter().copied());
        self.execute(&cmd).await
    }

    /// Fetch a fresh CSRF token, then POST `goformId=command`
    pub async fn post(&self, command: &str, extra_params: &[(&str, &str)]) -> Result<ParsedResponse> {
        let cmd = Command::post(command).params(extra_params.iter().copied());
        self.execute(&cmd).await
    }

    /// Send a fully described command and apply its success rule.
    ///
    /// A reboot-inducing command is sent once; after it succeeds every
    /// further call fails with `QuiescenceActive` until the window ends.
    pub async fn execute(&self, command: &Command) -> Result<ParsedResponse> {
        let mut inner = self.inner.lock().await;
        self.gate(&mut inner, false)?;

        let rebooting = self.is_rebooting(command);
        let retries = if rebooting { 0 } else { self.max_retries };

        let exchange = self.dispatch(&inner.session, command, retries).await?;
        let response = self.check_success(command, exchange.response)?;

        if rebooting {
            inner.quiescence.arm(Instant::now());
            tracing::info!(
                "[Router] {} restarts the router, pausing for {}s",
                command.name(),
                inner.quiescence.interval().as_secs()
            );
        }

        Ok(response)
    }

    /// Sleep until the post-reboot window is over, then drop the session
    pub async fn wait_for_quiescence(&self) {
        let deadline = self.inner.lock().await.quiescence.deadline();

        if let Some(deadline) = deadline {
            tracing::info!("[Router] Waiting for router to come back");
            tokio::time::sleep_until(deadline).await;
        }

        let mut inner = self.inner.lock().await;
        match inner.quiescence.check(Instant::now()) {
            QuiescenceStatus::Clear => {}
            QuiescenceStatus::Active { remaining } => {
                // Re-armed by another caller while this one slept.
                tracing::warn!(
                    "[Router] Quiescence still active, {}s left",
                    remaining.as_secs()
                );
            }
            QuiescenceStatus::Elapsed => {
                inner.session.invalidate_after_reboot();
                tracing::info!("[Router] Quiescence over, session dropped; login required");
            }
        }
    }

    /// Quiescence and re-login checks that run before any network call
    fn gate(&self, inner: &mut Inner, for_login: bool) -> Result<()> {
        match inner.quiescence.check(Instant::now()) {
            QuiescenceStatus::Clear => {}
            QuiescenceStatus::Active { remaining } => {
                return Err(RouterError::QuiescenceActive { remaining });
            }
            QuiescenceStatus::Elapsed => {
                inner.session.invalidate_after_reboot();
                tracing::info!("[Router] Quiescence over, session dropped; login required");
            }
        }

        if inner.session.reauth_required() && !for_login {
            return Err(RouterError::ReauthenticationRequired);
        }
        Ok(())
    }

    fn is_rebooting(&self, command: &Command) -> bool {
        command.is_rebooting() || self.reboot_commands.iter().any(|c| c == command.name())
    }

    fn check_success(&self, command: &Command, response: ParsedResponse) -> Result<ParsedResponse> {
        if command.success_signal().is_met(&response) {
            Ok(response)
        } else {
            Err(RouterError::CommandFailure {
                command: command.name().to_string(),
                response: Box::new(response),
            })
        }
    }

    /// Send with bounded retry of transport failures
    async fn dispatch(&self, session: &Session, command: &Command, retries: u32) -> Result<Exchange> {
        let mut attempt = 0;
        loop {
            let result = match command.method() {
                Method::Get => self.send_get(session, command).await,
                Method::Post => self.send_post(session, command).await,
            };

            match result {
                Err(e) if e.is_retryable() && attempt < retries => {
                    let delay = backoff_delay(self.retry_backoff, attempt);
                    attempt += 1;
                    tracing::warn!(
                        "[Router] {} {} failed ({}), retry {}/{} in {}ms",
                        command.method().as_str(),
                        command.name(),
                        e,
                        attempt,
                        retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send_get(&self, session: &Session, command: &Command) -> Result<Exchange> {
        let request = self
            .http_client
            .get(self.get_url.clone())
            .query(&command.query_pairs());

        tracing::debug!("[Router] GET {}", command.name());
        self.exchange(session, request).await
    }

    async fn send_post(&self, session: &Session, command: &Command) -> Result<Exchange> {
        let token = self.next_token(session).await?;
        let form = command.form_pairs(token.into_form_value().as_deref());

        let request = self.http_client.post(self.post_url.clone()).form(&form);

        tracing::debug!("[Router] POST {}", command.name());
        self.exchange(session, request).await
    }

    async fn exchange(&self, session: &Session, request: reqwest::RequestBuilder) -> Result<Exchange> {
        let mut request = request.header(USER_AGENT, self.user_agent.as_str());
        if let Some(cookie) = session.cookie() {
            request = request.header(COOKIE, format!("{}={}", SESSION_COOKIE, cookie));
        }

        let resp = request.send().await?;
        let status = resp.status();
        let cookie = cookie::extract_set_cookie(resp.headers(), SESSION_COOKIE);
        let body = resp.text().await?;

        // Status codes carry no meaning here; only the body decides.
        tracing::debug!("[Router] HTTP {} ({} bytes)", status.as_u16(), body.len());

        let response = ParsedResponse::parse(&body)?;
        Ok(Exchange { response, cookie })
    }
}

/// `base * 2^attempt`, saturating instead of overflowing
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}


#[cfg(test)]
mod tests {
    use super::testing::{form_field, gets_with_cmd, posts_with_goform, test_client, test_config, SequenceResponder};
    use super::*;
    use crate::protocol::credentials::sha256_hex;
    use crate::protocol::SuccessSignal;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_invalid_base_url() {
        let config = test_config("not a url");
        assert!(matches!(
            RouterClient::new(&config),
            Err(RouterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let mut config = test_config("http://192.168.0.1");
        config.user_agent = "  ".to_string();
        assert!(matches!(
            RouterClient::new(&config),
            Err(RouterError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_get_sends_fixed_fields_and_skips_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reqproc/proc_get"))
            .and(query_param("cmd", "system_status"))
            .and(query_param("isTest", "false"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"system_status":"ok"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let response = client.get("system_status", &[], false).await.unwrap();
        assert_eq!(response.first_str("system_status"), Some("ok"));
        assert_eq!(gets_with_cmd(&mock_server, "get_token").await, 0);

        let requests = mock_server.received_requests().await.unwrap();
        assert!(requests[0].url.query_pairs().all(|(k, _)| k != "multi_data"));
        let user_agent = requests[0].headers.get("user-agent").unwrap().to_str().unwrap();
        assert_eq!(user_agent, test_config("x").user_agent);
    }

    #[tokio::test]
    async fn test_batched_get() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("cmd", "web_signal,network_type"))
            .and(query_param("multi_data", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"web_signal":"3","network_type":"LTE","network_type":"NR"}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let response = client
            .get("web_signal,network_type", &[], true)
            .await
            .unwrap();
        assert_eq!(response.all_values("network_type").len(), 2);
        assert_eq!(response.first_str("network_type"), Some("LTE"));
    }

    #[tokio::test]
    async fn test_post_without_token_omits_csrf_field() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("cmd", "get_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/reqproc/proc_post"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":"0"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        client.post("SOME_CMD", &[("k", "v")]).await.unwrap();

        let posts = posts_with_goform(&mock_server, "SOME_CMD").await;
        assert_eq!(posts.len(), 1);
        let body = String::from_utf8(posts[0].body.clone()).unwrap();
        assert!(!body.contains("CSRFToken"));
        assert_eq!(form_field(&posts[0], "isTest").as_deref(), Some("false"));
        assert_eq!(form_field(&posts[0], "k").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_each_post_uses_fresh_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("cmd", "get_token"))
            .respond_with(SequenceResponder::tokens())
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":"0"}"#))
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        client.post("SOME_CMD", &[]).await.unwrap();
        client.post("SOME_CMD", &[]).await.unwrap();

        let posts = posts_with_goform(&mock_server, "SOME_CMD").await;
        assert_eq!(form_field(&posts[0], "CSRFToken"), Some(sha256_hex("tok-1")));
        assert_eq!(form_field(&posts[1], "CSRFToken"), Some(sha256_hex("tok-2")));
    }

    #[tokio::test]
    async fn test_http_status_is_ignored() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"ppp_status":"up"}"#))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let response = client.get("ppp_status", &[], false).await.unwrap();
        assert_eq!(response.first_str("ppp_status"), Some("up"));
    }

    #[tokio::test]
    async fn test_malformed_body_surfaces() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let err = client.get("system_status", &[], false).await.unwrap_err();
        assert!(matches!(err, RouterError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_command_failure_keeps_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"result":"failure","why":"x"}"#),
            )
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let cmd = Command::post("SOME_CMD").expect(SuccessSignal::ResultEquals("0".to_string()));
        let err = client.execute(&cmd).await.unwrap_err();
        assert_eq!(err.response().and_then(|r| r.first_str("why")), Some("x"));
    }

    #[tokio::test]
    async fn test_transport_error_is_retried_then_surfaced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_millis(1500)),
            )
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let err = client.get("system_status", &[], false).await.unwrap_err();
        assert!(matches!(err, RouterError::Transport(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = test_client("http://127.0.0.1:1");
        let err = client.get("system_status", &[], false).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_reboot_command_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"result":"success"}"#)
                    .set_delay(Duration::from_millis(1500)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        let cmd = Command::post("REBOOT_DEVICE").reboots_device();
        let err = client.execute(&cmd).await.unwrap_err();
        assert!(matches!(err, RouterError::Transport(_)));
    }

    #[tokio::test]
    async fn test_quiescence_blocks_without_network_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":"success"}"#))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        client
            .execute(&Command::post("REBOOT_DEVICE").reboots_device())
            .await
            .unwrap();
        let sent = mock_server.received_requests().await.unwrap().len();

        let err = client.get("system_status", &[], false).await.unwrap_err();
        assert!(matches!(err, RouterError::QuiescenceActive { .. }));
        let err = client.login("pw").await.unwrap_err();
        assert!(matches!(err, RouterError::QuiescenceActive { .. }));

        assert_eq!(mock_server.received_requests().await.unwrap().len(), sent);
    }

    #[tokio::test]
    async fn test_configured_reboot_command_then_login_required() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("cmd", "get_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":"success"}"#))
            .mount(&mock_server)
            .await;

        let mut config = test_config(&mock_server.uri());
        config.quiescence_secs = 0;
        config.reboot_commands = vec!["REBOOT_DEVICE".to_string()];
        let client = RouterClient::new(&config).unwrap();

        client.post("REBOOT_DEVICE", &[]).await.unwrap();
        client.wait_for_quiescence().await;

        let err = client.get("system_status", &[], false).await.unwrap_err();
        assert!(matches!(err, RouterError::ReauthenticationRequired));
        assert_eq!(client.auth_state().await, AuthState::Anonymous);
        assert_eq!(gets_with_cmd(&mock_server, "system_status").await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_posts_do_not_interleave() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("cmd", "get_token"))
            .respond_with(SequenceResponder::tokens())
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"result":"0"}"#)
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = std::sync::Arc::new(test_client(&mock_server.uri()));
        let first = tokio::spawn({
            let client = client.clone();
            async move { client.post("CMD_A", &[]).await }
        });
        let second = tokio::spawn({
            let client = client.clone();
            async move { client.post("CMD_B", &[]).await }
        });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let methods: Vec<&str> = requests.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["GET", "POST", "GET", "POST"]);

        // each POST spends the token fetched right before it
        assert_eq!(
            form_field(&requests[1], "CSRFToken"),
            Some(sha256_hex("tok-1"))
        );
        assert_eq!(
            form_field(&requests[3], "CSRFToken"),
            Some(sha256_hex("tok-2"))
        );
    }

    #[test]
    fn test_backoff_delay_saturates() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), base);
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(base, 40), base * u32::MAX);
        assert_eq!(backoff_delay(Duration::MAX, 1), Duration::MAX);
    }

    #[tokio::test]
    async fn test_wait_for_quiescence_without_reboot_keeps_session_usable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("cmd", "system_status"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"system_status":"ok"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server.uri());
        client.wait_for_quiescence().await;

        let response = client.get("system_status", &[], false).await.unwrap();
        assert_eq!(response.first_str("system_status"), Some("ok"));
        assert_eq!(client.auth_state().await, AuthState::Anonymous);
    }
}
