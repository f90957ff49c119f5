//! Authorized HTTP client with transparent token refresh.
//!
//! Every authorized request goes through [`ApiClient::send_authorized`]:
//! on a 401 it refreshes the access token and replays the request exactly
//! once. Refreshes are single-flighted through a mutex so a burst of
//! concurrent 401s produces one refresh call, never a stampede.

use crate::error::{AuthError, AuthResult};
use crate::types::RefreshResponse;
use reqwest::{Method, StatusCode};
use souk_config::ClientConfig;
use souk_storage::CredentialStore;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// HTTP client bound to the credential store.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
    /// Serializes refreshes; holders re-check the store before refreshing.
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: Arc<CredentialStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            store,
            refresh_gate: Mutex::new(()),
        }
    }

    /// The credential store this client reads tokens from.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ==========================================
    // Public (unauthenticated) requests
    // ==========================================

    /// POST without a bearer token (login, MFA verification).
    pub async fn post_public(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> AuthResult<reqwest::Response> {
        Ok(self.http.post(self.url(path)).json(body).send().await?)
    }

    // ==========================================
    // Authorized requests
    // ==========================================

    /// Authorized GET with refresh-and-replay on 401.
    pub async fn get(&self, path: &str) -> AuthResult<reqwest::Response> {
        self.send_authorized(Method::GET, path, None).await
    }

    /// Authorized POST with refresh-and-replay on 401.
    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> AuthResult<reqwest::Response> {
        self.send_authorized(Method::POST, path, Some(body)).await
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> AuthResult<reqwest::Response> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Send with the current access token; on 401, refresh once and replay.
    /// A second 401 clears the session and fails with `SessionExpired`.
    async fn send_authorized(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> AuthResult<reqwest::Response> {
        let token = self.store.access_token()?;
        let first = self
            .dispatch(method.clone(), path, body, token.as_deref())
            .await?;
        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        if self.store.refresh_token()?.is_none() {
            // Nothing to refresh with; hand the 401 back to the caller.
            return Ok(first);
        }

        debug!(path, "Request returned 401, refreshing access token");
        let fresh = self.refresh_access(token.as_deref()).await?;

        let second = self.dispatch(method, path, body, Some(&fresh)).await?;
        if second.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Replay after refresh still unauthorized, clearing session");
            self.store.clear()?;
            return Err(AuthError::SessionExpired);
        }
        Ok(second)
    }

    // ==========================================
    // Refresh
    // ==========================================

    /// Obtain a valid access token, calling the refresh endpoint at most
    /// once across all concurrent callers.
    ///
    /// `seen_access` is the access token the caller just watched fail. If
    /// the store holds a different token by the time the gate is acquired,
    /// another caller already refreshed and that token is returned as-is.
    pub async fn refresh_access(&self, seen_access: Option<&str>) -> AuthResult<String> {
        self.single_flight_refresh(seen_access, |refresh| async move {
            let response = self
                .http
                .post(self.url("auth/token/refresh/"))
                .json(&serde_json::json!({ "refresh": refresh }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(AuthError::SessionExpired);
            }

            let parsed: RefreshResponse = response
                .json()
                .await
                .map_err(|e| AuthError::Protocol(format!("bad refresh response: {}", e)))?;
            Ok(parsed.access)
        })
        .await
    }

    /// The single-flight core, generic over the refresh operation so the
    /// coalescing logic is testable without a server.
    pub(crate) async fn single_flight_refresh<F, Fut>(
        &self,
        seen_access: Option<&str>,
        op: F,
    ) -> AuthResult<String>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = AuthResult<String>>,
    {
        let _guard = self.refresh_gate.lock().await;

        // A caller that waited on the gate may find the token already
        // rotated; adopt it instead of refreshing again.
        if let Some(current) = self.store.access_token()? {
            if seen_access != Some(current.as_str()) {
                debug!("Access token already rotated by a concurrent refresh");
                return Ok(current);
            }
        }

        let Some(refresh) = self.store.refresh_token()? else {
            self.store.clear()?;
            return Err(AuthError::SessionExpired);
        };

        match op(refresh).await {
            Ok(access) => {
                self.store.set_access_token(&access)?;
                Ok(access)
            }
            Err(e) => {
                // An unusable refresh token means the session is gone.
                warn!(error = %e, "Token refresh failed, clearing session");
                self.store.clear()?;
                Err(e)
            }
        }
    }
}
