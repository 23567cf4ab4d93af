use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::cache::token_cache::TokenCache;
use crate::cache::token_context::TokenContext;
use crate::config::api::Credential;
use crate::error::{ReportError, Result};
use crate::helpers::time::now_i64;
use crate::observability::metrics::get_metrics;
use crate::parser::jwt::jwt_expiration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    /// minted by this call
    Fresh,
    /// reused from an earlier exchange
    Cached,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Mints bearer tokens with the client-credentials grant.
#[derive(Debug, Clone)]
pub struct TokenManager {
    client: Client,
    token_url: String,
    credential: Credential,
    reuse: bool,
    safety_margin_seconds: u64,
    cache: TokenCache,
}

impl TokenManager {
    pub fn new(
        client: Client,
        token_url: String,
        credential: Credential,
        reuse: bool,
        safety_margin_seconds: u64,
    ) -> Self {
        Self {
            client,
            token_url,
            credential,
            reuse,
            safety_margin_seconds,
            cache: TokenCache::new(),
        }
    }

    /// Reuse the cached token while it is valid, otherwise run an exchange.
    pub async fn acquire(&self) -> Result<(Token, TokenOrigin)> {
        if self.reuse {
            if let Some(token) = self.cache.get().await {
                debug!("reusing cached bearer token");
                return Ok((token, TokenOrigin::Cached));
            }
        }
        Ok((self.exchange_and_store().await?, TokenOrigin::Fresh))
    }

    /// Drop whatever is cached and mint a new token.
    pub async fn refresh(&self) -> Result<Token> {
        self.cache.clear().await;
        self.exchange_and_store().await
    }

    async fn exchange_and_store(&self) -> Result<Token> {
        let token = self.exchange().await?;
        if self.reuse {
            self.cache
                .set(TokenContext::new(token.clone(), self.safety_margin_seconds))
                .await;
        }
        Ok(token)
    }

    async fn exchange(&self) -> Result<Token> {
        let metrics = get_metrics().await;
        let result = self.request_token().await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics.token_exchanges.with_label_values(&[outcome]).inc();
        result
    }

    async fn request_token(&self) -> Result<Token> {
        let scope = self.credential.scope_string();
        let form = [
            ("client_id", self.credential.client_id.as_str()),
            ("client_secret", self.credential.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| ReportError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "token endpoint rejected the exchange");
            return Err(ReportError::Auth(format!("token endpoint answered {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Auth(format!("malformed token response: {}", e)))?;

        let value = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ReportError::Auth("token response has no access_token".to_string()))?;

        let expires_at = body
            .expires_in
            .map(|secs| now_i64() + secs)
            .or_else(|| jwt_expiration(&value));

        info!(
            school = %self.credential.school,
            token_len = value.len(),
            expires_at = ?expires_at,
            "bearer token acquired"
        );
        Ok(Token::new(value, expires_at))
    }
}
