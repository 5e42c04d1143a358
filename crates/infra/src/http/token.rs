//! Token-endpoint client
//!
//! Redeems a captured authorization code at the portal's `token.php`. The
//! endpoint sits behind the same front end as the hosted web client and has
//! been observed to reject requests that do not look like that client, so
//! every request carries the full browser header set of a desktop Opera.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use schulgate_core::TokenExchanger;
use schulgate_domain::{Result, SchulgateError, TokenPair};
use serde::Deserialize;
use tracing::{debug, info};

/// User agent of the desktop browser the web client was recorded with
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36 OPR/120.0.0.0";
const WEB_APP_ORIGIN: &str = "https://schulnetz.web.app";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body of `token.php`
///
/// `refresh_token` and `expires_in` are omitted in some responses; only the
/// access token is mandatory.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// [`TokenExchanger`] backed by reqwest
pub struct TokenExchangeClient {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    redirect_uri: String,
}

impl TokenExchangeClient {
    /// Build a client for the given endpoint and OAuth client.
    ///
    /// # Errors
    /// Returns `SchulgateError::Internal` when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(Self::browser_headers())
            .build()
            .map_err(|e| SchulgateError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        })
    }

    /// Header set mimicking the hosted web client's token request.
    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(REFERER, HeaderValue::from_static("https://schulnetz.web.app/"));
        headers.insert(ORIGIN, HeaderValue::from_static(WEB_APP_ORIGIN));
        headers.insert(
            "sec-ch-ua",
            HeaderValue::from_static(
                "\"Opera\";v=\"120\", \"Not-A.Brand\";v=\"8\", \"Chromium\";v=\"135\"",
            ),
        );
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
        headers
    }
}

#[async_trait]
impl TokenExchanger for TokenExchangeClient {
    async fn exchange(&self, auth_code: &str, code_verifier: &str) -> Result<TokenPair> {
        info!(url = %self.token_url, code_len = auth_code.len(), "exchanging authorization code");

        let form = [
            ("grant_type", "authorization_code"),
            ("code", auth_code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
            ("client_id", self.client_id.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SchulgateError::TokenExchange(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(SchulgateError::TokenExchange(format!(
                "token endpoint returned {status}: {snippet}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SchulgateError::TokenExchange(format!("unparseable response: {e}")))?;

        let access_token = body.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            SchulgateError::TokenExchange("response carried no access token".to_string())
        })?;

        debug!(
            has_refresh = body.refresh_token.is_some(),
            expires_in = ?body.expires_in,
            "token exchange succeeded"
        );

        Ok(TokenPair {
            access_token,
            refresh_token: body.refresh_token.filter(|t| !t.is_empty()),
            expires_in: body.expires_in,
        })
    }
}
