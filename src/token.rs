use crate::config::OAuthAgentConfiguration;
use crate::encryption::decrypt_cookie;
use crate::error::OAuthAgentError;
use crate::login::TempLoginData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The token acquisition modes the agent performs against the Authorization
/// Server, used to specialize error classification per grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode,
    RefreshToken,
    UserInfo,
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Grant::AuthorizationCode => "an Authorization Code Grant",
            Grant::RefreshToken => "a Refresh Token Grant",
            Grant::UserInfo => "a User Info request",
        };
        f.write_str(name)
    }
}

/// The token endpoint response. Only the fields the agent re-encodes into
/// cookies are kept; everything else the Authorization Server returns is
/// dropped, never forwarded to the browser.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Back channel client for the Authorization Server's token and user info
/// endpoints. Holds one connection pool for the process; all calls carry a
/// bounded timeout so an unresponsive server resolves to a classified error
/// instead of hanging the request.
pub struct TokenClient {
    http: reqwest::Client,
}

impl Default for TokenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| panic!("the outbound HTTP client failed to initialize: {err}"));
        Self { http }
    }

    /// Completes a login by swapping the authorization code for tokens.
    ///
    /// The temp login cookie written when the login started must be present
    /// and the `state` returned by the Authorization Server must equal the
    /// one stored in it, which binds the code to this browser and defends
    /// against cross request code injection. Codes are single use, so a
    /// failed exchange is never retried.
    pub async fn exchange_code(
        &self,
        config: &OAuthAgentConfiguration,
        code: &str,
        state: &str,
        temp_login_data_cookie: Option<&str>,
    ) -> Result<TokenResponse, OAuthAgentError> {
        let Some(envelope) = temp_login_data_cookie else {
            return Err(OAuthAgentError::MissingTempLoginData);
        };

        let plaintext = decrypt_cookie(&config.encryption_key, envelope).map_err(|err| {
            OAuthAgentError::invalid_cookie("unable to decrypt the temp login data cookie", err)
        })?;
        let temp_login_data: TempLoginData = serde_json::from_str(&plaintext).map_err(|err| {
            OAuthAgentError::missing_cookie(format!(
                "the temp login data cookie could not be parsed: {err}"
            ))
        })?;

        if temp_login_data.state != state {
            return Err(OAuthAgentError::InvalidState);
        }

        let form = [
            ("grant_type", "authorization_code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code", code),
            ("code_verifier", temp_login_data.code_verifier.as_str()),
        ];
        self.grant_request(config, Grant::AuthorizationCode, &form)
            .await
    }

    pub async fn refresh_access_token(
        &self,
        config: &OAuthAgentConfiguration,
        refresh_token: &str,
    ) -> Result<TokenResponse, OAuthAgentError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.grant_request(config, Grant::RefreshToken, &form).await
    }

    async fn grant_request(
        &self,
        config: &OAuthAgentConfiguration,
        grant: Grant,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, OAuthAgentError> {
        let response = self
            .http
            .post(&config.token_endpoint)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|err| connectivity_error(grant, err))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| connectivity_error(grant, err))?;

        classify_response(grant, status, &text)?;

        serde_json::from_str(&text).map_err(|err| OAuthAgentError::AuthorizationServer {
            log_info: format!("malformed token response in {grant}: {err}"),
            source: None,
        })
    }

    /// Calls the User Info endpoint with the stored access token and returns
    /// the claims untouched. A 401 here is classified as token expiry.
    pub async fn user_info(
        &self,
        config: &OAuthAgentConfiguration,
        access_token: &str,
    ) -> Result<serde_json::Value, OAuthAgentError> {
        let grant = Grant::UserInfo;
        let response = self
            .http
            .post(&config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| connectivity_error(grant, err))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| connectivity_error(grant, err))?;

        classify_response(grant, status, &text)?;

        serde_json::from_str(&text).map_err(|err| OAuthAgentError::AuthorizationServer {
            log_info: format!("malformed response in {grant}: {err}"),
            source: None,
        })
    }
}

fn connectivity_error(grant: Grant, err: reqwest::Error) -> OAuthAgentError {
    OAuthAgentError::AuthorizationServer {
        log_info: format!("connectivity problem during {grant}"),
        source: Some(err),
    }
}

/// Classifies an Authorization Server HTTP response: 5xx means the upstream
/// is unavailable and the SPA may retry later, 4xx means the request itself
/// was rejected, specialized further per grant by the error taxonomy.
fn classify_response(grant: Grant, status: u16, body: &str) -> Result<(), OAuthAgentError> {
    if status >= 500 {
        return Err(OAuthAgentError::AuthorizationServer {
            log_info: format!("server error response in {grant}: {body}"),
            source: None,
        });
    }
    if status >= 400 {
        return Err(OAuthAgentError::AuthorizationClient {
            grant,
            status,
            body: body.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encryption::encrypt_cookie;

    fn temp_login_cookie(config: &OAuthAgentConfiguration, state: &str) -> String {
        let plaintext =
            serde_json::json!({ "codeVerifier": "verifier-value", "state": state }).to_string();
        encrypt_cookie(&config.encryption_key, &plaintext).unwrap()
    }

    #[test]
    fn test_5xx_is_an_authorization_server_error() {
        let result = classify_response(Grant::AuthorizationCode, 502, "upstream down");

        assert!(matches!(
            result,
            Err(OAuthAgentError::AuthorizationServer { source: None, .. })
        ));
    }

    #[test]
    fn test_4xx_is_an_authorization_client_error() {
        let result = classify_response(Grant::AuthorizationCode, 400, "{\"error\":\"invalid_client\"}");

        assert!(matches!(
            result,
            Err(OAuthAgentError::AuthorizationClient {
                grant: Grant::AuthorizationCode,
                status: 400,
                ..
            })
        ));
    }

    #[test]
    fn test_2xx_is_not_an_error() {
        assert!(classify_response(Grant::RefreshToken, 200, "{}").is_ok());
    }

    #[actix_web::test]
    async fn test_exchange_code_without_temp_cookie_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let client = TokenClient::new();

        let result = client.exchange_code(&config, "code", "state", None).await;

        assert!(matches!(result, Err(OAuthAgentError::MissingTempLoginData)));
    }

    #[actix_web::test]
    async fn test_exchange_code_with_undecryptable_temp_cookie_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let mut other = OAuthAgentConfiguration::test_default();
        other.encryption_key = [0x43; 32];
        let client = TokenClient::new();

        let cookie = temp_login_cookie(&other, "state");
        let result = client
            .exchange_code(&config, "code", "state", Some(&cookie))
            .await;

        assert!(matches!(result, Err(OAuthAgentError::InvalidCookie { .. })));
    }

    #[actix_web::test]
    async fn test_exchange_code_with_state_mismatch_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let client = TokenClient::new();

        let cookie = temp_login_cookie(&config, "stored-state");
        let result = client
            .exchange_code(&config, "code", "returned-state", Some(&cookie))
            .await;

        assert!(matches!(result, Err(OAuthAgentError::InvalidState)));
    }

    #[test]
    fn test_token_response_tolerates_extra_fields() {
        let json = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "token_type": "bearer",
            "expires_in": 300,
            "scope": "openid"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.access_token, "at");
        assert_eq!(response.refresh_token.as_deref(), Some("rt"));
        assert!(response.id_token.is_none());
    }
}
