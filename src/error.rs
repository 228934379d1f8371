use crate::encryption::CryptoError;
use crate::token::Grant;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// The closed set of failures the agent can surface. Every variant carries a
/// fixed HTTP status and a stable machine readable code for the SPA, and is
/// constructed fully at the raise site. Diagnostic detail stays in `log_info`
/// and source chains, which are logged but never written to a response body.
#[derive(Error, Debug)]
pub enum OAuthAgentError {
    /// The origin or CSRF gate rejected the request.
    #[error("Access denied due to invalid request details")]
    Unauthorized { log_info: String },

    /// A required session cookie was absent, corrupt or undecryptable.
    #[error("A required cookie was missing or invalid")]
    InvalidCookie {
        log_info: String,
        #[source]
        source: Option<CryptoError>,
    },

    #[error("The ID token failed validation")]
    InvalidIdToken { log_info: String },

    /// The login callback arrived without the temp login cookie, so the login
    /// was never started here or the cookie has been lost.
    #[error("No temporary login state cookie was found to end a login")]
    MissingTempLoginData,

    /// The returned state does not match the stored one, a possible sign of a
    /// cross request code injection attempt.
    #[error("The state parameter did not match the one stored when the login started")]
    InvalidState,

    /// The Authorization Server returned an error authorization response,
    /// e.g. `?state=...&error=invalid_scope`.
    #[error("{description}")]
    AuthorizationResponse { error: String, description: String },

    /// The Authorization Server rejected a grant request with a 4xx response.
    #[error("A request sent to the Authorization Server was rejected")]
    AuthorizationClient {
        grant: Grant,
        status: u16,
        body: String,
    },

    /// The Authorization Server was unreachable or answered with a 5xx
    /// response. The SPA can present a retry option.
    #[error("A problem occurred with a request to the Authorization Server")]
    AuthorizationServer {
        log_info: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("A technical problem occurred in the OAuth Agent")]
    Unhandled { log_info: String },
}

impl OAuthAgentError {
    pub(crate) fn unauthorized(log_info: impl Into<String>) -> Self {
        Self::Unauthorized {
            log_info: log_info.into(),
        }
    }

    pub(crate) fn invalid_cookie(log_info: impl Into<String>, source: CryptoError) -> Self {
        Self::InvalidCookie {
            log_info: log_info.into(),
            source: Some(source),
        }
    }

    pub(crate) fn missing_cookie(log_info: impl Into<String>) -> Self {
        Self::InvalidCookie {
            log_info: log_info.into(),
            source: None,
        }
    }

    /// The stable code returned to the SPA in the error body.
    pub fn code(&self) -> &str {
        match self {
            Self::Unauthorized { .. } => "unauthorized_request",
            Self::InvalidCookie { .. } => "invalid_cookie",
            Self::InvalidIdToken { .. } => "invalid_id_token",
            Self::MissingTempLoginData => "missing_temp_login_data",
            Self::InvalidState => "invalid_state",
            // The OAuth error code is forwarded, e.g. invalid_scope
            Self::AuthorizationResponse { error, .. } => error.as_str(),
            Self::AuthorizationClient { grant, status, body } => {
                match remap_client_error(*grant, *status, body) {
                    Some((code, _)) => code,
                    None => "authorization_error",
                }
            }
            Self::AuthorizationServer { .. } => "authorization_server_error",
            Self::Unhandled { .. } => "server_error",
        }
    }

    /// True when the SPA should discard its session, in which case the
    /// boundary also clears all session cookies.
    pub fn is_session_expired(&self) -> bool {
        self.code() == "session_expired"
    }

    pub(crate) fn log(&self) {
        match self {
            Self::Unauthorized { log_info }
            | Self::InvalidCookie { log_info, .. }
            | Self::InvalidIdToken { log_info } => {
                log::warn!("{}: {}", self.code(), log_info);
            }
            Self::MissingTempLoginData | Self::InvalidState => {
                log::warn!("{}: {}", self.code(), self);
            }
            Self::AuthorizationResponse { error, description } => {
                log::warn!("{}: {}", error, description);
            }
            Self::AuthorizationClient { grant, status, body } => {
                log::warn!("{}: {} request was rejected with status {}: {}", self.code(), grant, status, body);
            }
            Self::AuthorizationServer { log_info, source } => match source {
                Some(cause) => log::error!("{}: {} ({})", self.code(), log_info, cause),
                None => log::error!("{}: {}", self.code(), log_info),
            },
            Self::Unhandled { log_info } => {
                log::error!("{}: {}", self.code(), log_info);
            }
        }
    }
}

/// Grant specific reclassification of Authorization Server 4xx responses.
/// A failed refresh whose body names `invalid_grant` means the session has
/// ended, and a user info 401 means the access token has expired; both become
/// a 401 so the SPA can react without showing an error.
fn remap_client_error(grant: Grant, status: u16, body: &str) -> Option<(&'static str, StatusCode)> {
    match grant {
        Grant::RefreshToken if body.contains("invalid_grant") => {
            Some(("session_expired", StatusCode::UNAUTHORIZED))
        }
        Grant::UserInfo if status == 401 => Some(("token_expired", StatusCode::UNAUTHORIZED)),
        _ => None,
    }
}

impl ResponseError for OAuthAgentError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. }
            | Self::InvalidCookie { .. }
            | Self::InvalidIdToken { .. }
            | Self::MissingTempLoginData => StatusCode::UNAUTHORIZED,
            Self::InvalidState => StatusCode::BAD_REQUEST,
            // A prompt=none response reporting login_required is session
            // expiry, not a login failure
            Self::AuthorizationResponse { error, .. } => {
                if error == "login_required" {
                    StatusCode::UNAUTHORIZED
                } else {
                    StatusCode::BAD_REQUEST
                }
            }
            Self::AuthorizationClient { grant, status, body } => {
                match remap_client_error(*grant, *status, body) {
                    Some((_, status)) => status,
                    None => StatusCode::BAD_REQUEST,
                }
            }
            Self::AuthorizationServer { .. } => StatusCode::BAD_GATEWAY,
            Self::Unhandled { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        HttpResponse::build(self.status_code()).json(json!({
            "code": self.code(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_unauthorized_status_and_code() {
        let error = OAuthAgentError::unauthorized("the call is from an untrusted web origin");

        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.code(), "unauthorized_request");
    }

    #[test]
    fn test_authorization_response_error_is_bad_request() {
        let error = OAuthAgentError::AuthorizationResponse {
            error: "invalid_scope".to_string(),
            description: "Login failed at the Authorization Server".to_string(),
        };

        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.code(), "invalid_scope");
    }

    #[test]
    fn test_login_required_is_session_expiry() {
        let error = OAuthAgentError::AuthorizationResponse {
            error: "login_required".to_string(),
            description: "Login failed at the Authorization Server".to_string(),
        };

        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_rejected_code_grant_is_a_client_error() {
        let error = OAuthAgentError::AuthorizationClient {
            grant: Grant::AuthorizationCode,
            status: 400,
            body: "{\"error\":\"invalid_client\"}".to_string(),
        };

        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.code(), "authorization_error");
        assert!(!error.is_session_expired());
    }

    #[test]
    fn test_rejected_refresh_with_invalid_grant_is_session_expired() {
        let error = OAuthAgentError::AuthorizationClient {
            grant: Grant::RefreshToken,
            status: 400,
            body: "{\"error\":\"invalid_grant\"}".to_string(),
        };

        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.code(), "session_expired");
        assert!(error.is_session_expired());
    }

    #[test]
    fn test_user_info_401_is_token_expired() {
        let error = OAuthAgentError::AuthorizationClient {
            grant: Grant::UserInfo,
            status: 401,
            body: String::new(),
        };

        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.code(), "token_expired");
    }

    #[actix_web::test]
    async fn test_error_response_body_shape() {
        let error = OAuthAgentError::unauthorized("missing origin header");

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "unauthorized_request");
        assert_eq!(json["message"], "Access denied due to invalid request details");
        // The diagnostic text stays out of the response
        assert!(!json.to_string().contains("origin header"));
    }
}
