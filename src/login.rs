use crate::config::OAuthAgentConfiguration;
use crate::error::OAuthAgentError;
use crate::types::ExtraParam;
use oauth2::url::Url;
use oauth2::{CsrfToken, PkceCodeChallenge};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

/// 32 bytes of entropy for the state parameter, base64url encoded.
const STATE_BYTES: u32 = 32;

/// Query values escape everything outside unreserved characters.
const QUERY_VALUE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(crate) fn url_encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE_SET).to_string()
}

/// The outcome of building an authorization request: the URL to send the
/// browser to, plus the verifier and state the caller must persist in the
/// temp login cookie until the Authorization Server redirects back.
pub struct AuthorizationRequestData {
    pub authorization_request_url: String,
    pub code_verifier: String,
    pub state: String,
}

/// The login state stored in the temp login cookie between starting and
/// ending a login.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempLoginData {
    pub code_verifier: String,
    pub state: String,
}

/// Builds a code flow authorization request URL with a PKCE S256 challenge.
/// `state` and the code verifier are independent fresh random values, and
/// caller supplied extension parameters (`prompt`, `acr_values`, `claims`,
/// ...) are forwarded verbatim, URL encoded.
pub fn create_authorization_request(
    config: &OAuthAgentConfiguration,
    extra_params: &[ExtraParam],
) -> AuthorizationRequestData {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let state = CsrfToken::new_random_len(STATE_BYTES);

    let mut url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&state={}&code_challenge={}&code_challenge_method=S256",
        config.authorize_endpoint,
        url_encode(&config.client_id),
        url_encode(&config.redirect_uri),
        url_encode(state.secret()),
        pkce_challenge.as_str(),
    );

    for param in extra_params {
        if !param.key.is_empty() && !param.value.is_empty() {
            url.push('&');
            url.push_str(&param.key);
            url.push('=');
            url.push_str(&url_encode(&param.value));
        }
    }

    if let Some(scope) = &config.scope {
        url.push_str("&scope=");
        url.push_str(&url_encode(scope));
    }

    AuthorizationRequestData {
        authorization_request_url: url,
        code_verifier: pkce_verifier.secret().to_owned(),
        state: state.secret().to_owned(),
    }
}

/// A successful authorization response, ready for the code exchange.
pub struct AuthorizationCodeResponse {
    pub code: String,
    pub state: String,
}

/// Classifies the page URL the SPA reports on every page load.
///
/// - `state` and `code` present: an authorization success, returned for the
///   token exchange.
/// - `state` and `error` present: the Authorization Server reported a
///   failure, raised with the OAuth error code attached.
/// - anything else, including an unparseable URL or no URL at all: not an
///   OAuth response, and the caller falls back to reporting existing session
///   state from cookies.
pub fn parse_authorization_response(
    page_url: Option<&str>,
) -> Result<Option<AuthorizationCodeResponse>, OAuthAgentError> {
    let Some(page_url) = page_url else {
        return Ok(None);
    };
    let Ok(url) = Url::parse(page_url) else {
        return Ok(None);
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    match (state, code, error) {
        (Some(state), Some(code), _) => Ok(Some(AuthorizationCodeResponse { code, state })),
        (Some(_), None, Some(error)) => Err(OAuthAgentError::AuthorizationResponse {
            error,
            description: error_description
                .unwrap_or_else(|| "Login failed at the Authorization Server".to_string()),
        }),
        _ => Ok(None),
    }
}
