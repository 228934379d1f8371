use crate::config::OAuthAgentConfiguration;
use crate::cookie::{csrf_cookie_name, csrf_header_name};
use crate::encryption::decrypt_cookie;
use crate::error::OAuthAgentError;
use actix_web::{http::header, HttpRequest};

/// Endpoints indicate which trust checks apply to them. Starting a login, for
/// example, must tolerate a browser that does not hold a CSRF cookie yet.
pub struct ValidateRequestOptions {
    pub require_trusted_origin: bool,
    pub require_csrf_header: bool,
}

impl Default for ValidateRequestOptions {
    fn default() -> Self {
        Self {
            require_trusted_origin: true,
            require_csrf_header: true,
        }
    }
}

impl ValidateRequestOptions {
    pub fn origin_only() -> Self {
        Self {
            require_trusted_origin: true,
            require_csrf_header: false,
        }
    }
}

/// Gates a request before any handler logic runs: the Origin header must
/// exactly match a trusted web origin, and when required, the CSRF header the
/// SPA supplies must equal the decrypted CSRF cookie (double submit). Neither
/// check reads the request body, and the origin check runs first so no cookie
/// is inspected for a request from an untrusted site.
pub fn validate_request(
    req: &HttpRequest,
    options: &ValidateRequestOptions,
    config: &OAuthAgentConfiguration,
) -> Result<(), OAuthAgentError> {
    if options.require_trusted_origin {
        let origin = req
            .headers()
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok());

        match origin {
            Some(origin) if config.trusted_web_origins.iter().any(|o| o == origin) => {}
            _ => {
                return Err(OAuthAgentError::unauthorized(format!(
                    "the call is from an untrusted web origin: {origin:?}"
                )))
            }
        }
    }

    if options.require_csrf_header {
        let cookie_name = csrf_cookie_name(&config.cookie_name_prefix);
        let Some(csrf_cookie) = req.cookie(&cookie_name) else {
            return Err(OAuthAgentError::unauthorized(
                "no CSRF cookie was supplied in a POST request",
            ));
        };

        let expected = decrypt_cookie(&config.encryption_key, csrf_cookie.value())
            .map_err(|err| {
                OAuthAgentError::unauthorized(format!("the CSRF cookie could not be decrypted: {err}"))
            })?;

        let header_name = csrf_header_name(&config.cookie_name_prefix);
        let supplied = req
            .headers()
            .get(header_name.as_str())
            .and_then(|value| value.to_str().ok());

        match supplied {
            Some(supplied) if supplied == expected => {}
            _ => {
                return Err(OAuthAgentError::unauthorized(
                    "the CSRF header did not match the CSRF cookie in a POST request",
                ))
            }
        }
    }

    Ok(())
}
