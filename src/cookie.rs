use crate::config::{CookieOptions, OAuthAgentConfiguration};
use crate::encryption::{encrypt_cookie, CryptoError};
use crate::token::TokenResponse;
use actix_web::cookie::{
    time::{Duration, OffsetDateTime},
    Cookie, Expiration,
};
use serde_json::json;

pub fn access_token_cookie_name(prefix: &str) -> String {
    format!("{prefix}-at")
}

/// The refresh token cookie. Its presence is the agent's definition of
/// "logged in".
pub fn auth_cookie_name(prefix: &str) -> String {
    format!("{prefix}-auth")
}

pub fn id_cookie_name(prefix: &str) -> String {
    format!("{prefix}-id")
}

pub fn csrf_cookie_name(prefix: &str) -> String {
    format!("{prefix}-csrf")
}

pub fn temp_login_data_cookie_name(prefix: &str) -> String {
    format!("{prefix}-login")
}

/// The request header the SPA echoes the CSRF token in.
pub fn csrf_header_name(prefix: &str) -> String {
    format!("x-{prefix}-csrf")
}

fn refresh_endpoint_path(config: &OAuthAgentConfiguration) -> String {
    format!("{}/refresh", config.endpoints_prefix)
}

fn claims_endpoint_path(config: &OAuthAgentConfiguration) -> String {
    format!("{}/claims", config.endpoints_prefix)
}

fn login_endpoints_path(config: &OAuthAgentConfiguration) -> String {
    format!("{}/login", config.endpoints_prefix)
}

fn build_cookie(
    name: String,
    value: String,
    path: String,
    http_only: bool,
    options: &CookieOptions,
) -> Cookie<'static> {
    let mut builder = Cookie::build(name, value)
        .http_only(http_only)
        .secure(options.secure)
        .same_site(options.same_site)
        .path(path);
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    builder.finish()
}

fn encrypted_cookie(
    config: &OAuthAgentConfiguration,
    name: String,
    value: &str,
    path: String,
    http_only: bool,
) -> Result<Cookie<'static>, CryptoError> {
    let envelope = encrypt_cookie(&config.encryption_key, value)?;
    Ok(build_cookie(
        name,
        envelope,
        path,
        http_only,
        &config.cookie_options,
    ))
}

fn expired_cookie(
    name: String,
    path: String,
    http_only: bool,
    options: &CookieOptions,
) -> Cookie<'static> {
    let mut cookie = build_cookie(name, String::new(), path, http_only, options);
    cookie.set_expires(Expiration::DateTime(
        OffsetDateTime::now_utc() - Duration::days(1),
    ));
    cookie
}

/// Builds the session cookies for a token endpoint response. The access token
/// cookie is always written; the CSRF cookie, the temp login unset directive,
/// and the refresh and ID cookies are written conditionally. Refresh and ID
/// cookies are narrowed to the only endpoints that read them, and the CSRF
/// cookie drops HttpOnly since the SPA must read it back.
pub fn cookies_for_token_response(
    token_response: &TokenResponse,
    config: &OAuthAgentConfiguration,
    unset_temp_login_data_cookie: bool,
    csrf_cookie_value: Option<&str>,
) -> Result<Vec<Cookie<'static>>, CryptoError> {
    let prefix = &config.cookie_name_prefix;
    let root_path = config.cookie_options.path.clone();

    let mut cookies = vec![encrypted_cookie(
        config,
        access_token_cookie_name(prefix),
        &token_response.access_token,
        root_path.clone(),
        config.cookie_options.http_only,
    )?];

    if let Some(csrf_value) = csrf_cookie_value {
        cookies.push(encrypted_cookie(
            config,
            csrf_cookie_name(prefix),
            csrf_value,
            root_path,
            false,
        )?);
    }

    if unset_temp_login_data_cookie {
        cookies.push(temp_login_data_cookie_for_unset(config));
    }

    if let Some(refresh_token) = &token_response.refresh_token {
        cookies.push(encrypted_cookie(
            config,
            auth_cookie_name(prefix),
            refresh_token,
            refresh_endpoint_path(config),
            config.cookie_options.http_only,
        )?);
    }

    if let Some(id_token) = &token_response.id_token {
        cookies.push(encrypted_cookie(
            config,
            id_cookie_name(prefix),
            id_token,
            claims_endpoint_path(config),
            config.cookie_options.http_only,
        )?);
    }

    Ok(cookies)
}

/// Expiring directives for every named session cookie, each under the path it
/// was set with. Idempotent, and safe when some cookies were never set.
pub fn cookies_for_unset(config: &OAuthAgentConfiguration) -> Vec<Cookie<'static>> {
    let prefix = &config.cookie_name_prefix;
    let options = &config.cookie_options;
    let root_path = options.path.clone();

    vec![
        expired_cookie(
            auth_cookie_name(prefix),
            refresh_endpoint_path(config),
            options.http_only,
            options,
        ),
        expired_cookie(
            access_token_cookie_name(prefix),
            root_path.clone(),
            options.http_only,
            options,
        ),
        expired_cookie(
            id_cookie_name(prefix),
            claims_endpoint_path(config),
            options.http_only,
            options,
        ),
        expired_cookie(csrf_cookie_name(prefix), root_path, false, options),
    ]
}

/// The short lived login state cookie, scoped to the login endpoints and
/// consumed exactly once when the authorization response is handled.
pub fn temp_login_data_cookie(
    config: &OAuthAgentConfiguration,
    code_verifier: &str,
    state: &str,
) -> Result<Cookie<'static>, CryptoError> {
    let plaintext = json!({ "codeVerifier": code_verifier, "state": state }).to_string();
    encrypted_cookie(
        config,
        temp_login_data_cookie_name(&config.cookie_name_prefix),
        &plaintext,
        login_endpoints_path(config),
        config.cookie_options.http_only,
    )
}

pub fn temp_login_data_cookie_for_unset(config: &OAuthAgentConfiguration) -> Cookie<'static> {
    expired_cookie(
        temp_login_data_cookie_name(&config.cookie_name_prefix),
        login_endpoints_path(config),
        config.cookie_options.http_only,
        &config.cookie_options,
    )
}
