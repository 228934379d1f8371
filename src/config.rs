use crate::env_var;
use actix_web::cookie::SameSite;
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {detail}")]
    Invalid { name: &'static str, detail: String },
    #[error("{0} must be a hex encoded 32 byte key")]
    InvalidEncryptionKey(&'static str),
}

/// Attributes applied to every cookie the agent writes. The CSRF cookie drops
/// `HttpOnly` so the SPA can read it, and the refresh and ID cookies narrow
/// the path, everything else is shared.
#[derive(Clone)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub domain: Option<String>,
    pub path: String,
}

/// Immutable process wide settings, loaded once before the HTTP listener
/// starts and shared read-only by every request handler.
///
/// No `Debug` implementation on purpose: the client secret and encryption key
/// must never end up in logs verbatim.
pub struct OAuthAgentConfiguration {
    pub port: u16,
    pub endpoints_prefix: String,

    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: Option<String>,
    pub scope: Option<String>,

    pub issuer: String,
    pub authorize_endpoint: String,
    pub logout_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,

    pub cookie_name_prefix: String,
    pub encryption_key: [u8; 32],
    pub trusted_web_origins: Vec<String>,
    pub cookie_options: CookieOptions,
}

impl OAuthAgentConfiguration {
    const DEFAULT_PORT: u16 = 8080;
    const DEFAULT_COOKIE_NAME_PREFIX: &'static str = "oauthagent";

    pub fn from_env() -> Result<Self, ConfigError> {
        let encryption_key = Self::parse_encryption_key(require(env_var::ENCRYPTION_KEY)?)?;

        let port = match optional(env_var::PORT) {
            Some(port) => port.parse::<u16>().map_err(|err| ConfigError::Invalid {
                name: env_var::PORT,
                detail: err.to_string(),
            })?,
            None => Self::DEFAULT_PORT,
        };

        let trusted_web_origins: Vec<String> = require(env_var::TRUSTED_WEB_ORIGINS)?
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
        if trusted_web_origins.is_empty() {
            return Err(ConfigError::Missing(env_var::TRUSTED_WEB_ORIGINS));
        }

        Ok(Self {
            port,
            endpoints_prefix: require(env_var::ENDPOINTS_PREFIX)?,
            client_id: require(env_var::CLIENT_ID)?,
            client_secret: require(env_var::CLIENT_SECRET)?,
            redirect_uri: require(env_var::REDIRECT_URI)?,
            post_logout_redirect_uri: optional(env_var::POST_LOGOUT_REDIRECT_URI),
            scope: optional(env_var::SCOPE),
            issuer: require(env_var::ISSUER)?,
            authorize_endpoint: require(env_var::AUTHORIZE_ENDPOINT)?,
            logout_endpoint: require(env_var::LOGOUT_ENDPOINT)?,
            token_endpoint: require(env_var::TOKEN_ENDPOINT)?,
            userinfo_endpoint: require(env_var::USERINFO_ENDPOINT)?,
            cookie_name_prefix: optional(env_var::COOKIE_NAME_PREFIX)
                .unwrap_or_else(|| Self::DEFAULT_COOKIE_NAME_PREFIX.to_string()),
            encryption_key,
            trusted_web_origins,
            cookie_options: CookieOptions {
                http_only: match optional(env_var::COOKIE_HTTP_ONLY) {
                    Some(http_only) => parse_bool(env_var::COOKIE_HTTP_ONLY, &http_only)?,
                    None => true,
                },
                secure: match optional(env_var::COOKIE_SECURE) {
                    Some(secure) => parse_bool(env_var::COOKIE_SECURE, &secure)?,
                    None => true,
                },
                same_site: match optional(env_var::COOKIE_SAME_SITE) {
                    Some(same_site) => parse_same_site(&same_site)?,
                    None => SameSite::Strict,
                },
                domain: optional(env_var::COOKIE_DOMAIN),
                path: optional(env_var::COOKIE_PATH).unwrap_or_else(|| "/".to_string()),
            },
        })
    }

    fn parse_encryption_key(key_hex: String) -> Result<[u8; 32], ConfigError> {
        // Saved as hex, so 64 characters for a 32 byte key
        let key = hex::decode(&key_hex)
            .map_err(|_| ConfigError::InvalidEncryptionKey(env_var::ENCRYPTION_KEY))?;
        key.try_into()
            .map_err(|_| ConfigError::InvalidEncryptionKey(env_var::ENCRYPTION_KEY))
    }
}

#[cfg(test)]
impl OAuthAgentConfiguration {
    /// A fixed configuration for unit tests, no environment involved.
    pub(crate) fn test_default() -> Self {
        Self {
            port: 8080,
            endpoints_prefix: "/oauth-agent".to_string(),
            client_id: "spa-client".to_string(),
            client_secret: "Password1".to_string(),
            redirect_uri: "https://www.example.com/".to_string(),
            post_logout_redirect_uri: Some("https://www.example.com/".to_string()),
            scope: Some("openid profile".to_string()),
            issuer: "https://login.example.com/oauth".to_string(),
            authorize_endpoint: "https://login.example.com/oauth/authorize".to_string(),
            logout_endpoint: "https://login.example.com/oauth/logout".to_string(),
            token_endpoint: "https://login.example.com/oauth/token".to_string(),
            userinfo_endpoint: "https://login.example.com/oauth/userinfo".to_string(),
            cookie_name_prefix: "example".to_string(),
            encryption_key: [0x42; 32],
            trusted_web_origins: vec!["https://www.example.com".to_string()],
            cookie_options: CookieOptions {
                http_only: true,
                secure: true,
                same_site: SameSite::Strict,
                domain: None,
                path: "/".to_string(),
            },
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|err| ConfigError::Invalid {
        name,
        detail: err.to_string(),
    })
}

fn parse_same_site(value: &str) -> Result<SameSite, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        other => Err(ConfigError::Invalid {
            name: env_var::COOKIE_SAME_SITE,
            detail: format!("unsupported SameSite value {other:?}"),
        }),
    }
}
