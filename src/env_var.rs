pub(crate) const PORT: &str = "PORT";
pub(crate) const ENDPOINTS_PREFIX: &str = "ENDPOINTS_PREFIX";

pub(crate) const CLIENT_ID: &str = "CLIENT_ID";
pub(crate) const CLIENT_SECRET: &str = "CLIENT_SECRET";
pub(crate) const REDIRECT_URI: &str = "REDIRECT_URI";
pub(crate) const POST_LOGOUT_REDIRECT_URI: &str = "POST_LOGOUT_REDIRECT_URI";

/// Space separated list of scopes, e.g. `openid profile`.
pub(crate) const SCOPE: &str = "SCOPE";

pub(crate) const ISSUER: &str = "ISSUER";
pub(crate) const AUTHORIZE_ENDPOINT: &str = "AUTHORIZE_ENDPOINT";
pub(crate) const LOGOUT_ENDPOINT: &str = "LOGOUT_ENDPOINT";
pub(crate) const TOKEN_ENDPOINT: &str = "TOKEN_ENDPOINT";
pub(crate) const USERINFO_ENDPOINT: &str = "USERINFO_ENDPOINT";

/// Hex encoded 32 byte AES-256-GCM key, so 64 characters.
pub(crate) const ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";

pub(crate) const COOKIE_NAME_PREFIX: &str = "COOKIE_NAME_PREFIX";
pub(crate) const COOKIE_DOMAIN: &str = "COOKIE_DOMAIN";
pub(crate) const COOKIE_HTTP_ONLY: &str = "COOKIE_HTTP_ONLY";
pub(crate) const COOKIE_PATH: &str = "COOKIE_PATH";
pub(crate) const COOKIE_SECURE: &str = "COOKIE_SECURE";
pub(crate) const COOKIE_SAME_SITE: &str = "COOKIE_SAME_SITE";

/// Comma separated list of web origins allowed to call the agent.
pub(crate) const TRUSTED_WEB_ORIGINS: &str = "TRUSTED_WEB_ORIGINS";
