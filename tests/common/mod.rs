//! Shared plumbing for the integration suites: the agent runs on a loopback
//! port and is driven over real HTTP, with the Authorization Server stubbed
//! by a wiremock server. Cookies are carried between requests as raw header
//! strings, the way a browser would replay them.

#![allow(dead_code)]

use actix_oauth_agent::config::{CookieOptions, OAuthAgentConfiguration};
use actix_oauth_agent::route::agent_scope;
use actix_oauth_agent::token::TokenClient;
use actix_web::cookie::SameSite;
use actix_web::{rt, web, App, HttpServer};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TRUSTED_ORIGIN: &str = "https://www.example.com";
pub const ISSUER: &str = "https://login.example.com/oauth";
pub const ENDPOINTS_PREFIX: &str = "/oauth-agent";
pub const CSRF_HEADER: &str = "x-example-csrf";
pub const ENCRYPTION_KEY: [u8; 32] = [0x42; 32];

pub fn test_configuration(authorization_server_url: &str) -> OAuthAgentConfiguration {
    OAuthAgentConfiguration {
        port: 0,
        endpoints_prefix: ENDPOINTS_PREFIX.to_string(),
        client_id: "spa-client".to_string(),
        client_secret: "Password1".to_string(),
        redirect_uri: format!("{TRUSTED_ORIGIN}/"),
        post_logout_redirect_uri: Some(format!("{TRUSTED_ORIGIN}/")),
        scope: Some("openid profile".to_string()),
        issuer: ISSUER.to_string(),
        authorize_endpoint: format!("{ISSUER}/authorize"),
        logout_endpoint: format!("{ISSUER}/logout"),
        token_endpoint: format!("{authorization_server_url}/oauth/token"),
        userinfo_endpoint: format!("{authorization_server_url}/oauth/userinfo"),
        cookie_name_prefix: "example".to_string(),
        encryption_key: ENCRYPTION_KEY,
        trusted_web_origins: vec![TRUSTED_ORIGIN.to_string()],
        cookie_options: CookieOptions {
            http_only: true,
            secure: true,
            same_site: SameSite::Strict,
            domain: None,
            path: "/".to_string(),
        },
    }
}

/// Starts the agent on a random loopback port and returns its base URL,
/// prefix included.
pub async fn spawn_agent(configuration: OAuthAgentConfiguration) -> String {
    let configuration = web::Data::new(configuration);
    let token_client = web::Data::new(TokenClient::new());

    let server = HttpServer::new(move || {
        App::new()
            .app_data(configuration.clone())
            .app_data(token_client.clone())
            .service(agent_scope(ENDPOINTS_PREFIX))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("failed to bind the test agent");

    let addr = server.addrs()[0];
    rt::spawn(server.run());

    format!("http://{addr}{ENDPOINTS_PREFIX}")
}

/// An ID token the sanity checks accept: correct issuer and audience, and a
/// signature part that is never inspected.
pub fn unsigned_id_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "RS256" }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "iss": ISSUER,
            "aud": "spa-client",
            "sub": "user-123",
            "auth_time": 1700000000,
        })
        .to_string(),
    );
    format!("{header}.{payload}.signature")
}

pub fn token_response_body() -> Value {
    json!({
        "access_token": "access-token-42",
        "refresh_token": "refresh-token-42",
        "id_token": unsigned_id_token(),
        "token_type": "bearer",
        "expires_in": 300,
    })
}

pub async fn stub_token_endpoint(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(template)
        .mount(server)
        .await;
}

pub async fn stub_userinfo_endpoint(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/oauth/userinfo"))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Collapses a response's Set-Cookie headers into the string a browser would
/// send back, `name=value;name2=value2;`.
pub fn cookie_string(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(|pair| format!("{pair};"))
        .collect()
}

/// The name/value pairs set by a response, in header order.
pub fn set_cookies(response: &reqwest::Response) -> Vec<(String, String)> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| {
            pair.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
        })
        .collect()
}

/// The raw Set-Cookie header for one cookie, attributes included.
pub fn raw_set_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// Starts a login and returns the state from the authorization request URL
/// plus the temp login cookie string.
pub async fn start_login(http: &reqwest::Client, agent_base_url: &str) -> (String, String) {
    let response = http
        .post(format!("{agent_base_url}/login/start"))
        .header("origin", TRUSTED_ORIGIN)
        .send()
        .await
        .expect("login start request failed");
    assert_eq!(response.status().as_u16(), 200);

    let cookies = cookie_string(&response);
    let body: Value = response.json().await.expect("login start body");
    let url = body["authorizationRequestUrl"]
        .as_str()
        .expect("missing authorizationRequestUrl");

    let state = url
        .split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("state="))
        .expect("missing state parameter")
        .to_string();

    (state, cookies)
}

/// Runs a complete login and returns the end login status, body and the
/// session cookie string. An overridden state simulates a tampered response.
pub async fn perform_login(
    http: &reqwest::Client,
    agent_base_url: &str,
    state_override: Option<&str>,
) -> (u16, Value, String) {
    let (state, login_cookies) = start_login(http, agent_base_url).await;
    let state = state_override.unwrap_or(&state);

    let page_url = format!("{TRUSTED_ORIGIN}/?code=4a4246d6-b4bd-11ec-b909-0242ac120002&state={state}");
    let response = http
        .post(format!("{agent_base_url}/login/end"))
        .header("origin", TRUSTED_ORIGIN)
        .header("cookie", login_cookies)
        .json(&json!({ "pageUrl": page_url }))
        .send()
        .await
        .expect("login end request failed");

    let status = response.status().as_u16();
    let cookies = cookie_string(&response);
    let body: Value = response.json().await.expect("login end body");

    (status, body, cookies)
}
