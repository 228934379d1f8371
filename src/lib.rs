#![doc = r#"
# actix-oauth-agent

An OAuth Agent (backend for frontend "token handler") for the
[Actix web framework](https://actix.rs), designed to run the OpenID Connect
authorization code flow with PKCE on behalf of a browser-based SPA.

The agent keeps every OAuth token on the server side. The browser only ever
receives encrypted, HTTP-only, SameSite cookies plus an anti-forgery token it
echoes back in a request header, so no bearer token is reachable from
JavaScript.

# Endpoints

All paths are relative to the configured endpoints prefix:

- `POST /login/start` — returns the authorization request URL and stores the
  PKCE verifier and state in a temporary encrypted cookie.
- `POST /login/end` — the SPA posts its current URL on every page load; when
  it is an OAuth response the agent swaps the code for tokens and writes the
  session cookies, otherwise it reports the current session state.
- `POST /refresh` — runs the refresh token grant and rewrites the cookies.
- `GET /userInfo` — calls the User Info endpoint with the stored access token.
- `GET /claims` — returns the ID token claims without a network round trip.
- `GET /logout` (or `POST`) — clears the session cookies and returns the
  Authorization Server's end session URL.

# Getting started

```rust,ignore
use actix_oauth_agent::{
    config::OAuthAgentConfiguration, middleware::RequestLog, route::agent_scope,
    token::TokenClient,
};
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let configuration = OAuthAgentConfiguration::from_env()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let port = configuration.port;
    let prefix = configuration.endpoints_prefix.clone();

    let configuration = web::Data::new(configuration);
    let token_client = web::Data::new(TokenClient::new());

    HttpServer::new(move || {
        App::new()
            .app_data(configuration.clone())
            .app_data(token_client.clone())
            .wrap(RequestLog::new())
            .service(agent_scope(&prefix))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
```

Configuration is read from the environment once at startup, see
[`config::OAuthAgentConfiguration::from_env`] for the variable names. The
encryption key is a hex encoded 32 byte AES-256-GCM key, for example from
`openssl rand -hex 32`.
"#]

pub mod config;
pub mod cookie;
pub mod encryption;
pub(crate) mod env_var;
pub mod error;
pub mod id_token;
pub mod login;
pub mod middleware;
pub mod route;
pub mod token;
pub mod types;
pub mod validate;
