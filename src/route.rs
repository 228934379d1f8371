use crate::config::OAuthAgentConfiguration;
use crate::cookie::{
    access_token_cookie_name, auth_cookie_name, cookies_for_token_response, cookies_for_unset,
    csrf_cookie_name, id_cookie_name, temp_login_data_cookie, temp_login_data_cookie_for_unset,
    temp_login_data_cookie_name,
};
use crate::encryption::{decrypt_cookie, CryptoError};
use crate::error::OAuthAgentError;
use crate::id_token::{id_token_claims, validate_id_token};
use crate::login::{
    create_authorization_request, parse_authorization_response, url_encode,
    AuthorizationCodeResponse,
};
use crate::token::TokenClient;
use crate::types::{
    EndLoginRequest, EndLoginResponse, LogoutResponse, StartLoginRequest, StartLoginResponse,
};
use crate::validate::{validate_request, ValidateRequestOptions};
use actix_web::{get, post, route, web, HttpRequest, HttpResponse, ResponseError, Scope};
use oauth2::CsrfToken;
use serde_json::json;

/// Wires every agent endpoint under the configured endpoints prefix.
pub fn agent_scope(prefix: &str) -> Scope {
    web::scope(prefix)
        .service(start_login)
        .service(end_login)
        .service(refresh)
        .service(user_info)
        .service(claims)
        .service(logout)
}

/// Starts a login: builds the PKCE authorization request and stores the
/// verifier and state in the temp login cookie. The browser does not hold a
/// CSRF cookie yet, so only the origin is checked.
#[post("/login/start")]
pub(crate) async fn start_login(
    req: HttpRequest,
    body: Option<web::Json<StartLoginRequest>>,
    config: web::Data<OAuthAgentConfiguration>,
) -> Result<HttpResponse, OAuthAgentError> {
    validate_request(&req, &ValidateRequestOptions::origin_only(), &config)?;

    let extra_params = body.map(|b| b.into_inner().extra_params).unwrap_or_default();
    let request_data = create_authorization_request(&config, &extra_params);

    let temp_cookie =
        temp_login_data_cookie(&config, &request_data.code_verifier, &request_data.state)
            .map_err(cookie_write_error)?;

    Ok(HttpResponse::Ok()
        .cookie(temp_cookie)
        .json(StartLoginResponse {
            authorization_request_url: request_data.authorization_request_url,
        }))
}

/// The SPA posts its current URL here on every page load. When the URL is an
/// authorization response the login is completed and the session cookies are
/// written; when it is an error response the classified failure is returned;
/// otherwise the existing session state is reported unchanged.
#[post("/login/end")]
pub(crate) async fn end_login(
    req: HttpRequest,
    body: Option<web::Json<EndLoginRequest>>,
    config: web::Data<OAuthAgentConfiguration>,
    token_client: web::Data<TokenClient>,
) -> Result<HttpResponse, OAuthAgentError> {
    validate_request(&req, &ValidateRequestOptions::origin_only(), &config)?;

    let page_url = body.as_ref().and_then(|b| b.page_url.as_deref());
    let prefix = &config.cookie_name_prefix;

    match parse_authorization_response(page_url) {
        // A failed login consumes the temp login cookie too
        Err(err) => Ok(login_failure_response(&err, &config)),
        Ok(Some(response)) => match complete_login(&req, &response, &config, &token_client).await {
            Ok(http_response) => Ok(http_response),
            Err(err) => Ok(login_failure_response(&err, &config)),
        },
        Ok(None) => {
            // Not an OAuth response: report session state from the cookies.
            // The refresh cookie is scoped to the refresh endpoint, so the
            // root scoped access token cookie is the signal visible here.
            let is_logged_in = req.cookie(&access_token_cookie_name(prefix)).is_some();

            let csrf = if is_logged_in {
                let csrf_cookie = req.cookie(&csrf_cookie_name(prefix)).ok_or_else(|| {
                    OAuthAgentError::missing_cookie(
                        "no CSRF cookie was supplied during an authenticated page load",
                    )
                })?;
                let csrf_token = decrypt_cookie(&config.encryption_key, csrf_cookie.value())
                    .map_err(|err| {
                        OAuthAgentError::invalid_cookie(
                            "unable to decrypt the CSRF cookie during an authenticated page load",
                            err,
                        )
                    })?;
                Some(csrf_token)
            } else {
                None
            };

            Ok(HttpResponse::Ok().json(EndLoginResponse {
                handled: false,
                is_logged_in,
                csrf,
            }))
        }
    }
}

/// The main OAuth response handling: code exchange, ID token sanity checks,
/// CSRF reuse-or-mint, then the session cookies. Cookies are only written
/// after the whole outcome is classified as a success.
async fn complete_login(
    req: &HttpRequest,
    response: &AuthorizationCodeResponse,
    config: &OAuthAgentConfiguration,
    token_client: &TokenClient,
) -> Result<HttpResponse, OAuthAgentError> {
    let prefix = &config.cookie_name_prefix;

    let temp_cookie = req.cookie(&temp_login_data_cookie_name(prefix));
    let token_response = token_client
        .exchange_code(
            config,
            &response.code,
            &response.state,
            temp_cookie.as_ref().map(|c| c.value()),
        )
        .await?;

    if let Some(id_token) = &token_response.id_token {
        validate_id_token(config, id_token)?;
    }

    // Reuse the CSRF token when the user signs in from a second tab, so the
    // first tab's copy stays valid. A cookie written under a rotated
    // encryption key fails to decrypt, then a fresh token is minted instead.
    let csrf_token = match req.cookie(&csrf_cookie_name(prefix)) {
        Some(cookie) => decrypt_cookie(&config.encryption_key, cookie.value())
            .unwrap_or_else(|_| generate_csrf_token()),
        None => generate_csrf_token(),
    };

    let cookies = cookies_for_token_response(&token_response, config, true, Some(&csrf_token))
        .map_err(cookie_write_error)?;

    let mut builder = HttpResponse::Ok();
    for cookie in cookies {
        builder.cookie(cookie);
    }
    Ok(builder.json(EndLoginResponse {
        handled: true,
        is_logged_in: true,
        csrf: Some(csrf_token),
    }))
}

/// A login that was handled but failed: the classified error is returned and
/// the temp login cookie is discarded, it is consumed either way.
fn login_failure_response(err: &OAuthAgentError, config: &OAuthAgentConfiguration) -> HttpResponse {
    err.log();
    HttpResponse::build(err.status_code())
        .cookie(temp_login_data_cookie_for_unset(config))
        .json(json!({
            "code": err.code(),
            "message": err.to_string(),
        }))
}

/// Runs the refresh token grant with the refresh token from the auth cookie
/// and rewrites the session cookies. When the Authorization Server reports
/// the session as over, the 401 response also clears every session cookie.
#[post("/refresh")]
pub(crate) async fn refresh(
    req: HttpRequest,
    config: web::Data<OAuthAgentConfiguration>,
    token_client: web::Data<TokenClient>,
) -> Result<HttpResponse, OAuthAgentError> {
    validate_request(&req, &ValidateRequestOptions::default(), &config)?;

    let auth_cookie = req
        .cookie(&auth_cookie_name(&config.cookie_name_prefix))
        .ok_or_else(|| {
            OAuthAgentError::missing_cookie("no auth cookie was supplied in a call to refresh")
        })?;
    let refresh_token =
        decrypt_cookie(&config.encryption_key, auth_cookie.value()).map_err(|err| {
            OAuthAgentError::invalid_cookie("unable to decrypt the auth cookie to refresh tokens", err)
        })?;

    match token_client.refresh_access_token(&config, &refresh_token).await {
        Ok(token_response) => {
            // Rewrite only the cookies for values actually returned, so a
            // response without a rotated refresh token keeps the old cookie
            let cookies = cookies_for_token_response(&token_response, &config, false, None)
                .map_err(cookie_write_error)?;

            let mut builder = HttpResponse::NoContent();
            for cookie in cookies {
                builder.cookie(cookie);
            }
            Ok(builder.finish())
        }
        Err(err) if err.is_session_expired() => Ok(session_expired_response(&err, &config)),
        Err(err) => Err(err),
    }
}

/// Returns user info from the User Info endpoint, authenticated with the
/// access token stored in the access token cookie.
#[get("/userInfo")]
pub(crate) async fn user_info(
    req: HttpRequest,
    config: web::Data<OAuthAgentConfiguration>,
    token_client: web::Data<TokenClient>,
) -> Result<HttpResponse, OAuthAgentError> {
    validate_request(&req, &ValidateRequestOptions::origin_only(), &config)?;

    let at_cookie = req
        .cookie(&access_token_cookie_name(&config.cookie_name_prefix))
        .ok_or_else(|| {
            OAuthAgentError::missing_cookie(
                "no access token cookie was supplied in a call to get user info",
            )
        })?;
    let access_token = decrypt_cookie(&config.encryption_key, at_cookie.value()).map_err(|err| {
        OAuthAgentError::invalid_cookie(
            "unable to decrypt the access token cookie to get user info",
            err,
        )
    })?;

    let user_data = token_client.user_info(&config, &access_token).await?;
    Ok(HttpResponse::Ok().json(user_data))
}

/// Returns the ID token claims from the ID cookie, decoded locally without a
/// round trip to the Authorization Server.
#[get("/claims")]
pub(crate) async fn claims(
    req: HttpRequest,
    config: web::Data<OAuthAgentConfiguration>,
) -> Result<HttpResponse, OAuthAgentError> {
    validate_request(&req, &ValidateRequestOptions::origin_only(), &config)?;

    let id_cookie = req
        .cookie(&id_cookie_name(&config.cookie_name_prefix))
        .ok_or_else(|| {
            OAuthAgentError::missing_cookie("no ID cookie was supplied in a call to get claims")
        })?;
    let id_token = decrypt_cookie(&config.encryption_key, id_cookie.value()).map_err(|err| {
        OAuthAgentError::invalid_cookie("unable to decrypt the ID cookie to get claims", err)
    })?;

    Ok(HttpResponse::Ok().json(id_token_claims(&id_token)?))
}

/// Ends the session: clears every session cookie and returns the
/// Authorization Server's end session URL for the browser to follow.
#[route("/logout", method = "GET", method = "POST")]
pub(crate) async fn logout(
    req: HttpRequest,
    config: web::Data<OAuthAgentConfiguration>,
) -> Result<HttpResponse, OAuthAgentError> {
    validate_request(&req, &ValidateRequestOptions::default(), &config)?;

    if req
        .cookie(&access_token_cookie_name(&config.cookie_name_prefix))
        .is_none()
    {
        return Err(OAuthAgentError::missing_cookie(
            "no session cookie was supplied in a call to logout",
        ));
    }

    let mut builder = HttpResponse::Ok();
    for cookie in cookies_for_unset(&config) {
        builder.cookie(cookie);
    }
    Ok(builder.json(LogoutResponse {
        url: logout_url(&config),
    }))
}

fn logout_url(config: &OAuthAgentConfiguration) -> String {
    let mut url = format!(
        "{}?client_id={}",
        config.logout_endpoint,
        url_encode(&config.client_id)
    );
    if let Some(post_logout_redirect_uri) = &config.post_logout_redirect_uri {
        url.push_str("&post_logout_redirect_uri=");
        url.push_str(&url_encode(post_logout_redirect_uri));
    }
    url
}

fn generate_csrf_token() -> String {
    CsrfToken::new_random_len(32).secret().to_owned()
}

fn cookie_write_error(err: CryptoError) -> OAuthAgentError {
    OAuthAgentError::Unhandled {
        log_info: format!("a session cookie could not be written: {err}"),
    }
}

/// The boundary clears the session cookies whenever the classified outcome is
/// `session_expired`, so the browser drops the dead session.
fn session_expired_response(
    err: &OAuthAgentError,
    config: &OAuthAgentConfiguration,
) -> HttpResponse {
    err.log();
    let mut builder = HttpResponse::build(err.status_code());
    for cookie in cookies_for_unset(config) {
        builder.cookie(cookie);
    }
    builder.json(json!({
        "code": err.code(),
        "message": err.to_string(),
    }))
}
