use serde::{Deserialize, Serialize};

/// An extension parameter forwarded verbatim onto the authorization request
/// URL, e.g. `prompt`, `acr_values`, `claims` or `max_age`.
#[derive(Deserialize, Clone)]
pub struct ExtraParam {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StartLoginRequest {
    #[serde(default)]
    pub extra_params: Vec<ExtraParam>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLoginResponse {
    pub authorization_request_url: String,
}

/// The SPA posts its current URL here on every page load.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EndLoginRequest {
    pub page_url: Option<String>,
}

/// `handled` tells the SPA a login just completed; `isLoggedIn` tells it
/// whether to present a login option; `csrf` is only present for an
/// authenticated session.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndLoginResponse {
    pub handled: bool,
    pub is_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf: Option<String>,
}

/// The Authorization Server's end session URL for the browser to follow.
#[derive(Serialize)]
pub struct LogoutResponse {
    pub url: String,
}
