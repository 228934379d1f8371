use crate::config::OAuthAgentConfiguration;
use crate::error::OAuthAgentError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

/// Decodes a JWT claim set without verifying the signature. ID tokens arrive
/// over the trusted back channel connection to the Authorization Server, so
/// the agent only performs sanity checks, not cryptographic verification.
pub fn id_token_claims(id_token: &str) -> Result<Value, OAuthAgentError> {
    let parts: Vec<&str> = id_token.split('.').collect();
    if parts.len() != 3 {
        return Err(OAuthAgentError::InvalidIdToken {
            log_info: "the ID token is not a three part JWT".to_string(),
        });
    }

    let payload = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|err| {
        OAuthAgentError::InvalidIdToken {
            log_info: format!("the ID token payload is not base64url encoded: {err}"),
        }
    })?;

    let claims: Value =
        serde_json::from_slice(&payload).map_err(|err| OAuthAgentError::InvalidIdToken {
            log_info: format!("the ID token payload is not a JSON claim set: {err}"),
        })?;

    if !claims.is_object() {
        return Err(OAuthAgentError::InvalidIdToken {
            log_info: "the ID token payload is not a JSON object".to_string(),
        });
    }

    Ok(claims)
}

/// Sanity checks that the received ID token was issued by the configured
/// Authorization Server for this client: `iss` must equal the configured
/// issuer, the configured client id must appear in `aud` (string or array
/// form), and when the audience has more than one entry or an `azp` claim is
/// present, `azp` must equal the client id. This guards against a
/// misconfigured or substituted client, not against signature forgery.
pub fn validate_id_token(
    config: &OAuthAgentConfiguration,
    id_token: &str,
) -> Result<(), OAuthAgentError> {
    let claims = id_token_claims(id_token)?;

    if claims.get("iss").and_then(Value::as_str) != Some(config.issuer.as_str()) {
        return Err(OAuthAgentError::InvalidIdToken {
            log_info: "unexpected iss claim".to_string(),
        });
    }

    let audience = audience_claim(claims.get("aud"));
    if !audience.iter().any(|aud| aud == &config.client_id) {
        return Err(OAuthAgentError::InvalidIdToken {
            log_info: "unexpected aud claim".to_string(),
        });
    }

    let azp = claims.get("azp").and_then(Value::as_str);
    if (audience.len() > 1 || azp.is_some()) && azp != Some(config.client_id.as_str()) {
        return Err(OAuthAgentError::InvalidIdToken {
            log_info: "unexpected azp claim".to_string(),
        });
    }

    Ok(())
}

fn audience_claim(aud: Option<&Value>) -> Vec<&str> {
    match aud {
        Some(Value::String(aud)) => vec![aud.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn unsigned_jwt(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(json!({"alg": "none"}).to_string());
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn test_valid_id_token_passes() {
        let config = OAuthAgentConfiguration::test_default();
        let id_token = unsigned_jwt(&json!({
            "iss": "https://login.example.com/oauth",
            "aud": "spa-client",
            "sub": "user-123",
        }));

        assert!(validate_id_token(&config, &id_token).is_ok());
    }

    #[test]
    fn test_unexpected_issuer_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let id_token = unsigned_jwt(&json!({
            "iss": "https://evil.example.com",
            "aud": "spa-client",
        }));

        let result = validate_id_token(&config, &id_token);

        assert!(matches!(
            result,
            Err(OAuthAgentError::InvalidIdToken { log_info }) if log_info.contains("iss")
        ));
    }

    #[test]
    fn test_audience_array_containing_client_passes_with_azp() {
        let config = OAuthAgentConfiguration::test_default();
        let id_token = unsigned_jwt(&json!({
            "iss": "https://login.example.com/oauth",
            "aud": ["spa-client", "api-client"],
            "azp": "spa-client",
        }));

        assert!(validate_id_token(&config, &id_token).is_ok());
    }

    #[test]
    fn test_audience_missing_client_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let id_token = unsigned_jwt(&json!({
            "iss": "https://login.example.com/oauth",
            "aud": ["api-client", "other-client"],
        }));

        let result = validate_id_token(&config, &id_token);

        assert!(matches!(
            result,
            Err(OAuthAgentError::InvalidIdToken { log_info }) if log_info.contains("aud")
        ));
    }

    #[test]
    fn test_multi_audience_without_azp_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let id_token = unsigned_jwt(&json!({
            "iss": "https://login.example.com/oauth",
            "aud": ["spa-client", "api-client"],
        }));

        let result = validate_id_token(&config, &id_token);

        assert!(matches!(
            result,
            Err(OAuthAgentError::InvalidIdToken { log_info }) if log_info.contains("azp")
        ));
    }

    #[test]
    fn test_azp_for_another_client_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let id_token = unsigned_jwt(&json!({
            "iss": "https://login.example.com/oauth",
            "aud": "spa-client",
            "azp": "api-client",
        }));

        let result = validate_id_token(&config, &id_token);

        assert!(matches!(
            result,
            Err(OAuthAgentError::InvalidIdToken { log_info }) if log_info.contains("azp")
        ));
    }

    #[test]
    fn test_two_part_token_fails() {
        let config = OAuthAgentConfiguration::test_default();

        let result = validate_id_token(&config, "header.payload");

        assert!(matches!(result, Err(OAuthAgentError::InvalidIdToken { .. })));
    }

    #[test]
    fn test_non_json_payload_fails() {
        let config = OAuthAgentConfiguration::test_default();
        let id_token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"));

        let result = validate_id_token(&config, &id_token);

        assert!(matches!(result, Err(OAuthAgentError::InvalidIdToken { .. })));
    }

    #[test]
    fn test_claims_are_returned_for_the_claims_endpoint() {
        let claims = json!({
            "iss": "https://login.example.com/oauth",
            "aud": "spa-client",
            "sub": "user-123",
            "auth_time": 1700000000,
        });
        let id_token = unsigned_jwt(&claims);

        let decoded = id_token_claims(&id_token).unwrap();

        assert_eq!(decoded, claims);
    }
}
