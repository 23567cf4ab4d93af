use base64::Engine;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT bearer. Opaque tokens yield `None`.
pub fn jwt_expiration(token_value: &str) -> Option<i64> {
    let mut parts = token_value.split('.');
    let (Some(_), Some(payload), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return None;
    };

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .inspect_err(|e| debug!("jwt payload is not base64url: {}", e))
        .ok()?;

    let exp = serde_json::from_slice::<JwtClaims>(&decoded)
        .inspect_err(|e| debug!("jwt payload is not json: {}", e))
        .ok()?
        .exp;
    debug!(expires_at = ?exp, "jwt parsed");
    exp
}
