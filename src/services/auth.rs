use axum::http::HeaderMap;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Customer bearer token: `<user_id>.<base64 HMAC-SHA1(user_id)>`.
pub fn issue_user_token(secret: &str, user_id: i64) -> anyhow::Result<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid session secret: {e}"))?;
    mac.update(user_id.to_string().as_bytes());
    let signature = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{user_id}.{signature}"))
}

/// Returns the authenticated user id, or `None` for any malformed or forged token.
pub fn verify_user_token(secret: &str, token: &str) -> Option<i64> {
    let (id_part, signature) = token.trim().split_once('.')?;
    let user_id: i64 = id_part.parse().ok()?;
    let signature = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(signature)
        .ok()?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id_part.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(user_id)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Resolves the caller's user id from the `Authorization` header.
pub fn authenticate_user(headers: &HeaderMap, secret: &str) -> Option<i64> {
    bearer_token(headers).and_then(|token| verify_user_token(secret, token))
}

pub fn is_admin(headers: &HeaderMap, admin_token: &str) -> bool {
    !admin_token.is_empty() && bearer_token(headers) == Some(admin_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_issue_then_verify() {
        let token = issue_user_token("secret", 42).unwrap();
        assert!(token.starts_with("42."));
        assert_eq!(verify_user_token("secret", &token), Some(42));
    }

    #[test]
    fn test_forged_tokens_rejected() {
        let token = issue_user_token("secret", 42).unwrap();
        assert_eq!(verify_user_token("other-secret", &token), None);

        let signature = token.split_once('.').unwrap().1;
        assert_eq!(verify_user_token("secret", &format!("7.{signature}")), None);
        assert_eq!(verify_user_token("secret", "42"), None);
        assert_eq!(verify_user_token("secret", "abc.def"), None);
    }

    #[test]
    fn test_authenticate_from_header() {
        let token = issue_user_token("secret", 6).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(authenticate_user(&headers, "secret"), Some(6));
        assert!(!is_admin(&headers, "admin"));
    }
}
