use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::models::jwt::Claims;

/// Signs a session token the way the auth provider does (HS256, shared
/// secret). The service itself never hands these out; the profile tests and
/// local tooling do.
pub fn jwt_encode(user_id: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 15 * 60,
        email: None,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn jwt_decode(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let decoded = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(decoded.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_subject() {
        let token = jwt_encode("user-1", "secret").unwrap();
        assert_eq!(jwt_decode(&token, "secret").unwrap().sub, "user-1");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = jwt_encode("user-1", "secret").unwrap();
        assert!(jwt_decode(&token, "other").is_err());
    }

    #[test]
    fn token_without_issued_at_is_accepted() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({ "sub": "user-2", "exp": exp }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let claims = jwt_decode(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user-2");
        assert_eq!(claims.iat, 0);
    }
}
