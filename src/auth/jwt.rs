use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

/// Identity carried in both token kinds.
pub struct TokenSubject<'a> {
    pub user_id: u64,
    pub username: &'a str,
    pub role: u8,
    pub employee_id: Option<u64>,
}

impl<'a> From<&'a Claims> for TokenSubject<'a> {
    fn from(c: &'a Claims) -> Self {
        Self {
            user_id: c.user_id,
            username: &c.sub,
            role: c.role,
            employee_id: c.employee_id,
        }
    }
}

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn claims_for(subject: &TokenSubject<'_>, token_type: TokenType, ttl: usize) -> Claims {
    Claims {
        user_id: subject.user_id,
        sub: subject.username.to_string(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id,
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_access_token(
    subject: &TokenSubject<'_>,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    sign(&claims_for(subject, TokenType::Access, ttl), secret)
}

pub fn generate_refresh_token(
    subject: &TokenSubject<'_>,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims_for(subject, TokenType::Refresh, ttl);
    let token = sign(&claims, secret)?;
    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-0123456789";

    fn subject() -> TokenSubject<'static> {
        TokenSubject {
            user_id: 7,
            username: "jdoe",
            role: 3,
            employee_id: Some(42),
        }
    }

    #[test]
    fn access_token_carries_identity() {
        let token = generate_access_token(&subject(), SECRET, 900).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.role, 3);
        assert_eq!(claims.employee_id, Some(42));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_tokens_get_unique_ids() {
        let (_, a) = generate_refresh_token(&subject(), SECRET, 60).unwrap();
        let (_, b) = generate_refresh_token(&subject(), SECRET, 60).unwrap();
        assert_eq!(a.token_type, TokenType::Refresh);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = generate_access_token(&subject(), SECRET, 900).unwrap();
        assert!(verify_token(&token, "another-secret-0123456789").is_err());

        let mut claims = claims_for(&subject(), TokenType::Access, 0);
        claims.exp = now().saturating_sub(3600);
        let expired = sign(&claims, SECRET).unwrap();
        assert!(verify_token(&expired, SECRET).is_err());
    }
}
