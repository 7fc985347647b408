use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

/// Identity carried inside every token.
#[derive(Debug, Clone)]
pub struct Subject {
    pub user_id: u64,
    pub username: String,
    pub role: u8,
    pub employee_id: Option<u64>,
}

impl From<&Claims> for Subject {
    fn from(c: &Claims) -> Self {
        Subject {
            user_id: c.user_id,
            username: c.sub.clone(),
            role: c.role,
            employee_id: c.employee_id,
        }
    }
}

pub fn issue_token(
    subject: &Subject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        exp: Utc::now().timestamp().max(0) as usize + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

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

    fn subject() -> Subject {
        Subject {
            user_id: 9,
            username: "hr.admin".into(),
            role: 2,
            employee_id: Some(1000),
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret_only() {
        let (token, claims) = issue_token(&subject(), TokenType::Refresh, "s3cret", 60).unwrap();
        let decoded = verify_token(&token, "s3cret").unwrap();
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.token_type, TokenType::Refresh);
        assert_eq!(decoded.employee_id, Some(1000));

        assert!(verify_token(&token, "other").is_err());
    }
}
