use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{model::role::Role, models::Claims};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn generate_access_token(
    user_id: u64,
    email: String,
    roles: Vec<Role>,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    let claims = Claims {
        user_id,
        sub: email,
        roles,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
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

    #[test]
    fn issued_token_verifies_with_same_secret_only() {
        let token =
            generate_access_token(9, "a@b.my".into(), vec![Role::Pentadbir], "s3cret", 60).unwrap();

        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.user_id, 9);
        assert_eq!(claims.roles, vec![Role::Pentadbir]);
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            user_id: 1,
            sub: "a@b.my".into(),
            roles: vec![Role::Guru],
            exp: now() - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();

        assert!(verify_token(&token, "s3cret").is_err());
    }
}
