use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

/// Account kind carried in the token. Only clients may author reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    Developer,
    Client,
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "developer" => Ok(UserType::Developer),
            "client" => Ok(UserType::Client),
            other => Err(format!("unknown user type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub id: i32,
    pub email: String,
    pub user_type: UserType,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(id: i32, email: impl Into<String>, user_type: UserType, is_admin: bool) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            id,
            email: email.into(),
            user_type,
            is_admin,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    encode_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    decode_with_secret(token, &config::config().security.jwt_secret)
}

fn encode_with_secret(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

fn decode_with_secret(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_type: UserType) -> Claims {
        let now = Utc::now();
        Claims {
            id: 7,
            email: "ada@example.com".to_string(),
            user_type,
            is_admin: false,
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        }
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = encode_with_secret(&claims(UserType::Client), "first").unwrap();
        let err = decode_with_secret(&token, "second").unwrap_err();
        assert!(matches!(err, JwtError::InvalidToken(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut expired = claims(UserType::Developer);
        expired.exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = encode_with_secret(&expired, "secret").unwrap();
        assert!(decode_with_secret(&token, "secret").is_err());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let err = encode_with_secret(&claims(UserType::Client), "").unwrap_err();
        assert!(matches!(err, JwtError::InvalidSecret));
    }

    #[test]
    fn missing_admin_flag_defaults_to_false() {
        let json = r#"{"id":3,"email":"c@example.com","userType":"Client","exp":9999999999,"iat":0}"#;
        let parsed: Claims = serde_json::from_str(json).unwrap();
        assert!(!parsed.is_admin);
        assert_eq!(parsed.user_type, UserType::Client);
    }

    #[test]
    fn parses_user_type_case_insensitively() {
        assert_eq!("client".parse::<UserType>().unwrap(), UserType::Client);
        assert_eq!("Developer".parse::<UserType>().unwrap(), UserType::Developer);
        assert!("admin".parse::<UserType>().is_err());
    }
}
