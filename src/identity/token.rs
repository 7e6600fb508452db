//! Bearer token codec: HS256 JWTs with the account identity as claims.
//! No expiry claim is asserted; deployments treat tokens as long-lived.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{codes, AppError};

pub const TOKEN_ISSUER: &str = "stowage";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub iss: String,
    pub remote_addr: String,
    pub token_id: String,
    pub account_id: String,
    pub name: String,
    pub username: String,
    pub is_owner: bool,
}

impl Claims {
    pub fn new(
        remote_addr: impl Into<String>,
        token_id: impl Into<String>,
        account_id: impl Into<String>,
        name: impl Into<String>,
        username: impl Into<String>,
        is_owner: bool,
    ) -> Self {
        Self {
            iss: TOKEN_ISSUER.to_string(),
            remote_addr: remote_addr.into(),
            token_id: token_id.into(),
            account_id: account_id.into(),
            name: name.into(),
            username: username.into(),
            is_owner,
        }
    }
}

pub fn issue_token(secret: &str, claims: &Claims) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| {
            tracing::error!("token encoding failed: {e}");
            AppError::server()
        })
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Tokens carry no exp claim; signature and issuer are the contract.
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation.set_issuer(&[TOKEN_ISSUER]);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::unauthorized(codes::INVALID_TOKEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims::new("127.0.0.1:9999", "tok-1", "acc-1", "A", "a@x", true)
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let token = issue_token("secret", &sample_claims()).unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims, sample_claims());
        assert_eq!(claims.iss, TOKEN_ISSUER);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("secret", &sample_claims()).unwrap();
        let err = verify_token("other-secret", &token).unwrap_err();
        assert_eq!(err.code_str(), codes::INVALID_TOKEN);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("secret", "not.a.jwt").is_err());
        assert!(verify_token("secret", "").is_err());
    }
}
