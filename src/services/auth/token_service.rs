use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 bearer tokens carrying the user id as `sub`. Stateless: nothing is
/// stored server side and tokens cannot be revoked before expiry.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenService")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway", &self.validation.leeway)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: u64, leeway_seconds: u64) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = leeway_seconds;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
        })
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        let expires_at = now
            .checked_add_signed(Duration::seconds(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the user id embedded in a valid, unexpired token.
    pub fn validate(&self, token: &str) -> Result<Uuid, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", 7 * 24 * 3600, 60).unwrap()
    }

    #[test]
    fn issued_token_validates_to_the_same_user() {
        let s = service();
        let user = Uuid::new_v4();
        let issued = s.issue(user).unwrap();
        assert_eq!(s.validate(&issued.token).unwrap(), user);
    }

    #[test]
    fn expired_and_malformed_tokens_are_told_apart() {
        let s = service();
        let old = s
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(8))
            .unwrap();
        assert!(matches!(s.validate(&old.token), Err(TokenError::Expired)));
        assert!(matches!(s.validate("not.a.token"), Err(TokenError::Invalid)));
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let other = TokenService::new("other-secret", 3600, 0).unwrap();
        let token = other.issue(Uuid::new_v4()).unwrap().token;
        assert!(matches!(service().validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn leeway_tolerates_slightly_expired_tokens() {
        let s = TokenService::new("test-secret", 10, 60).unwrap();
        let token = s
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::seconds(30))
            .unwrap()
            .token;
        assert!(s.validate(&token).is_ok());
    }

    #[test]
    fn blank_secret_is_refused() {
        assert!(matches!(
            TokenService::new("  ", 3600, 60),
            Err(TokenError::MissingSecret)
        ));
    }
}
