//! Bearer-token authentication for solver (C7) and subscriber (C8)
//! sessions. Tokens are short-lived and issuer-bound; this process only
//! verifies them (§4.7, §6) — issuance is a separate, out-of-scope service.

use {jsonwebtoken::{DecodingKey, Validation}, serde::Deserialize};

#[derive(Debug, Deserialize, serde::Serialize)]
pub struct Claims {
    /// The authenticated identity: a solver's or client's address, as a
    /// checksummed hex string.
    pub sub: String,
    pub aud: String,
    pub exp: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    Malformed,
    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
}

/// Verifies an HS256 bearer token against `secret`, requiring `audience`.
#[derive(Clone)]
pub struct AuthVerifier {
    secret: Vec<u8>,
    audience: &'static str,
}

impl AuthVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, audience: &'static str) -> Self {
        Self { secret: secret.into(), audience }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.set_audience(&[self.audience]);
        let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)?;
        Ok(data.claims)
    }
}

/// Strips the `Bearer ` prefix clients are expected to send.
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    header_value.strip_prefix("Bearer ").ok_or(AuthError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(secret: &[u8], audience: &str, exp: usize) -> String {
        let claims = Claims { sub: "0xsolver".to_owned(), aud: audience.to_owned(), exp };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn accepts_a_token_with_matching_audience() {
        let verifier = AuthVerifier::new(b"secret".to_vec(), "solver");
        let exp = (chrono::Utc::now() + chrono::Duration::minutes(5)).timestamp() as usize;
        let claims = verifier.verify(&token(b"secret", "solver", exp)).unwrap();
        assert_eq!(claims.sub, "0xsolver");
    }

    #[test]
    fn rejects_a_token_with_the_wrong_audience() {
        let verifier = AuthVerifier::new(b"secret".to_vec(), "solver");
        let exp = (chrono::Utc::now() + chrono::Duration::minutes(5)).timestamp() as usize;
        assert!(verifier.verify(&token(b"secret", "client", exp)).is_err());
    }

    #[test]
    fn rejects_an_expired_token() {
        let verifier = AuthVerifier::new(b"secret".to_vec(), "solver");
        let exp = (chrono::Utc::now() - chrono::Duration::minutes(5)).timestamp() as usize;
        assert!(verifier.verify(&token(b"secret", "solver", exp)).is_err());
    }

    #[test]
    fn bearer_token_strips_prefix() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(bearer_token("abc.def.ghi").is_err());
    }
}
