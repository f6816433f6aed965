//! Verification of Clerk session tokens.
//!
//! Clerk signs session JWTs with RS256; the instance's PEM public key is
//! configured through `CLERK_PEM_PUBLIC_KEY`, so no network round trip is
//! needed per request.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClerkClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub azp: Option<String>,
}

pub struct ClerkVerifier {
    key: Option<DecodingKey>,
    issuer: Option<String>,
}

impl ClerkVerifier {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let key = match config.clerk_pem_public_key.as_deref() {
            Some(pem) if !pem.trim().is_empty() => {
                // Env files tend to carry the PEM with literal "\n".
                let pem = pem.replace("\\n", "\n");
                Some(DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
                    AppError::Internal(format!("Invalid Clerk public key: {}", e))
                })?)
            }
            _ => {
                tracing::warn!("CLERK_PEM_PUBLIC_KEY not set, Clerk sign-in is disabled");
                None
            }
        };

        Ok(Self {
            key,
            issuer: config.clerk_issuer.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn verify(&self, token: &str) -> Result<ClerkClaims, AppError> {
        let Some(key) = &self.key else {
            return Err(AppError::Authentication(
                "Clerk authentication is not configured".to_string(),
            ));
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 30;
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<ClerkClaims>(token, key, &validation)?;
        Ok(data.claims)
    }
}

pub fn bearer_token<'a>(request: &'a Request<'_>) -> Option<&'a str> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A verified Clerk session token taken from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct ClerkToken(pub ClerkClaims);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClerkToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(token) = bearer_token(request) else {
            tracing::warn!("No Clerk token provided");
            return Outcome::Error((Status::Unauthorized, ()));
        };

        let Some(verifier) = request.rocket().state::<ClerkVerifier>() else {
            tracing::error!("Clerk verifier not found in managed state");
            return Outcome::Error((Status::InternalServerError, ()));
        };

        match verifier.verify(token) {
            Ok(claims) => Outcome::Success(ClerkToken(claims)),
            Err(err) => {
                err.log_and_record("Clerk token guard");
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}
