//! # Identity Providers
//!
//! The gateway never talks to the identity provider on the request path. Session
//! tokens are RS256 JWTs signed with the provider instance's key pair, so
//! verification is a local signature and claims check against public keys loaded
//! once at startup: either a PEM key (`CLERK_JWT_KEY`) or the instance's JWKS,
//! fetched from the provider's backend API with the secret key.
//!
//! [`IdentityVerifier`] is the seam handlers depend on; [`JwtSessionVerifier`] is the
//! production implementation. Tests substitute their own verifier.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::IdentityConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::{Principal, Role, SessionStatus};

/// Resolves a raw credential into an authenticated principal
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> GatewayResult<Principal>;
}

/// Claims of a provider-issued session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Authorized party (origin of the frontend that requested the token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    /// Session id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Session status (`active`, `pending`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sts: Option<String>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// Custom session claims configured on the identity provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl From<SessionClaims> for Principal {
    fn from(claims: SessionClaims) -> Self {
        let role = claims
            .metadata
            .role
            .as_deref()
            .and_then(|role| role.parse::<Role>().ok());

        Principal {
            id: claims.sub,
            role,
            session_status: SessionStatus::from_claim(claims.sts.as_deref()),
        }
    }
}

/// Public keys session tokens may be signed with
enum SigningKeys {
    /// A single PEM key; the token's `kid` is not consulted
    Pem(DecodingKey),
    /// JWKS keys by key id
    Jwks(HashMap<String, DecodingKey>),
}

/// Verifies RS256 session tokens locally with `jsonwebtoken`
pub struct JwtSessionVerifier {
    keys: SigningKeys,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl JwtSessionVerifier {
    /// Build a verifier from the identity configuration.
    ///
    /// A PEM public key is used as is. Otherwise the JWKS is fetched once with
    /// the secret key; a provider outage at startup is a startup failure.
    pub async fn from_config(config: &IdentityConfig) -> GatewayResult<Self> {
        match (&config.jwt_public_key, &config.secret_key) {
            (Some(pem), _) => Self::from_pem(pem, config),
            (None, Some(secret)) => {
                let jwks = fetch_jwks(&config.api_url, secret).await?;
                Self::from_jwks(&jwks, config)
            }
            (None, None) => Err(GatewayError::config(
                "No key configured for session token verification",
            )),
        }
    }

    pub fn from_pem(pem: &str, config: &IdentityConfig) -> GatewayResult<Self> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| GatewayError::config(format!("Invalid CLERK_JWT_KEY: {}", e)))?;
        Self::with_keys(SigningKeys::Pem(key), config)
    }

    /// Use the RSA keys of a JWKS document; keys of other types are skipped
    pub fn from_jwks(jwks: &JwkSet, config: &IdentityConfig) -> GatewayResult<Self> {
        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let (Some(kid), AlgorithmParameters::RSA(_)) = (&jwk.common.key_id, &jwk.algorithm) else {
                continue;
            };
            let key = DecodingKey::from_jwk(jwk)
                .map_err(|e| GatewayError::config(format!("Invalid JWKS key {}: {}", kid, e)))?;
            keys.insert(kid.clone(), key);
        }

        if keys.is_empty() {
            return Err(GatewayError::config("JWKS contains no RSA signing keys"));
        }
        info!(keys = keys.len(), "Loaded session signing keys");
        Self::with_keys(SigningKeys::Jwks(keys), config)
    }

    fn with_keys(keys: SigningKeys, config: &IdentityConfig) -> GatewayResult<Self> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = config.clock_skew.as_secs();
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        if let Some(publishable_key) = &config.publishable_key {
            let issuer = issuer_from_publishable_key(publishable_key)?;
            debug!(issuer = %issuer, "Session tokens must match issuer");
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            keys,
            validation,
            authorized_parties: config.authorized_parties.clone(),
        })
    }

    fn key_for(&self, credential: &str) -> GatewayResult<&DecodingKey> {
        match &self.keys {
            SigningKeys::Pem(key) => Ok(key),
            SigningKeys::Jwks(keys) => {
                let header = decode_header(credential)?;
                let kid = header
                    .kid
                    .ok_or_else(|| GatewayError::unauthenticated("token header has no kid"))?;
                keys.get(&kid)
                    .ok_or_else(|| GatewayError::unauthenticated(format!("unknown signing key {}", kid)))
            }
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtSessionVerifier {
    async fn verify(&self, credential: &str) -> GatewayResult<Principal> {
        let key = self.key_for(credential)?;
        let token = decode::<SessionClaims>(credential, key, &self.validation)?;
        let claims = token.claims;

        if !self.authorized_parties.is_empty() {
            let allowed = claims
                .azp
                .as_ref()
                .map_or(false, |azp| self.authorized_parties.contains(azp));
            if !allowed {
                return Err(GatewayError::unauthenticated(format!(
                    "authorized party {:?} not accepted",
                    claims.azp
                )));
            }
        }

        Ok(Principal::from(claims))
    }
}

/// Fetch the instance's signing keys from the provider's backend API
pub async fn fetch_jwks(api_url: &str, secret_key: &str) -> GatewayResult<JwkSet> {
    let url = format!("{}/v1/jwks", api_url.trim_end_matches('/'));
    let load_error = |e: reqwest::Error| GatewayError::config(format!("Failed to load JWKS from {}: {}", url, e));

    let response = reqwest::Client::new()
        .get(&url)
        .bearer_auth(secret_key)
        .send()
        .await
        .map_err(load_error)?
        .error_for_status()
        .map_err(load_error)?;

    response.json::<JwkSet>().await.map_err(load_error)
}

/// Derive the token issuer from a publishable key.
///
/// Publishable keys look like `pk_<env>_<base64("<frontend-api-host>$")>`.
pub fn issuer_from_publishable_key(key: &str) -> GatewayResult<String> {
    let encoded = key
        .strip_prefix("pk_test_")
        .or_else(|| key.strip_prefix("pk_live_"))
        .ok_or_else(|| GatewayError::config("Publishable key must start with pk_test_ or pk_live_"))?;

    let engine = GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    );
    let decoded = engine
        .decode(encoded)
        .map_err(|e| GatewayError::config(format!("Invalid publishable key encoding: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| GatewayError::config("Publishable key is not valid UTF-8"))?;

    let host = decoded
        .strip_suffix('$')
        .filter(|host| !host.is_empty())
        .ok_or_else(|| GatewayError::config("Publishable key does not encode a frontend API host"))?;

    Ok(format!("https://{}", host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::Duration;

    const SIGNING_KEY: &str = include_str!("../../tests/fixtures/session_signing_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/session_signing_key.pub.pem");
    const JWKS: &str = include_str!("../../tests/fixtures/jwks.json");
    const KID: &str = "ins_test_key";

    fn claims(sub: &str, sts: Option<&str>, role: Option<&str>, ttl: i64) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: sub.to_string(),
            exp: now + ttl,
            nbf: Some(now - 10),
            iat: Some(now),
            iss: Some("https://clerk.example.com".to_string()),
            azp: Some("https://app.example.com".to_string()),
            sid: Some("sess_1".to_string()),
            sts: sts.map(str::to_string),
            metadata: SessionMetadata {
                role: role.map(str::to_string),
            },
        }
    }

    fn sign(claims: &SessionClaims, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        encode(
            &header,
            claims,
            &EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    fn config(configure: impl FnOnce(&mut IdentityConfig)) -> IdentityConfig {
        let mut config = IdentityConfig {
            clock_skew: Duration::from_secs(0),
            ..IdentityConfig::default()
        };
        configure(&mut config);
        config
    }

    fn jwks_verifier(configure: impl FnOnce(&mut IdentityConfig)) -> JwtSessionVerifier {
        let jwks: JwkSet = serde_json::from_str(JWKS).unwrap();
        JwtSessionVerifier::from_jwks(&jwks, &config(configure)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_resolves_principal() {
        let verifier = jwks_verifier(|_| {});
        let token = sign(&claims("user_123", Some("active"), Some("admin"), 600), Some(KID));

        let principal = verifier.verify(&token).await.unwrap();
        assert_eq!(principal.id, "user_123");
        assert_eq!(principal.role, Some(Role::Admin));
        assert_eq!(principal.session_status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_pem_key_ignores_kid() {
        let verifier = JwtSessionVerifier::from_pem(PUBLIC_KEY, &config(|_| {})).unwrap();
        let token = sign(&claims("user_123", None, None, 600), None);

        let principal = verifier.verify(&token).await.unwrap();
        assert_eq!(principal.session_status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_pending_session_and_unknown_role() {
        let verifier = jwks_verifier(|_| {});
        let token = sign(&claims("user_123", Some("pending"), Some("superuser"), 600), Some(KID));

        let principal = verifier.verify(&token).await.unwrap();
        assert_eq!(principal.session_status, SessionStatus::Pending);
        assert_eq!(principal.role, None);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let verifier = jwks_verifier(|_| {});
        let token = sign(&claims("user_123", None, None, -120), Some(KID));

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_unknown_kid_and_hmac_tokens_rejected() {
        let verifier = jwks_verifier(|_| {});

        let rotated = sign(&claims("user_123", None, None, 600), Some("ins_other_key"));
        assert!(verifier.verify(&rotated).await.is_err());

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(KID.to_string());
        let hmac = encode(
            &header,
            &claims("user_123", None, None, 600),
            &EncodingKey::from_secret(b"sk_test_secret"),
        )
        .unwrap();
        assert!(verifier.verify(&hmac).await.is_err());
        assert!(verifier.verify("not-a-jwt").await.is_err());
    }

    #[tokio::test]
    async fn test_issuer_checked_when_publishable_key_configured() {
        let verifier = jwks_verifier(|config| {
            config.publishable_key = Some("pk_test_Y2xlcmsuZXhhbXBsZS5jb20k".to_string());
        });

        let good = sign(&claims("user_123", None, None, 600), Some(KID));
        assert!(verifier.verify(&good).await.is_ok());

        let mut foreign = claims("user_123", None, None, 600);
        foreign.iss = Some("https://evil.example.com".to_string());
        assert!(verifier.verify(&sign(&foreign, Some(KID))).await.is_err());
    }

    #[tokio::test]
    async fn test_authorized_parties() {
        let verifier = jwks_verifier(|config| {
            config.authorized_parties = vec!["https://admin.example.com".to_string()];
        });
        let token = sign(&claims("user_123", None, None, 600), Some(KID));

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated { .. }));
    }

    #[test]
    fn test_jwks_without_rsa_keys_is_config_error() {
        let empty: JwkSet = serde_json::from_str(r#"{"keys": []}"#).unwrap();
        assert!(matches!(
            JwtSessionVerifier::from_jwks(&empty, &config(|_| {})),
            Err(GatewayError::Configuration { .. })
        ));
    }

    #[test]
    fn test_issuer_from_publishable_key() {
        assert_eq!(
            issuer_from_publishable_key("pk_test_Y2xlcmsuZXhhbXBsZS5jb20k").unwrap(),
            "https://clerk.example.com"
        );
        assert!(issuer_from_publishable_key("sk_test_abc").is_err());
        assert!(issuer_from_publishable_key("pk_live_!!!").is_err());
    }

    #[tokio::test]
    async fn test_missing_keys_is_config_error() {
        let config = IdentityConfig::default();
        assert!(matches!(
            JwtSessionVerifier::from_config(&config).await,
            Err(GatewayError::Configuration { .. })
        ));
    }
}
