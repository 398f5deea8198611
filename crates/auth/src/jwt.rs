//! HS256 token codec for access and refresh tokens.
//!
//! Both purposes share the [`Claims`] shape but are signed with different
//! secrets, so a refresh token can never pass as an access token or the
//! reverse. The `typ` claim is checked as well.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::config::{AuthConfig, MAX_TOKEN_TTL};
use warden_core::error::ErrorKind;
use warden_core::identity::VerifiedIdentity;
use warden_core::types::{DbId, Timestamp};

/// Which credential a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Refresh,
}

impl TokenPurpose {
    fn other(self) -> Self {
        match self {
            TokenPurpose::Access => TokenPurpose::Refresh,
            TokenPurpose::Refresh => TokenPurpose::Access,
        }
    }
}

/// Claims carried by every token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject -- the user's id.
    pub sub: DbId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issued-at (UTC Unix timestamp).
    pub iat: i64,
    /// Not-before (UTC Unix timestamp), equal to `iat`.
    pub nbf: i64,
    /// Expiration (UTC Unix timestamp).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// Unique token identifier.
    pub jti: String,
    pub typ: TokenPurpose,
}

impl Claims {
    pub fn identity(&self) -> VerifiedIdentity {
        VerifiedIdentity {
            id: self.sub,
            username: self.username.clone(),
            email: self.email.clone(),
            role_codes: self.roles.clone(),
            permission_codes: self.permissions.clone(),
        }
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.iter().any(|p| p == code)
    }
}

/// Verification failure. Each variant is distinguishable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
    /// Well-signed, but for the other purpose.
    #[error("token was issued for a different purpose")]
    WrongPurpose,
    /// Well-signed, but with an unexpected issuer or audience.
    #[error("token issuer or audience is not trusted")]
    UntrustedIssuer,
}

impl TokenError {
    /// Client-facing kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::Expired => ErrorKind::TokenExpired,
            TokenError::Malformed => ErrorKind::TokenMalformed,
            TokenError::NotYetValid => ErrorKind::TokenNotYetValid,
            TokenError::BadSignature | TokenError::WrongPurpose | TokenError::UntrustedIssuer => {
                ErrorKind::TokenInvalidSignature
            }
        }
    }
}

/// A freshly signed token and when it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Timestamp,
}

struct PurposeKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
}

/// Signs and verifies tokens. Pure CPU; never performs I/O.
pub struct TokenCodec {
    access: PurposeKeys,
    refresh: PurposeKeys,
    issuer: String,
    audience: String,
    leeway_secs: u64,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let keys = |secret: &str, ttl: std::time::Duration| PurposeKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: TimeDelta::from_std(ttl.min(MAX_TOKEN_TTL)).unwrap_or(TimeDelta::MAX),
        };
        Self {
            access: keys(&config.access_secret, config.access_ttl),
            refresh: keys(&config.refresh_secret, config.refresh_ttl),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway_secs: config.leeway.as_secs(),
        }
    }

    fn keys(&self, purpose: TokenPurpose) -> &PurposeKeys {
        match purpose {
            TokenPurpose::Access => &self.access,
            TokenPurpose::Refresh => &self.refresh,
        }
    }

    /// Sign a token for `identity`.
    ///
    /// Deterministic: the same identity, purpose, `jti` and `now` always
    /// produce the same token.
    pub fn issue(
        &self,
        identity: &VerifiedIdentity,
        purpose: TokenPurpose,
        jti: &str,
        now: Timestamp,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let keys = self.keys(purpose);
        let iat = now.timestamp();
        let expires_at = DateTime::from_timestamp(iat, 0)
            .unwrap_or(now)
            .checked_add_signed(keys.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let claims = Claims {
            sub: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            roles: identity.role_codes.clone(),
            permissions: identity.permission_codes.clone(),
            iat,
            nbf: iat,
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: jti.to_string(),
            typ: purpose,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Sign an access/refresh pair with fresh random `jti`s.
    pub fn issue_pair(
        &self,
        identity: &VerifiedIdentity,
        now: Timestamp,
    ) -> Result<(IssuedToken, IssuedToken), jsonwebtoken::errors::Error> {
        let access = self.issue(
            identity,
            TokenPurpose::Access,
            &Uuid::new_v4().to_string(),
            now,
        )?;
        let refresh = self.issue(
            identity,
            TokenPurpose::Refresh,
            &Uuid::new_v4().to_string(),
            now,
        )?;
        Ok((access, refresh))
    }

    /// Verify signature, expiry, issuer, audience and purpose.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);

        match decode::<Claims>(token, &self.keys(purpose).decoding, &validation) {
            Ok(data) if data.claims.typ == purpose => Ok(data.claims),
            Ok(_) => Err(TokenError::WrongPurpose),
            Err(err) => Err(match err.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                JwtErrorKind::ImmatureSignature => TokenError::NotYetValid,
                JwtErrorKind::InvalidIssuer | JwtErrorKind::InvalidAudience => {
                    TokenError::UntrustedIssuer
                }
                JwtErrorKind::InvalidSignature => {
                    if self.signed_with(token, purpose.other()) {
                        TokenError::WrongPurpose
                    } else {
                        TokenError::BadSignature
                    }
                }
                JwtErrorKind::InvalidAlgorithm => TokenError::BadSignature,
                _ => TokenError::Malformed,
            }),
        }
    }

    /// Whether `token`'s signature checks out under `purpose`'s key,
    /// ignoring every claim.
    fn signed_with(&self, token: &str, purpose: TokenPurpose) -> bool {
        let mut lenient = Validation::new(Algorithm::HS256);
        lenient.validate_exp = false;
        lenient.validate_aud = false;
        lenient.required_spec_claims.clear();
        decode::<serde::de::IgnoredAny>(token, &self.keys(purpose).decoding, &lenient).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig::with_secrets(
            "access-secret-that-is-long-enough-for-hmac",
            "refresh-secret-that-is-long-enough-for-hmac",
        )
    }

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            id: 42,
            username: "alice".into(),
            email: "alice@example.com".into(),
            role_codes: vec!["admin".into()],
            permission_codes: vec!["session:revoke".into(), "user:read".into()],
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let codec = TokenCodec::new(&test_config());
        let now = Utc::now();
        let issued = codec
            .issue(&identity(), TokenPurpose::Access, "jti-1", now)
            .expect("token generation should succeed");

        let claims = codec
            .verify(&issued.token, TokenPurpose::Access)
            .expect("token validation should succeed");
        assert_eq!(claims.identity(), identity());
        assert_eq!(claims.iss, "warden");
        assert_eq!(claims.aud, "warden-api");
        assert_eq!(claims.jti, "jti-1");
        assert_eq!(claims.typ, TokenPurpose::Access);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.expires_at(), Some(issued.expires_at));
        assert!(claims.has_permission("session:revoke"));
    }

    #[test]
    fn test_round_trip_preserves_unusual_identities() {
        let codec = TokenCodec::new(&test_config());
        let now = Utc::now();
        let identities = [
            VerifiedIdentity {
                id: 1,
                username: "bare".into(),
                email: "bare@example.com".into(),
                role_codes: vec![],
                permission_codes: vec![],
            },
            VerifiedIdentity {
                id: i64::MAX,
                username: "张伟".into(),
                email: "zhāng.wěi@例子.公司".into(),
                role_codes: vec!["管理员".into()],
                permission_codes: vec![],
            },
            VerifiedIdentity {
                id: 7,
                username: "Zoë \"quoted\" O'Brien".into(),
                email: "zoë+tag@exämple.org".into(),
                role_codes: vec!["user".into(), "auditor".into()],
                permission_codes: vec!["session:revoke".into()],
            },
        ];

        for identity in identities {
            for purpose in [TokenPurpose::Access, TokenPurpose::Refresh] {
                let issued = codec.issue(&identity, purpose, "jti", now).unwrap();
                let claims = codec.verify(&issued.token, purpose).unwrap();
                assert_eq!(claims.identity(), identity);
                assert_eq!(claims.typ, purpose);
            }
        }
    }

    #[test]
    fn test_issue_is_deterministic() {
        let codec = TokenCodec::new(&test_config());
        let now = Utc::now();
        let a = codec.issue(&identity(), TokenPurpose::Refresh, "j", now).unwrap();
        let b = codec.issue(&identity(), TokenPurpose::Refresh, "j", now).unwrap();
        assert_eq!(a.token, b.token);
    }

    #[test]
    fn test_purpose_mismatch_is_distinguishable() {
        let codec = TokenCodec::new(&test_config());
        let now = Utc::now();
        let (access, refresh) = codec.issue_pair(&identity(), now).unwrap();

        assert_eq!(
            codec.verify(&access.token, TokenPurpose::Refresh),
            Err(TokenError::WrongPurpose)
        );
        assert_eq!(
            codec.verify(&refresh.token, TokenPurpose::Access),
            Err(TokenError::WrongPurpose)
        );
        assert!(codec.verify(&refresh.token, TokenPurpose::Refresh).is_ok());
    }

    #[test]
    fn test_expired_token_fails() {
        let codec = TokenCodec::new(&test_config());
        let issued_long_ago = Utc::now() - TimeDelta::hours(1);
        let issued = codec
            .issue(&identity(), TokenPurpose::Access, "old", issued_long_ago)
            .unwrap();

        assert_eq!(
            codec.verify(&issued.token, TokenPurpose::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let mut config = test_config();
        config.leeway = std::time::Duration::from_secs(120);
        let codec = TokenCodec::new(&config);
        let just_expired = Utc::now() - TimeDelta::minutes(15) - TimeDelta::seconds(30);
        let issued = codec
            .issue(&identity(), TokenPurpose::Access, "skew", just_expired)
            .unwrap();

        assert!(codec.verify(&issued.token, TokenPurpose::Access).is_ok());
    }

    #[test]
    fn test_future_token_is_not_yet_valid() {
        let codec = TokenCodec::new(&test_config());
        let later = Utc::now() + TimeDelta::minutes(10);
        let issued = codec
            .issue(&identity(), TokenPurpose::Access, "future", later)
            .unwrap();

        let err = codec.verify(&issued.token, TokenPurpose::Access).unwrap_err();
        assert_eq!(err, TokenError::NotYetValid);
        assert_eq!(err.kind(), ErrorKind::TokenNotYetValid);
        assert_ne!(err.kind(), TokenError::Malformed.kind());
    }

    #[test]
    fn test_oversized_lifetime_is_capped() {
        let mut config = test_config();
        config.refresh_ttl = std::time::Duration::MAX;
        let codec = TokenCodec::new(&config);
        let now = Utc::now();
        let issued = codec
            .issue(&identity(), TokenPurpose::Refresh, "long", now)
            .unwrap();

        let cap = TimeDelta::from_std(MAX_TOKEN_TTL).unwrap();
        assert!(issued.expires_at <= now + cap);
        assert!(codec.verify(&issued.token, TokenPurpose::Refresh).is_ok());
    }

    #[test]
    fn test_codec_failures_have_distinct_kinds() {
        let kinds = [
            TokenError::Expired.kind(),
            TokenError::Malformed.kind(),
            TokenError::BadSignature.kind(),
            TokenError::NotYetValid.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_different_secrets_fail() {
        let codec_a = TokenCodec::new(&test_config());
        let codec_b = TokenCodec::new(&AuthConfig::with_secrets("other-a", "other-r"));
        let issued = codec_a
            .issue(&identity(), TokenPurpose::Access, "x", Utc::now())
            .unwrap();

        assert_eq!(
            codec_b.verify(&issued.token, TokenPurpose::Access),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_foreign_issuer_is_untrusted() {
        let mut foreign = test_config();
        foreign.issuer = "someone-else".into();
        let issued = TokenCodec::new(&foreign)
            .issue(&identity(), TokenPurpose::Access, "x", Utc::now())
            .unwrap();

        let codec = TokenCodec::new(&test_config());
        assert_eq!(
            codec.verify(&issued.token, TokenPurpose::Access),
            Err(TokenError::UntrustedIssuer)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = TokenCodec::new(&test_config());
        assert_eq!(
            codec.verify("not-a-jwt", TokenPurpose::Access),
            Err(TokenError::Malformed)
        );
        assert_eq!(TokenError::Malformed.kind(), ErrorKind::TokenMalformed);
        assert_eq!(TokenError::WrongPurpose.kind(), ErrorKind::TokenInvalidSignature);
    }
}
