//! Signed bearer tokens.
//!
//! Two signing domains exist: session tokens returned by login, and invitation
//! tokens mailed to invitees. Each domain has its own HS256 secret and its own
//! audience, so a token minted for one domain never verifies in the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{ProjectRole, User, UserRole};

pub const INVITATION_TTL_HOURS: i64 = 48;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDomain {
    Session,
    Invitation,
}

impl TokenDomain {
    const fn audience(self) -> &'static str {
        match self {
            Self::Session => "vialog:session",
            Self::Invitation => "vialog:invitation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SessionClaims {
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationClaims {
    pub email: String,
    pub project_id: String,
    pub role: ProjectRole,
}

#[derive(Serialize, Deserialize)]
struct Envelope<C> {
    #[serde(flatten)]
    claims: C,
    aud: String,
    /// Random per token; HS256 signatures are deterministic and `iat` has
    /// second resolution.
    #[serde(default)]
    jti: String,
    iat: i64,
    exp: i64,
}

struct DomainKey {
    domain: TokenDomain,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl DomainKey {
    fn new(domain: TokenDomain, secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[domain.audience()]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.leeway = 0;

        Self {
            domain,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

/// Issues and verifies tokens for both domains. Built once at startup.
pub struct TokenService {
    session: DomainKey,
    invitation: DomainKey,
    session_ttl: Duration,
}

impl TokenService {
    pub fn new(session_secret: &str, invitation_secret: &str, session_ttl: Duration) -> Result<Self> {
        if session_secret.is_empty() || invitation_secret.is_empty() {
            return Err(Error::Config("token secrets must not be empty".to_string()));
        }
        if session_secret == invitation_secret {
            return Err(Error::Config(
                "session and invitation secrets must differ".to_string(),
            ));
        }
        if session_ttl <= Duration::zero() {
            return Err(Error::Config("session ttl must be positive".to_string()));
        }

        Ok(Self {
            session: DomainKey::new(TokenDomain::Session, session_secret),
            invitation: DomainKey::new(TokenDomain::Invitation, invitation_secret),
            session_ttl,
        })
    }

    fn key(&self, domain: TokenDomain) -> &DomainKey {
        match domain {
            TokenDomain::Session => &self.session,
            TokenDomain::Invitation => &self.invitation,
        }
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn issue<C: Serialize>(&self, domain: TokenDomain, claims: C, ttl: Duration) -> Result<String> {
        self.issue_at(domain, claims, ttl, Utc::now())
    }

    /// Issues a token as if minted at `issued_at`.
    pub fn issue_at<C: Serialize>(
        &self,
        domain: TokenDomain,
        claims: C,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let key = self.key(domain);
        let envelope = Envelope {
            claims,
            aud: key.domain.audience().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &envelope, &key.encoding)
            .map_err(|e| Error::Config(format!("failed to sign token: {e}")))
    }

    pub fn verify<C: DeserializeOwned>(&self, domain: TokenDomain, token: &str) -> Result<C> {
        let key = self.key(domain);
        let data = decode::<Envelope<C>>(token, &key.decoding, &key.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::TokenInvalid,
            }
        })?;
        Ok(data.claims.claims)
    }

    pub fn issue_session(&self, user: &User) -> Result<String> {
        self.issue(
            TokenDomain::Session,
            SessionClaims::for_user(user),
            self.session_ttl,
        )
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims> {
        self.verify(TokenDomain::Session, token)
    }

    pub fn issue_invitation(&self, claims: &InvitationClaims) -> Result<String> {
        self.issue(
            TokenDomain::Invitation,
            claims,
            Duration::hours(INVITATION_TTL_HOURS),
        )
    }

    pub fn verify_invitation(&self, token: &str) -> Result<InvitationClaims> {
        self.verify(TokenDomain::Invitation, token)
    }
}

/// Stable digest identifying a raw token without storing it.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generates a cryptographically secure random hex secret
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "session-secret-for-tests",
            "invite-secret-for-tests",
            Duration::hours(1),
        )
        .unwrap()
    }

    fn invite_claims() -> InvitationClaims {
        InvitationClaims {
            email: "bob@example.com".to_string(),
            project_id: "p-1".to_string(),
            role: ProjectRole::Annotator,
        }
    }

    #[test]
    fn test_invitation_round_trip() {
        let tokens = service();
        let token = tokens.issue_invitation(&invite_claims()).unwrap();

        assert_eq!(tokens.verify_invitation(&token).unwrap(), invite_claims());
    }

    #[test]
    fn test_reissued_invitation_gets_a_fresh_token() {
        let tokens = service();
        let issued_at = Utc::now();
        let ttl = Duration::hours(INVITATION_TTL_HOURS);

        let first = tokens
            .issue_at(TokenDomain::Invitation, invite_claims(), ttl, issued_at)
            .unwrap();
        let second = tokens
            .issue_at(TokenDomain::Invitation, invite_claims(), ttl, issued_at)
            .unwrap();

        assert_ne!(first, second);
        assert_ne!(token_digest(&first), token_digest(&second));
        assert_eq!(tokens.verify_invitation(&second).unwrap(), invite_claims());
    }

    #[test]
    fn test_expired_invitation() {
        let tokens = service();
        let issued_at = Utc::now() - Duration::hours(INVITATION_TTL_HOURS + 1);
        let token = tokens
            .issue_at(
                TokenDomain::Invitation,
                invite_claims(),
                Duration::hours(INVITATION_TTL_HOURS),
                issued_at,
            )
            .unwrap();

        assert!(matches!(
            tokens.verify_invitation(&token),
            Err(Error::TokenExpired)
        ));
    }

    #[test]
    fn test_invitation_still_valid_just_before_expiry() {
        let tokens = service();
        let issued_at = Utc::now() - Duration::hours(INVITATION_TTL_HOURS - 1);
        let token = tokens
            .issue_at(
                TokenDomain::Invitation,
                invite_claims(),
                Duration::hours(INVITATION_TTL_HOURS),
                issued_at,
            )
            .unwrap();

        assert!(tokens.verify_invitation(&token).is_ok());
    }

    #[test]
    fn test_domains_never_cross_validate() {
        let tokens = service();
        let invite = tokens.issue_invitation(&invite_claims()).unwrap();
        assert!(matches!(
            tokens.verify_session(&invite),
            Err(Error::TokenInvalid)
        ));

        let session = tokens
            .issue(
                TokenDomain::Session,
                SessionClaims {
                    sub: "u-1".to_string(),
                    email: "a@example.com".to_string(),
                    role: UserRole::User,
                    display_name: None,
                },
                Duration::hours(1),
            )
            .unwrap();
        assert!(matches!(
            tokens.verify_invitation(&session),
            Err(Error::TokenInvalid)
        ));
    }

    #[test]
    fn test_same_secret_different_audience_rejected() {
        let a = service();
        let token = a.issue_invitation(&invite_claims()).unwrap();

        // Session key of `b` shares the invitation secret of `a`.
        let b = TokenService::new(
            "invite-secret-for-tests",
            "another-secret",
            Duration::hours(1),
        )
        .unwrap();
        assert!(matches!(b.verify_session(&token), Err(Error::TokenInvalid)));
    }

    #[test]
    fn test_tampered_token() {
        let tokens = service();
        let mut token = tokens.issue_invitation(&invite_claims()).unwrap();
        token.push('x');

        assert!(matches!(
            tokens.verify_invitation(&token),
            Err(Error::TokenInvalid)
        ));
        assert!(matches!(
            tokens.verify_invitation("garbage"),
            Err(Error::TokenInvalid)
        ));
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let result = TokenService::new("same", "same", Duration::hours(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_token_digest_is_stable_hex() {
        let digest = token_digest("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, token_digest("abc"));
        assert_ne!(digest, token_digest("abd"));
    }

    #[test]
    fn test_generate_secret() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_BYTES * 2);
        assert_ne!(secret, generate_secret());
    }
}
