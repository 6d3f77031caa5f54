mod helpers;
mod middleware;
mod password;
mod token;

pub use middleware::{AuthError, RequireAdmin, RequireUser};
pub use password::{
    MIN_PASSWORD_LEN, PasswordHasher, generate_password, validate_password_strength,
};
pub use token::{
    DEFAULT_SESSION_TTL_HOURS, INVITATION_TTL_HOURS, InvitationClaims, SessionClaims,
    TokenDomain, TokenService, generate_secret, token_digest,
};
