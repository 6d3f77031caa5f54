use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account not activated")]
    AccountNotActivated,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid token")]
    TokenInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("invitation already used")]
    InvitationUsed,

    #[error("missing required fields: {0}")]
    MissingFields(String),

    #[error("invalid timecode: {0}")]
    InvalidTimecode(f64),

    #[error("parent annotation must exist on the same video")]
    InvalidParent,

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("project code collision")]
    CodeCollision,

    #[error("could not generate a unique project code after {0} attempts")]
    CodeGenerationExhausted(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
