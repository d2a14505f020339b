use thiserror::Error;

/// Failure kinds the service layer can surface. Storage errors are caught
/// at this boundary and folded into `Internal` so raw driver errors never
/// escape to handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    Unauthenticated,

    #[error("{0}")]
    NotFound(String),

    #[error("you cannot follow yourself")]
    SelfFollow,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Validation(String),

    #[error("you are not following anyone, there are no publications to show")]
    NoFollowees,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

/// True for Postgres unique-constraint violations (SQLSTATE 23505). Lets
/// callers turn a lost insert race into `AlreadyExists` instead of a 500.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
