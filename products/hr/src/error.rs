use platform_api::ApiError;
use thiserror::Error;

pub const INVALID_CREDENTIALS: &str = "Username or password is incorrect";

/// Failures reported by an [`crate::EmployeeRepository`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Internal(String),
}

impl RepoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HrError {
    #[error("Username or password is incorrect")]
    InvalidCredentials,
    #[error("Employee {0} not found")]
    EmployeeNotFound(i32),
    #[error("failed to issue token: {0}")]
    Token(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<HrError> for ApiError {
    fn from(err: HrError) -> Self {
        match err {
            HrError::InvalidCredentials => ApiError::InvalidCredentials(INVALID_CREDENTIALS.into()),
            HrError::EmployeeNotFound(id) => ApiError::NotFound(format!("Employee {id} not found")),
            HrError::Token(msg) => ApiError::internal(anyhow::anyhow!(msg)),
            HrError::Repo(RepoError::Validation(msg)) => ApiError::InvalidInput(msg),
            HrError::Repo(RepoError::Conflict(msg)) => ApiError::Conflict(msg),
            HrError::Repo(RepoError::NotFound(msg)) => ApiError::NotFound(msg),
            HrError::Repo(RepoError::Internal(msg)) => ApiError::internal(anyhow::anyhow!(msg)),
        }
    }
}
