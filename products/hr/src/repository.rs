use async_trait::async_trait;

use crate::{
    error::RepoError,
    model::{Employee, EmployeeDraft},
};

/// Storage contract for employee accounts. Password hashing and username
/// uniqueness are the implementation's job.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// `Ok(None)` when the pair does not identify an employee, without saying which half was wrong.
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<Option<Employee>, RepoError>;

    /// All employees, ordered by id.
    async fn list(&self) -> Result<Vec<Employee>, RepoError>;

    async fn get(&self, id: i32) -> Result<Option<Employee>, RepoError>;

    async fn create(&self, draft: EmployeeDraft, password: Option<&str>)
    -> Result<Employee, RepoError>;

    /// Blank fields keep their stored value; a non-blank password is re-hashed.
    async fn update(
        &self,
        id: i32,
        draft: EmployeeDraft,
        password: Option<&str>,
    ) -> Result<Employee, RepoError>;
}
