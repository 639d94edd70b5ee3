use std::sync::Arc;

use platform_authn::TokenIssuer;
use tracing::{info, instrument, warn};

use crate::{
    error::HrError,
    model::{AuthenticatedEmployee, EmployeeDraft, EmployeeDto},
    repository::EmployeeRepository,
};

/// Registration, login and record maintenance for employees.
#[derive(Clone)]
pub struct EmployeeService {
    repository: Arc<dyn EmployeeRepository>,
    tokens: Arc<TokenIssuer>,
}

impl EmployeeService {
    pub fn new(repository: Arc<dyn EmployeeRepository>, tokens: Arc<TokenIssuer>) -> Self {
        Self { repository, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    #[instrument(name = "hr.authenticate", skip_all, fields(username = %credentials.username))]
    pub async fn authenticate(
        &self,
        credentials: EmployeeDto,
    ) -> Result<AuthenticatedEmployee, HrError> {
        let password = credentials.password.unwrap_or_default();
        let Some(employee) = self
            .repository
            .authenticate(&credentials.username, &password)
            .await?
        else {
            warn!("authentication rejected");
            return Err(HrError::InvalidCredentials);
        };
        let token = self
            .tokens
            .issue(employee.id)
            .map_err(|err| HrError::Token(err.to_string()))?;
        info!(employee_id = employee.id, "employee authenticated");
        Ok(AuthenticatedEmployee {
            employee: employee.into(),
            token,
        })
    }

    #[instrument(name = "hr.register", skip_all, fields(username = %dto.username))]
    pub async fn register(&self, mut dto: EmployeeDto) -> Result<(), HrError> {
        let password = dto.password.take();
        let draft = EmployeeDraft::from(dto);
        self.repository.create(draft, password.as_deref()).await?;
        Ok(())
    }

    #[instrument(name = "hr.list", skip_all)]
    pub async fn list(&self) -> Result<Vec<EmployeeDto>, HrError> {
        let employees = self.repository.list().await?;
        Ok(employees.into_iter().map(EmployeeDto::from).collect())
    }

    #[instrument(name = "hr.get", skip(self))]
    pub async fn get(&self, id: i32) -> Result<EmployeeDto, HrError> {
        self.repository
            .get(id)
            .await?
            .map(EmployeeDto::from)
            .ok_or(HrError::EmployeeNotFound(id))
    }

    /// The path id is authoritative; any id in the body is ignored.
    #[instrument(name = "hr.update", skip(self, dto))]
    pub async fn update(&self, id: i32, mut dto: EmployeeDto) -> Result<(), HrError> {
        if let Some(body_id) = dto.id.take().filter(|body_id| *body_id != id) {
            warn!(body_id, "ignoring mismatched id in request body");
        }
        let password = dto.password.take();
        let draft = EmployeeDraft::from(dto);
        self.repository
            .update(id, draft, password.as_deref())
            .await?;
        Ok(())
    }
}
