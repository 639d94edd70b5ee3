use async_trait::async_trait;
use chrono::Utc;
use entity::employees;
use platform_db::DbPool;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, SqlErr,
};
use tracing::{debug, info};

use crate::{
    error::RepoError,
    model::{Employee, EmployeeDraft},
    password::{hash_password, verify_decoy, verify_password},
    repository::EmployeeRepository,
};

/// Column widths from the `employees` migration.
const USERNAME_MAX: usize = 128;
const NAME_MAX: usize = 128;
const EMAIL_MAX: usize = 320;
const PHONE_MAX: usize = 64;

/// [`EmployeeRepository`] backed by the `employees` table.
#[derive(Clone, Debug)]
pub struct SeaOrmEmployeeRepository {
    pool: DbPool,
}

impl SeaOrmEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<employees::Model>, RepoError> {
        employees::Entity::find()
            .filter(employees::Column::Username.eq(username))
            .one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn ensure_username_free(&self, username: &str, owner: Option<i32>) -> Result<(), RepoError> {
        match self.find_by_username(username).await? {
            Some(existing) if Some(existing.id) != owner => Err(username_taken(username)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl EmployeeRepository for SeaOrmEmployeeRepository {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Employee>, RepoError> {
        if is_blank(username) || is_blank(password) {
            return Ok(None);
        }
        let Some(row) = self.find_by_username(username.trim()).await? else {
            verify_decoy(password);
            return Ok(None);
        };
        if !verify_password(password, &row.password_hash) {
            debug!(employee_id = row.id, "password mismatch");
            return Ok(None);
        }
        Ok(Some(row.into()))
    }

    async fn list(&self) -> Result<Vec<Employee>, RepoError> {
        let rows = employees::Entity::find()
            .order_by_asc(employees::Column::Id)
            .all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn get(&self, id: i32) -> Result<Option<Employee>, RepoError> {
        let row = employees::Entity::find_by_id(id)
            .one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Employee::from))
    }

    async fn create(
        &self,
        draft: EmployeeDraft,
        password: Option<&str>,
    ) -> Result<Employee, RepoError> {
        let password = password
            .filter(|value| !is_blank(value))
            .ok_or_else(|| RepoError::validation("Password is required"))?;
        let username = draft.username.trim();
        if username.is_empty() {
            return Err(RepoError::validation("Username is required"));
        }
        check_lengths(&draft)?;
        self.ensure_username_free(username, None).await?;

        let now = Utc::now();
        let row = employees::ActiveModel {
            username: Set(username.to_string()),
            first_name: Set(draft.first_name.trim().to_string()),
            last_name: Set(draft.last_name.trim().to_string()),
            email: Set(non_blank(draft.email)),
            phone: Set(non_blank(draft.phone)),
            password_hash: Set(hash_password(password)?),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|err| unique_or_db_error(err, username))?;

        info!(employee_id = row.id, "employee created");
        Ok(row.into())
    }

    async fn update(
        &self,
        id: i32,
        draft: EmployeeDraft,
        password: Option<&str>,
    ) -> Result<Employee, RepoError> {
        check_lengths(&draft)?;
        let existing = employees::Entity::find_by_id(id)
            .one(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| RepoError::NotFound("Employee not found".into()))?;

        let username = draft.username.trim().to_string();
        let mut row = existing.clone().into_active_model();
        if !username.is_empty() && username != existing.username {
            self.ensure_username_free(&username, Some(id)).await?;
            row.username = Set(username.clone());
        }
        if !is_blank(&draft.first_name) {
            row.first_name = Set(draft.first_name.trim().to_string());
        }
        if !is_blank(&draft.last_name) {
            row.last_name = Set(draft.last_name.trim().to_string());
        }
        if let Some(email) = non_blank(draft.email) {
            row.email = Set(Some(email));
        }
        if let Some(phone) = non_blank(draft.phone) {
            row.phone = Set(Some(phone));
        }
        if let Some(password) = password.filter(|value| !is_blank(value)) {
            row.password_hash = Set(hash_password(password)?);
        }
        row.updated_at = Set(Utc::now().into());

        let updated = row
            .update(&self.pool)
            .await
            .map_err(|err| unique_or_db_error(err, &username))?;
        info!(employee_id = id, "employee updated");
        Ok(updated.into())
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), RepoError> {
    if value.trim().chars().count() > max {
        return Err(RepoError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn check_lengths(draft: &EmployeeDraft) -> Result<(), RepoError> {
    check_length("Username", &draft.username, USERNAME_MAX)?;
    check_length("First name", &draft.first_name, NAME_MAX)?;
    check_length("Last name", &draft.last_name, NAME_MAX)?;
    check_length("Email", draft.email.as_deref().unwrap_or_default(), EMAIL_MAX)?;
    check_length("Phone", draft.phone.as_deref().unwrap_or_default(), PHONE_MAX)
}

fn username_taken(username: &str) -> RepoError {
    RepoError::Conflict(format!("Username \"{username}\" is already taken"))
}

fn db_error(err: DbErr) -> RepoError {
    RepoError::internal(err)
}

/// Two concurrent registrations can both pass the lookup; the unique index decides.
fn unique_or_db_error(err: DbErr, username: &str) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => username_taken(username),
        _ => db_error(err),
    }
}
