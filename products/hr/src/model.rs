use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An employee as the rest of the application sees it. The password hash stays
/// inside the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Employee {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request/response shape. `password` is read from requests and never written
/// back out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    #[serde(default, alias = "employeeId", skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

/// Entity fields produced from a request, before the store assigns or applies an id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmployeeDraft {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Login response: the employee record plus the bearer token to send back.
#[derive(Clone, Debug, Serialize)]
pub struct AuthenticatedEmployee {
    #[serde(flatten)]
    pub employee: EmployeeDto,
    pub token: String,
}

impl From<EmployeeDto> for EmployeeDraft {
    fn from(dto: EmployeeDto) -> Self {
        Self {
            username: dto.username,
            first_name: dto.first_name,
            last_name: dto.last_name,
            email: dto.email,
            phone: dto.phone,
        }
    }
}

impl From<Employee> for EmployeeDto {
    fn from(employee: Employee) -> Self {
        Self {
            id: Some(employee.id),
            username: employee.username,
            first_name: employee.first_name,
            last_name: employee.last_name,
            email: employee.email,
            phone: employee.phone,
            password: None,
        }
    }
}

impl From<entity::employees::Model> for Employee {
    fn from(row: entity::employees::Model) -> Self {
        Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at.with_timezone(&Utc),
            updated_at: row.updated_at.with_timezone(&Utc),
        }
    }
}
