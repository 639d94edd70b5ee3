//! HR module: employee accounts.
//!
//! [`EmployeeService`] is the entry point used by the HTTP layer. It only talks
//! to storage through [`EmployeeRepository`]; [`SeaOrmEmployeeRepository`] is the
//! production implementation.

pub mod error;
pub mod model;
pub mod password;
pub mod repository;
pub mod service;
pub mod store;

pub use error::{HrError, RepoError};
pub use model::{AuthenticatedEmployee, Employee, EmployeeDraft, EmployeeDto};
pub use repository::EmployeeRepository;
pub use service::EmployeeService;
pub use store::SeaOrmEmployeeRepository;
