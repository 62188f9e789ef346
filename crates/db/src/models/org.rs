//! Organisation directory rows.

use hrflow_core::types::DbId;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct DepartmentRow {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmployeeRow {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub department_id: Option<DbId>,
}

/// A role held by an employee, scoped to a department or company-wide.
#[derive(Debug, Clone, FromRow)]
pub struct RoleAssignmentRow {
    pub id: DbId,
    pub company_id: DbId,
    pub role_name: String,
    pub employee_id: DbId,
    pub department_id: Option<DbId>,
}
