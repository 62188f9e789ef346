//! Repository for the organisation directory tables.

use hrflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::org::{DepartmentRow, EmployeeRow, RoleAssignmentRow};

pub struct OrgRepo;

impl OrgRepo {
    pub async fn list_departments(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<DepartmentRow>, sqlx::Error> {
        sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, company_id, name, parent_id FROM org_departments \
             WHERE company_id = $1 ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_employees(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<EmployeeRow>, sqlx::Error> {
        sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, company_id, name, department_id FROM org_employees \
             WHERE company_id = $1 ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// Role assignments in creation order, so the earliest holder comes first.
    pub async fn list_role_assignments(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<RoleAssignmentRow>, sqlx::Error> {
        sqlx::query_as::<_, RoleAssignmentRow>(
            "SELECT id, company_id, role_name, employee_id, department_id \
             FROM org_role_assignments WHERE company_id = $1 ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create_department(
        pool: &PgPool,
        company_id: DbId,
        name: &str,
        parent_id: Option<DbId>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO org_departments (company_id, name, parent_id) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(company_id)
        .bind(name)
        .bind(parent_id)
        .fetch_one(pool)
        .await
    }

    pub async fn create_employee(
        pool: &PgPool,
        company_id: DbId,
        name: &str,
        department_id: Option<DbId>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO org_employees (company_id, name, department_id) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(company_id)
        .bind(name)
        .bind(department_id)
        .fetch_one(pool)
        .await
    }

    /// Grant `role_name`; `department_id = None` grants it company-wide.
    pub async fn assign_role(
        pool: &PgPool,
        company_id: DbId,
        role_name: &str,
        employee_id: DbId,
        department_id: Option<DbId>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO org_role_assignments (company_id, role_name, employee_id, department_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(company_id)
        .bind(role_name)
        .bind(employee_id)
        .bind(department_id)
        .fetch_one(pool)
        .await
    }
}
