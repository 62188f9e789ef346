//! Well-known role name constants.
//!
//! These must match the seed data in `20261001000002_create_org_tables.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_HR_ADMIN: &str = "hr_admin";
pub const ROLE_HR: &str = "hr";
pub const ROLE_HRBP: &str = "hrbp";
pub const ROLE_DEPARTMENT_HEAD: &str = "department_head";
pub const ROLE_DIRECT_MANAGER: &str = "direct_manager";
pub const ROLE_EMPLOYEE: &str = "employee";

/// Roles that may act on any workflow step regardless of assignee.
pub const ELEVATED_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_HR_ADMIN];

/// Roles resolved relative to the related employee's department.
pub const DEPARTMENT_SCOPED_ROLES: &[&str] =
    &[ROLE_DEPARTMENT_HEAD, ROLE_HRBP, ROLE_DIRECT_MANAGER];

/// Whether the role bypasses per-step assignee checks.
pub fn is_elevated(role: &str) -> bool {
    ELEVATED_ROLES.contains(&role)
}

/// Whether the role is looked up through the department hierarchy.
pub fn is_department_scoped(role: &str) -> bool {
    DEPARTMENT_SCOPED_ROLES.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_roles_are_elevated() {
        assert!(is_elevated(ROLE_ADMIN));
        assert!(is_elevated(ROLE_HR_ADMIN));
        assert!(!is_elevated(ROLE_HR));
        assert!(!is_elevated(ROLE_EMPLOYEE));
    }

    #[test]
    fn department_head_is_department_scoped() {
        assert!(is_department_scoped(ROLE_DEPARTMENT_HEAD));
        assert!(!is_department_scoped(ROLE_HR));
    }
}
