//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hrflow_core::error::CoreError;
use hrflow_core::roles;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires an elevated role (`hr_admin` or `admin`). Rejects with 403 otherwise.
///
/// ```ignore
/// async fn create(RequireHrAdmin(user): RequireHrAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireHrAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireHrAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !roles::is_elevated(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "HR admin role required".into(),
            )));
        }
        Ok(RequireHrAdmin(user))
    }
}
