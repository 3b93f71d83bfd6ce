use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::role::{ADMIN_ROLES, Role, has_any};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header::HeaderMap, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    /// Decodes the bearer token in `Authorization`.
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Result<Self, AppError> {
        let header = headers
            .get("Authorization")
            .ok_or(AppError::Unauthenticated("Missing Authorization header"))?
            .to_str()
            .map_err(|_| AppError::Unauthenticated("Invalid Authorization header encoding"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthenticated("Authorization header must start with Bearer"))?;

        let claims = verify_token(token, secret)
            .map_err(|_| AppError::Unauthenticated("Invalid or expired token"))?;

        if claims.roles.is_empty() {
            return Err(AppError::Unauthenticated("Invalid role"));
        }

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            roles: claims.roles,
        })
    }

    /// Allows the call when the caller holds any of `required`.
    pub fn require_any(&self, required: &[Role]) -> Result<(), AppError> {
        if has_any(&self.roles, required) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient role"))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_any(ADMIN_ROLES)
            .map_err(|_| AppError::Forbidden("PENTADBIR/SUPERADMIN only"))
    }

    pub fn is_admin(&self) -> bool {
        has_any(&self.roles, ADMIN_ROLES)
    }

    /// Own resources are always reachable; anyone else's needs an admin role.
    pub fn require_self_or_admin(&self, user_id: u64) -> Result<(), AppError> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not allowed to act for another user"))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(AppError::Internal(anyhow::anyhow!("Config missing"))));
            }
        };

        ready(AuthUser::from_headers(req.headers(), &config.jwt_secret))
    }
}
