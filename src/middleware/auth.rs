use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// Caller identity resolved from verified claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<()> {
        if self.is_admin() || roles.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "Role '{}' is not allowed to perform this action",
                self.role
            )))
        }
    }
}

impl TryFrom<&Claims> for AuthUser {
    type Error = Error;

    fn try_from(claims: &Claims) -> Result<Self> {
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| Error::Unauthorized("Token subject is not a user id".to_string()))?;
        let role = claims
            .role
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("Token carries no role".to_string()))?
            .parse::<Role>()
            .map_err(Error::Unauthorized)?;
        Ok(Self { id, role })
    }
}

fn reject(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "error": error, "message": message})),
    )
        .into_response()
}

/// Verifies the bearer token and stores the resolved [`AuthUser`] (and the
/// raw claims) in request extensions.
pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return reject("missing_authorization", "Authorization header is required");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return reject("bad_authorization", "Authorization header is not valid text");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return reject("unsupported_scheme", "Authorization must use the Bearer scheme");
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let claims = match decode::<Claims>(
        token.trim(),
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return reject("invalid_token", "Token is invalid or expired");
        }
    };

    match AuthUser::try_from(&claims) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => reject("invalid_token", &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: Option<&str>) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: 0,
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn claims_resolve_to_a_user() {
        let id = Uuid::new_v4();
        let user = AuthUser::try_from(&claims(&id.to_string(), Some("Teacher"))).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Teacher);
    }

    #[test]
    fn bad_subject_or_role_is_unauthorized() {
        let err = AuthUser::try_from(&claims("nope", Some("admin"))).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        let id = Uuid::new_v4().to_string();
        assert!(AuthUser::try_from(&claims(&id, None)).is_err());
        assert!(AuthUser::try_from(&claims(&id, Some("janitor"))).is_err());
    }

    #[test]
    fn admin_passes_every_role_gate() {
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(admin.require_any(&[Role::Teacher]).is_ok());

        let student = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Student,
        };
        assert!(matches!(
            student.require_any(&[Role::Teacher]),
            Err(Error::Forbidden(_))
        ));
    }
}
