use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

/// Signs an HS256 token in the shape `require_bearer_auth` accepts.
pub fn issue_token(secret: &str, user_id: Uuid, role: Role, ttl: Duration) -> Result<String> {
    let exp = (Utc::now() + ttl).timestamp();
    if exp <= 0 {
        return Err(Error::BadRequest("Token expiry is in the past".to_string()));
    }
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp as usize,
        role: Some(role.as_str().to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn issued_token_round_trips_through_verification() {
        let id = Uuid::new_v4();
        let token = issue_token("secret", id, Role::Teacher, Duration::hours(1)).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.sub, id.to_string());
        assert_eq!(data.claims.role.as_deref(), Some("teacher"));
    }
}
