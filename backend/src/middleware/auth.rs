//! Authentication middleware
//!
//! Verifies bearer JWTs issued elsewhere and checks `resource:action`
//! permissions before the inventory engine is called.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission. `resource:*` grants every
    /// action on a resource, `*` grants everything.
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let exact = format!("{}:{}", resource, action);
        let any_action = format!("{}:*", resource);
        self.permissions
            .iter()
            .any(|p| *p == exact || *p == any_action || p == "*")
    }
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Resolve the user behind an `Authorization` header value
fn authenticate(header: Option<&str>, secret: &str) -> Result<AuthUser, String> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| "Missing or invalid Authorization header".to_string())?;

    let claims = decode_jwt(token, secret)?;
    let user_id = uuid::Uuid::parse_str(&claims.sub)
        .map_err(|_| "Invalid user ID in token".to_string())?;

    Ok(AuthUser {
        user_id,
        permissions: claims.permissions,
    })
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match authenticate(header, &state.config.jwt.secret) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(message) => {
            tracing::debug!(reason = %message, "request rejected");
            AppError::Unauthorized(message).into_response()
        }
    }
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Permission guard for use in handlers
pub fn check_permission(user: &CurrentUser, resource: &str, action: &str) -> AppResult<()> {
    if user.0.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %user.0.user_id,
            required = %format!("{}:{}", resource, action),
            "permission denied"
        );
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn user(permissions: &[&str]) -> AuthUser {
        AuthUser {
            user_id: uuid::Uuid::new_v4(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn token(sub: &str, permissions: &[&str]) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: now + 3600,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[test]
    fn permissions_match_exactly_or_by_wildcard() {
        assert!(user(&["stock:read"]).has_permission("stock", "read"));
        assert!(!user(&["stock:read"]).has_permission("stock", "write"));
        assert!(user(&["milling:*"]).has_permission("milling", "write"));
        assert!(!user(&["milling:*"]).has_permission("release", "write"));
        assert!(user(&["*"]).has_permission("release", "write"));
    }

    #[test]
    fn guard_rejects_missing_permission() {
        let current = CurrentUser(user(&["release:read"]));
        assert!(check_permission(&current, "release", "read").is_ok());
        assert!(matches!(
            check_permission(&current, "release", "write"),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn valid_bearer_token_authenticates() {
        let id = uuid::Uuid::new_v4();
        let header = format!("Bearer {}", token(&id.to_string(), &["stock:read"]));
        let user = authenticate(Some(&header), SECRET).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.permissions, vec!["stock:read".to_string()]);
    }

    #[test]
    fn bad_headers_are_rejected() {
        assert!(authenticate(None, SECRET).is_err());
        let raw = token(&uuid::Uuid::new_v4().to_string(), &[]);
        assert!(authenticate(Some(&raw), SECRET).is_err());
        let header = format!("Bearer {}", raw);
        assert!(authenticate(Some(&header), "other-secret").is_err());
        let header = format!("Bearer {}", token("not-a-uuid", &[]));
        assert!(authenticate(Some(&header), SECRET).is_err());
    }
}
