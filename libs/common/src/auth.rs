//! Bearer-token authentication middleware and the authenticated principal

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use crate::{
    accounts::AccountRole,
    cache::RedisPool,
    jwt::{Claims, TokenService},
    response::ApiError,
};

/// What the auth middleware needs to verify a request
#[derive(Clone)]
pub struct Authenticator {
    pub tokens: TokenService,
    pub revocations: Option<RedisPool>,
}

impl Authenticator {
    pub fn new(tokens: TokenService, revocations: Option<RedisPool>) -> Self {
        Self {
            tokens,
            revocations,
        }
    }

    /// Validate a raw bearer token, including the revocation list
    pub async fn authenticate(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.tokens.validate(token).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            ApiError::authentication_required()
        })?;

        if let Some(cache) = &self.revocations {
            let revoked = self.tokens.is_revoked(cache, &claims).await.map_err(|e| {
                error!("Failed to check token revocation: {}", e);
                ApiError::Internal("Failed to verify token".to_string())
            })?;
            if revoked {
                return Err(ApiError::authentication_required());
            }
        }

        Ok(claims)
    }
}

/// Authenticated caller, available to handlers behind [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: AccountRole,
}

impl AuthUser {
    pub fn require(&self, role: AccountRole) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::access_denied())
        }
    }

    pub fn require_any(&self, roles: &[AccountRole]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::access_denied())
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }
}

/// Extract the token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
///
/// Inserts both the [`AuthUser`] and the full [`Claims`] into the request
/// extensions.
pub async fn auth_middleware(
    State(auth): State<Authenticator>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or_else(ApiError::authentication_required)?;
    let claims = auth.authenticate(token).await?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role: claims.role,
    });
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(ApiError::authentication_required)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Claims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(ApiError::authentication_required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::JwtSettings;
    use axum::{Router, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    fn authenticator() -> Authenticator {
        Authenticator::new(
            TokenService::new(&JwtSettings {
                secret: "middleware-secret".to_string(),
                expiration: 600,
                issuer: "marketplace".to_string(),
            }),
            None,
        )
    }

    fn app(auth: Authenticator) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|user: AuthUser| async move { format!("{}:{}", user.role, user.id) }),
            )
            .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = axum::http::HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().expect("header"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().expect("header"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let response = app(authenticator())
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let auth = authenticator();
        let token = auth.tokens.issue(9, AccountRole::Provider).expect("issue");

        let response = app(auth)
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], b"provider:9");
    }

    #[test]
    fn role_guards() {
        let user = AuthUser {
            id: 1,
            role: AccountRole::User,
        };
        assert!(user.require(AccountRole::User).is_ok());
        assert!(matches!(
            user.require(AccountRole::Admin),
            Err(ApiError::Forbidden(_))
        ));
        assert!(
            user.require_any(&[AccountRole::Provider, AccountRole::Admin])
                .is_err()
        );
        assert!(!user.is_admin());
    }
}
