/*!
 * # Authentication and Authorization Module
 *
 * JWT bearer authentication for restaurant accounts:
 *
 * - HS256 access/refresh token pairs issued at login
 * - In-memory revocation list consulted on every validation
 * - Role guards (`customer`, `staff`, `admin`) applied per router
 * - Argon2 password hashing
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::user;
use crate::errors::ServiceError;

const ACCESS_TOKEN: &str = "access";
const REFRESH_TOKEN: &str = "refresh";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub name: Option<String>,  // User's name
    pub email: Option<String>, // User's email
    pub roles: Vec<String>,    // Granted roles
    pub jti: String,           // JWT ID (unique identifier for this token)
    pub iat: i64,              // Issued at time
    pub exp: i64,              // Expiration time
    pub nbf: i64,              // Not valid before time
    pub iss: String,           // Issuer
    pub aud: String,           // Audience
    pub typ: String,           // "access" or "refresh"
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific role. Admins hold every staff right.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role) || (role == "staff" && self.is_admin())
    }

    /// Check if the user is an admin
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }

    /// Parsed account id
    pub fn id(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.user_id)
            .map_err(|_| ServiceError::Unauthorized("Malformed subject claim".into()))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            refresh_token_expiration,
        }
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Generate an access/refresh token pair for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let access_claims = Claims {
            sub: user.id.to_string(),
            name: Some(user.full_name()),
            email: Some(user.email.clone()),
            roles: user.role.granted_roles(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            typ: ACCESS_TOKEN.to_string(),
        };

        // Refresh tokens carry no roles; they are re-read from the account on refresh
        let refresh_claims = Claims {
            sub: user.id.to_string(),
            name: None,
            email: None,
            roles: vec![],
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: refresh_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            typ: REFRESH_TOKEN.to_string(),
        };

        Ok(TokenPair {
            access_token: self.sign(&access_claims)?,
            refresh_token: self.sign(&refresh_claims)?,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Exchange a refresh token for a new pair. The old refresh token is revoked.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(refresh_token).await?;
        if claims.typ != REFRESH_TOKEN {
            return Err(AuthError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let new_tokens = self.generate_token(&user)?;
        self.blacklist(claims.jti, claims.exp).await;
        Ok(new_tokens)
    }

    /// Revoke a token (add it to the blacklist)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;
        self.blacklist(claims.jti, claims.exp).await;
        Ok(())
    }

    async fn blacklist(&self, jti: String, exp: i64) {
        let expiry = DateTime::<Utc>::from_timestamp(exp, 0).unwrap_or_else(Utc::now);
        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken { jti, expiry });

        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
        debug!(entries = blacklist.len(), "Token revoked");
    }

    /// Check if a token is blacklisted
    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }

    async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Option<AuthUser>, AuthError> {
        let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let auth_value = auth_header.to_str().map_err(|_| AuthError::InvalidToken)?;
        let token = auth_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(AuthError::InvalidToken)?;

        let claims = self.validate_token(token).await?;
        if claims.typ != ACCESS_TOKEN {
            return Err(AuthError::InvalidToken);
        }

        Ok(Some(AuthUser {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
            token_id: claims.jti,
        }))
    }
}

/// Hashes a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Checks a password against a stored PHC hash; malformed hashes never verify
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Token pair response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked".to_string(),
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Token creation failed".to_string(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "AUTH_USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_DATABASE_ERROR",
                "Database error".to_string(),
            ),
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "authentication failure");
        }

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound => ServiceError::NotFound("User not found".into()),
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            AuthError::DatabaseError(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Reads the caller attached by `auth_middleware` or `optional_auth_middleware`.
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

fn auth_service_from(request: &Request) -> Result<Arc<AuthService>, Response> {
    request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| {
            AuthError::InternalError("Authentication service not available".into())
                .into_response()
        })
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(&required_role) {
        warn!(user_id = %user.user_id, role = %required_role, "Role check failed");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that requires a valid bearer access token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match auth_service_from(&request) {
        Ok(service) => service,
        Err(response) => return response,
    };

    match auth_service.authenticate_headers(request.headers()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => AuthError::MissingAuth.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Attaches the caller when a bearer token is present; anonymous requests pass through
pub async fn optional_auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match auth_service_from(&request) {
        Ok(service) => service,
        Err(response) => return response,
    };

    match auth_service.authenticate_headers(request.headers()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_optional_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_optional_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(optional_auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig::new(
                "k".repeat(32) + &"q".repeat(32),
                "restaurant-clients".into(),
                "restaurant-api".into(),
                Duration::from_secs(900),
                Duration::from_secs(86_400),
            ),
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    fn account(role: UserRole) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "amara@gmail.com".into(),
            password_hash: String::new(),
            first_name: "Amara".into(),
            last_name: "Ramdin".into(),
            phone: "57123456".into(),
            address: None,
            date_of_birth: None,
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn issued_access_token_validates() {
        let auth = service();
        let user = account(UserRole::Staff);
        let pair = auth.generate_token(&user).unwrap();

        let claims = auth.validate_token(&pair.access_token).await.unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.typ, ACCESS_TOKEN);
        assert!(claims.roles.contains(&"staff".to_string()));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let auth = service();
        let pair = auth.generate_token(&account(UserRole::Customer)).unwrap();

        auth.revoke_token(&pair.access_token).await.unwrap();
        assert_matches!(
            auth.validate_token(&pair.access_token).await,
            Err(AuthError::RevokedToken)
        );
    }

    #[tokio::test]
    async fn refresh_token_cannot_authenticate_requests() {
        let auth = service();
        let pair = auth.generate_token(&account(UserRole::Customer)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", pair.refresh_token).parse().unwrap(),
        );
        assert_matches!(
            auth.authenticate_headers(&headers).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn tampered_token_is_invalid() {
        let auth = service();
        let pair = auth.generate_token(&account(UserRole::Customer)).unwrap();
        let tampered = format!("{}x", pair.access_token);
        assert_matches!(
            auth.validate_token(&tampered).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn admin_holds_staff_rights() {
        let admin = AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: None,
            email: None,
            roles: vec!["admin".into()],
            token_id: "t".into(),
        };
        assert!(admin.has_role("staff"));
        assert!(admin.has_role("admin"));
        assert!(!admin.has_role("customer"));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }
}
