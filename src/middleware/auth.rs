//! Session authentication middleware
//!
//! Sessions are a signed JWT carried in an httpOnly `token` cookie. The
//! middleware validates the token, re-reads the user from the database (a
//! deleted user's token is worthless immediately, and role/tenant changes
//! take effect on the next request), and reissues the cookie with a refreshed
//! expiry on every authenticated request - a sliding session, not a refresh
//! protocol.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{OrganizationRepository, UserRepository},
    models::{Role, User},
    utils::ErrorResponse,
    AppState,
};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Username
    pub username: String,
    /// Role at issue time (informational; the middleware re-reads it)
    pub role: Role,
    /// Organization/tenant ID, absent for superadmins
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Not before timestamp
    pub nbf: i64,
    /// JWT ID
    pub jti: String,
}

/// Authenticated user attached to request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// None for superadmins, which exist outside any tenant
    pub organization_id: Option<Uuid>,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// The tenant scope for business-data queries. Superadmins have none and
    /// must use the explicitly-scoped superadmin endpoints instead.
    pub fn require_organization(&self) -> Result<Uuid, crate::utils::AppError> {
        self.organization_id.ok_or_else(|| {
            crate::utils::AppError::forbidden("route requires an organization-scoped account")
        })
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            organization_id: user.organization_id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Extractor for AuthUser from request extensions
///
/// Lets handlers take AuthUser as a parameter after the middleware has run.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("authentication required")),
            )
        })
    }
}

/// Create a session token for a user
pub fn create_session_token(
    user: &User,
    secret: &str,
    ttl_days: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::days(ttl_days as i64);

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        organization_id: user.organization_id.map(|o| o.to_string()),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        nbf: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate and decode a session token
pub fn validate_token(token: &str, secret: &str) -> Result<TokenData<Claims>, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })
}

/// Build the session cookie carrying a token
pub fn session_cookie(token: String, ttl_days: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(ttl_days as i64))
        .build()
}

/// Build an expired session cookie (logout)
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenExpired,
    /// The user referenced by the token no longer exists
    UserGone,
    /// The user's organization has been deactivated
    OrganizationDisabled,
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing authentication token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid authentication token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "session expired"),
            AuthError::UserGone => (StatusCode::UNAUTHORIZED, "user no longer exists"),
            AuthError::OrganizationDisabled => (StatusCode::FORBIDDEN, "organization is disabled"),
            AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Authentication middleware
///
/// Validates the session cookie, attaches AuthUser to request extensions and
/// reissues the cookie with a refreshed expiry on the way out.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::MissingToken)?;

    let token_data = validate_token(&token, &state.config.auth.jwt_secret)?;

    let user_id =
        Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)?;

    // The token only proves identity; role and tenant come from the database.
    let user = UserRepository::new(&state.db)
        .get_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load user for session");
            AuthError::Internal
        })?
        .ok_or(AuthError::UserGone)?;

    if let Some(org_id) = user.organization_id {
        let org = OrganizationRepository::new(&state.db)
            .get_by_id(org_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load organization for session");
                AuthError::Internal
            })?;
        match org {
            Some(org) if org.is_active => {}
            _ => return Err(AuthError::OrganizationDisabled),
        }
    }

    request.extensions_mut().insert(AuthUser::from(&user));

    let mut response = next.run(request).await;

    // Sliding session: reissue with a fresh expiry
    if let Ok(token) = create_session_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.session_ttl_days,
    ) {
        let cookie = session_cookie(
            token,
            state.config.auth.session_ttl_days,
            state.config.auth.secure_cookies,
        );
        if let Ok(value) = cookie.to_string().parse() {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    Ok(response)
}
