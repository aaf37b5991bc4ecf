// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, error::AppError};

/// JWT Claims structure.
/// Tokens are issued by the hosted auth service; this backend only verifies them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user's profile id.
    pub sub: String,
    /// Auth role, e.g. 'authenticated'.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-managed metadata; moderators carry `role: "admin"` here.
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.sub
            .parse::<Uuid>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin" || self.app_metadata.role.as_deref() == Some("admin")
    }
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str, audience: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_jwt(token, &config.jwt_secret, &config.jwt_audience) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: Admin Authorization.
///
/// Must run after `auth_middleware`. Rejects non-admins with 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !claims.is_admin() {
        tracing::warn!("Non-admin {} denied moderation access", claims.sub);
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn token(secret: &str, aud: &str, exp_offset: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + exp_offset;
        encode(
            &Header::default(),
            &json!({
                "sub": "7f1c3f0e-2a3b-4c5d-8e9f-0a1b2c3d4e5f",
                "role": "authenticated",
                "aud": aud,
                "exp": exp,
            }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let claims = verify_jwt(&token("s3cret", "authenticated", 600), "s3cret", "authenticated").unwrap();
        assert_eq!(claims.role, "authenticated");
        assert!(claims.user_id().is_ok());
    }

    #[test]
    fn rejects_wrong_secret_audience_or_expired() {
        assert!(verify_jwt(&token("other", "authenticated", 600), "s3cret", "authenticated").is_err());
        assert!(verify_jwt(&token("s3cret", "anon", 600), "s3cret", "authenticated").is_err());
        assert!(verify_jwt(&token("s3cret", "authenticated", -600), "s3cret", "authenticated").is_err());
    }

    #[test]
    fn non_uuid_subject_is_an_auth_error() {
        let claims = Claims {
            sub: "42".to_string(),
            role: "authenticated".to_string(),
            exp: 0,
            email: None,
            app_metadata: AppMetadata::default(),
        };
        assert!(matches!(claims.user_id(), Err(AppError::AuthError(_))));
    }

    #[test]
    fn admin_role_is_read_from_app_metadata() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let admin = encode(
            &Header::default(),
            &json!({
                "sub": "7f1c3f0e-2a3b-4c5d-8e9f-0a1b2c3d4e5f",
                "role": "authenticated",
                "aud": "authenticated",
                "exp": exp,
                "email": "mod@tyuta.net",
                "app_metadata": { "provider": "email", "role": "admin" },
            }),
            &EncodingKey::from_secret("s3cret".as_bytes()),
        )
        .unwrap();

        let claims = verify_jwt(&admin, "s3cret", "authenticated").unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.email.as_deref(), Some("mod@tyuta.net"));

        let plain = verify_jwt(&token("s3cret", "authenticated", 600), "s3cret", "authenticated").unwrap();
        assert!(!plain.is_admin());
    }
}
