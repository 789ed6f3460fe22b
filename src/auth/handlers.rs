use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AccessTokenResponse, LoginRequest, RefreshRequest, TokenPairResponse},
        services::{verify_password, JwtKeys},
    },
    error::{ApiError, ApiJson},
    state::AppState,
    users::repo::User,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
}

/// Obtain an access/refresh pair from username + password.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    payload.username = payload.username.trim().to_string();

    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            ApiError::unauthorized("No active account found with the given credentials")
        })?;

    if !user.is_active {
        warn!(user_id = %user.id, "login for deactivated user");
        return Err(ApiError::unauthorized(
            "No active account found with the given credentials",
        ));
    }

    let ok = verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(username = %payload.username, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized(
            "No active account found with the given credentials",
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_access(user.id)?;
    let refresh = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(TokenPairResponse { refresh, access }))
}

/// Exchange a refresh token for a new access token.
#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    // The subject must still exist and be active.
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let access = keys.sign_access(user.id)?;
    Ok(Json(AccessTokenResponse { access }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pair_serializes_both_fields() {
        let pair = TokenPairResponse {
            refresh: "r.r.r".into(),
            access: "a.a.a".into(),
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["refresh"], "r.r.r");
        assert_eq!(json["access"], "a.a.a");
    }

    #[test]
    fn login_request_parses() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username": "ann", "password": "pw"}"#).unwrap();
        assert_eq!(req.username, "ann");
    }
}
