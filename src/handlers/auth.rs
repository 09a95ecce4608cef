use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    handlers::service::ResultResponse,
    services::auth::{EncryptedValue, PasswordChange},
    state::ServiceState,
    wire::b64,
};

/// The request payload for SetPassword.
///
/// Every byte field is ciphertext under the session key, paired with its IV.
#[derive(Serialize, Deserialize)]
pub struct SetPasswordRequest {
    pub serial_number: String,
    #[serde(with = "b64")]
    pub old_password: Vec<u8>,
    #[serde(with = "b64")]
    pub old_password_iv: Vec<u8>,
    #[serde(with = "b64")]
    pub new_password: Vec<u8>,
    #[serde(with = "b64")]
    pub new_password_iv: Vec<u8>,
    #[serde(with = "b64")]
    pub old_salt: Vec<u8>,
    #[serde(with = "b64")]
    pub old_salt_iv: Vec<u8>,
    #[serde(with = "b64")]
    pub new_salt: Vec<u8>,
    #[serde(with = "b64")]
    pub new_salt_iv: Vec<u8>,
}

/// The request payload for Login.
#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub serial_number: String,
    /// The hex password hash, encrypted under the session key.
    #[serde(with = "b64")]
    pub hash: Vec<u8>,
    #[serde(with = "b64")]
    pub hash_iv: Vec<u8>,
}

/// The response payload for Login.
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    /// The session cookie, encrypted under the session key.
    #[serde(with = "b64")]
    pub cookie: Vec<u8>,
    #[serde(with = "b64")]
    pub cookie_iv: Vec<u8>,
    pub result: String,
}

/// The request payload for Command.
#[derive(Serialize, Deserialize)]
pub struct CommandRequest {
    pub serial_number: String,
    #[serde(with = "b64")]
    pub cookie: Vec<u8>,
    #[serde(with = "b64")]
    pub cookie_iv: Vec<u8>,
    #[serde(with = "b64")]
    pub command: Vec<u8>,
    #[serde(with = "b64")]
    pub command_iv: Vec<u8>,
}

/// The response payload for Command.
#[derive(Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(with = "b64")]
    pub reply: Vec<u8>,
    #[serde(with = "b64")]
    pub reply_iv: Vec<u8>,
    pub result: String,
}

/// Handles SetPassword.
#[axum::debug_handler]
pub async fn set_password(
    State(state): State<ServiceState>,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<Json<ResultResponse>> {
    tracing::info!("🔑 SetPassword for session {}", payload.serial_number);

    let change = PasswordChange {
        old_password: EncryptedValue::new(payload.old_password, payload.old_password_iv),
        new_password: EncryptedValue::new(payload.new_password, payload.new_password_iv),
        old_salt: EncryptedValue::new(payload.old_salt, payload.old_salt_iv),
        new_salt: EncryptedValue::new(payload.new_salt, payload.new_salt_iv),
    };
    let result = state.auth.set_password(&payload.serial_number, change).await?;

    Ok(Json(ResultResponse {
        result: result.to_string(),
    }))
}

/// Handles Login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<ServiceState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    tracing::info!("🔐 Login attempt for session {}", payload.serial_number);

    let (cookie, result) = state
        .auth
        .login(
            &payload.serial_number,
            EncryptedValue::new(payload.hash, payload.hash_iv),
        )
        .await?;

    Ok(Json(LoginResponse {
        cookie: cookie.value,
        cookie_iv: cookie.iv,
        result: result.to_string(),
    }))
}

/// Handles Command: a cookie-authorized request on a logged-in session.
#[axum::debug_handler]
pub async fn command(
    State(state): State<ServiceState>,
    Json(payload): Json<CommandRequest>,
) -> Result<Json<CommandResponse>> {
    let (reply, result) = state
        .auth
        .command(
            &payload.serial_number,
            EncryptedValue::new(payload.cookie, payload.cookie_iv),
            EncryptedValue::new(payload.command, payload.command_iv),
        )
        .await?;

    Ok(Json(CommandResponse {
        reply: reply.value,
        reply_iv: reply.iv,
        result: result.to_string(),
    }))
}
