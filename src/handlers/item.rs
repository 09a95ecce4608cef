use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, ServiceError},
    handlers::service::ResultResponse,
    models::item::{ItemInfo, ItemProperties},
    models::secret::SecretPayload,
    services::auth::RESULT_OK,
    state::ServiceState,
};

/// The request payload for CreateItem.
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateItemRequest {
    pub collection: String,
    #[serde(default)]
    pub properties: ItemProperties,
    pub secret: SecretPayload,
    #[serde(default)]
    pub replace: bool,
}

/// The response payload for CreateItem.
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateItemResponse {
    pub item: String,
    pub prompt: String,
}

/// The request payload for GetSecret.
#[derive(Serialize, Deserialize, Debug)]
pub struct GetSecretRequest {
    pub item: String,
    pub session: String,
}

/// The response payload for GetSecret.
#[derive(Serialize, Deserialize, Debug)]
pub struct GetSecretResponse {
    pub secret: SecretPayload,
}

/// The request payload for SetSecret.
#[derive(Serialize, Deserialize, Debug)]
pub struct SetSecretRequest {
    pub item: String,
    pub secret: SecretPayload,
}

/// The request payload for GetItem.
#[derive(Serialize, Deserialize, Debug)]
pub struct GetItemRequest {
    pub item: String,
}

/// Handles CreateItem. The secret must be encrypted under a live session.
#[axum::debug_handler]
pub async fn create_item(
    State(state): State<ServiceState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Json<CreateItemResponse>> {
    state.secrets.ensure_live(&payload.secret.session).await?;

    let (item, prompt) = state
        .store
        .create_item(
            &payload.collection,
            payload.properties,
            payload.secret,
            payload.replace,
        )
        .await?;

    Ok(Json(CreateItemResponse { item, prompt }))
}

/// Handles GetSecret.
#[axum::debug_handler]
pub async fn get_secret(
    State(state): State<ServiceState>,
    Json(payload): Json<GetSecretRequest>,
) -> Result<Json<GetSecretResponse>> {
    let secret = state
        .secrets
        .get_secret(&payload.item, &payload.session)
        .await?;

    Ok(Json(GetSecretResponse { secret }))
}

/// Handles SetSecret.
#[axum::debug_handler]
pub async fn set_secret(
    State(state): State<ServiceState>,
    Json(payload): Json<SetSecretRequest>,
) -> Result<Json<ResultResponse>> {
    state.secrets.set_secret(&payload.item, payload.secret).await?;

    Ok(Json(ResultResponse {
        result: RESULT_OK.to_string(),
    }))
}

/// Handles GetItem: the item's label, attributes and timestamps.
#[axum::debug_handler]
pub async fn get_item(
    State(state): State<ServiceState>,
    Json(payload): Json<GetItemRequest>,
) -> Result<Json<ItemInfo>> {
    let item = state
        .store
        .get_item_by_path(&payload.item)
        .await
        .ok_or(ServiceError::NotFound)?;

    Ok(Json(ItemInfo::from(&item)))
}
