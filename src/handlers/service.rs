use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, ServiceError},
    models::collection::CollectionProperties,
    paths,
    services::auth::RESULT_OK,
    state::ServiceState,
    wire::b64,
};

/// The request payload for OpenSession / CreateSession.
#[derive(Serialize, Deserialize, Debug)]
pub struct OpenSessionRequest {
    pub algorithm: String,
    /// The initiator's DH public value.
    #[serde(with = "b64")]
    pub input: Vec<u8>,
}

/// The response payload for OpenSession / CreateSession.
#[derive(Serialize, Deserialize, Debug)]
pub struct OpenSessionResponse {
    /// The responder's DH public value.
    #[serde(with = "b64")]
    pub output: Vec<u8>,
    pub serial_number: String,
    /// The session's object path.
    pub session: String,
}

/// The request payload for CloseSession.
#[derive(Serialize, Deserialize, Debug)]
pub struct CloseSessionRequest {
    pub session: String,
}

/// The request payload for CreateCollection.
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateCollectionRequest {
    #[serde(default)]
    pub properties: CollectionProperties,
    /// Empty for an unaliased collection.
    #[serde(default)]
    pub alias: String,
}

/// The response payload for CreateCollection.
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateCollectionResponse {
    pub collection: String,
    pub prompt: String,
}

/// The request payload for ReadAlias.
#[derive(Serialize, Deserialize, Debug)]
pub struct ReadAliasRequest {
    pub name: String,
}

/// The response payload for ReadAlias.
#[derive(Serialize, Deserialize, Debug)]
pub struct ReadAliasResponse {
    /// The collection path, or `"/"` if the alias is unassigned.
    pub collection: String,
}

/// A bare result marker.
#[derive(Serialize, Deserialize, Debug)]
pub struct ResultResponse {
    pub result: String,
}

/// Handles OpenSession: negotiates a new encrypted session.
#[axum::debug_handler]
pub async fn open_session(
    State(state): State<ServiceState>,
    Json(payload): Json<OpenSessionRequest>,
) -> Result<Json<OpenSessionResponse>> {
    tracing::debug!("🔐 OpenSession with algorithm {}", payload.algorithm);

    let (output, serial_number) = state
        .sessions
        .negotiate(&payload.algorithm, &payload.input)
        .await?;

    Ok(Json(OpenSessionResponse {
        output,
        session: paths::session_path(&serial_number),
        serial_number,
    }))
}

/// Handles CloseSession.
#[axum::debug_handler]
pub async fn close_session(
    State(state): State<ServiceState>,
    Json(payload): Json<CloseSessionRequest>,
) -> Result<Json<ResultResponse>> {
    let serial = paths::parse_session_path(&payload.session)
        .map_err(|_| ServiceError::UnknownSession)?;
    state.sessions.close(serial).await?;

    Ok(Json(ResultResponse {
        result: RESULT_OK.to_string(),
    }))
}

/// Handles CreateCollection.
#[axum::debug_handler]
pub async fn create_collection(
    State(state): State<ServiceState>,
    Json(payload): Json<CreateCollectionRequest>,
) -> Result<Json<CreateCollectionResponse>> {
    let alias = Some(payload.alias.as_str()).filter(|a| !a.is_empty());
    let (collection, prompt) = state
        .store
        .create_collection(payload.properties, alias)
        .await?;

    Ok(Json(CreateCollectionResponse { collection, prompt }))
}

/// Handles ReadAlias.
#[axum::debug_handler]
pub async fn read_alias(
    State(state): State<ServiceState>,
    Json(payload): Json<ReadAliasRequest>,
) -> Result<Json<ReadAliasResponse>> {
    let collection = state.store.read_alias(&payload.name).await;
    Ok(Json(ReadAliasResponse { collection }))
}
