//! Audited medication endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use carebridge_domain::{AuditEntry, Medication, MedicationInput, MedicationPatch};
use serde::Deserialize;

use crate::auth::authenticate;
use crate::context::AppContext;
use crate::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateMedicationBody {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
}

/// `POST /api/patients/{patient_id}/medications`
pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(patient_id): Path<String>,
    Json(body): Json<CreateMedicationBody>,
) -> Result<(StatusCode, Json<Medication>), ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    let input = MedicationInput {
        patient_id,
        name: body.name,
        dosage: body.dosage,
        frequency: body.frequency,
        instructions: body.instructions,
    };
    let medication = ctx.medications.create(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(medication)))
}

/// `GET /api/patients/{patient_id}/medications`
pub async fn list_for_patient(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    authenticate(ctx.identity.as_ref(), &headers).await?;
    Ok(Json(ctx.medications.list_for_patient(&patient_id).await?))
}

/// `GET /api/medications/{id}`
pub async fn get_one(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Medication>, ApiError> {
    authenticate(ctx.identity.as_ref(), &headers).await?;
    Ok(Json(ctx.medications.get(&id).await?))
}

/// `PATCH /api/medications/{id}`
pub async fn update(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<MedicationPatch>,
) -> Result<Json<Medication>, ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    Ok(Json(ctx.medications.update(&id, &patch, &actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct DiscontinueBody {
    pub reason: String,
}

/// `POST /api/medications/{id}/discontinue`
pub async fn discontinue(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<DiscontinueBody>,
) -> Result<Json<Medication>, ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    Ok(Json(ctx.medications.discontinue(&id, &body.reason, &actor).await?))
}

/// `DELETE /api/medications/{id}` — soft delete.
pub async fn remove(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = authenticate(ctx.identity.as_ref(), &headers).await?;
    ctx.medications.delete(&id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/medications/{id}/audit`
pub async fn audit_trail(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    authenticate(ctx.identity.as_ref(), &headers).await?;
    Ok(Json(ctx.medications.audit_trail(&id).await?))
}
