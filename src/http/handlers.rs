//! Learning API handlers.
//!
//! Handlers that change state, or answer a certificate question, record an
//! audit event for every request whose body passed validation. That includes
//! a missing identity. Bodies rejected by validation never reach a handler
//! and are not audited.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::clock::rfc3339_now;
use crate::error::AppError;
use crate::http::extract::Validated;
use crate::http::server::AppState;
use crate::learning::types::{
    Assessment, BulkCheckEligibility, Certificate, CreateAssessment, Eligibility,
    GenerateCertificate, ProgressSnapshot, RevokeCertificate, SubmissionResult, SubmitAssessment,
    UpdateProgress, Verification, VerifyCertificate,
};
use crate::observability::AuditStatus;
use crate::security::Caller;
use crate::validation::registry::{
    BULK_CHECK_ELIGIBILITY, CREATE_ASSESSMENT, GENERATE_CERTIFICATE, REVOKE_CERTIFICATE,
    SUBMIT_ASSESSMENT, UPDATE_PROGRESS, VERIFY_CERTIFICATE,
};

/// Record the outcome of `action` on `resource` and hand the result back.
fn audited<T>(
    state: &AppState,
    user_id: Option<&str>,
    action: &str,
    resource: &str,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match &result {
        Ok(_) => state
            .audit
            .record(user_id, action, resource, AuditStatus::Success, Value::Null),
        Err(e) => state.audit.record(
            user_id,
            action,
            resource,
            AuditStatus::Failure,
            json!({ "error": e.to_string(), "status": e.status().as_u16() }),
        ),
    }
    result
}

/// The caller's user id, or an audited 401.
fn require_user<'a>(
    state: &AppState,
    caller: &'a Caller,
    action: &str,
    resource: &str,
) -> Result<&'a str, AppError> {
    let result = caller.require();
    if result.is_err() {
        return audited(state, None, action, resource, result);
    }
    result
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": rfc3339_now() }))
}

pub async fn update_progress(
    State(state): State<AppState>,
    caller: Caller,
    Validated(req): Validated<UpdateProgress>,
) -> Result<Json<ProgressSnapshot>, AppError> {
    let resource = format!("{}/{}", req.course_id, req.module_id);
    let user = require_user(&state, &caller, UPDATE_PROGRESS, &resource)?;
    let snapshot = state.learning.update_progress(user, req);
    audited(&state, Some(user), UPDATE_PROGRESS, &resource, Ok(snapshot)).map(Json)
}

pub async fn create_assessment(
    State(state): State<AppState>,
    caller: Caller,
    Validated(req): Validated<CreateAssessment>,
) -> Result<(StatusCode, Json<Assessment>), AppError> {
    let resource = req.course_id.clone();
    let user = require_user(&state, &caller, CREATE_ASSESSMENT, &resource)?;
    let assessment = state.learning.create_assessment(req);
    audited(&state, Some(user), CREATE_ASSESSMENT, &resource, Ok(assessment))
        .map(|a| (StatusCode::CREATED, Json(a)))
}

pub async fn submit_assessment(
    State(state): State<AppState>,
    caller: Caller,
    Validated(req): Validated<SubmitAssessment>,
) -> Result<Json<SubmissionResult>, AppError> {
    let resource = req.assessment_id.clone();
    let user = require_user(&state, &caller, SUBMIT_ASSESSMENT, &resource)?;
    let result = state.learning.submit_assessment(user, req);
    audited(&state, Some(user), SUBMIT_ASSESSMENT, &resource, result).map(Json)
}

pub async fn course_eligibility(
    State(state): State<AppState>,
    caller: Caller,
    Path(course_id): Path<String>,
) -> Result<Json<Eligibility>, AppError> {
    let user = caller.require()?;
    Ok(Json(state.learning.eligibility(user, &course_id)))
}

pub async fn generate_certificate(
    State(state): State<AppState>,
    caller: Caller,
    Validated(req): Validated<GenerateCertificate>,
) -> Result<(StatusCode, Json<Certificate>), AppError> {
    let resource = req.course_id.clone();
    let result = state.learning.generate_certificate(caller.user_id(), req);
    audited(&state, caller.user_id(), GENERATE_CERTIFICATE, &resource, result)
        .map(|c| (StatusCode::CREATED, Json(c)))
}

pub async fn verify_certificate(
    State(state): State<AppState>,
    caller: Caller,
    Validated(req): Validated<VerifyCertificate>,
) -> Result<Json<Verification>, AppError> {
    let result = state.learning.verify_certificate(&req.certificate_id);
    audited(
        &state,
        caller.user_id(),
        VERIFY_CERTIFICATE,
        &req.certificate_id,
        result,
    )
    .map(Json)
}

pub async fn revoke_certificate(
    State(state): State<AppState>,
    caller: Caller,
    Validated(req): Validated<RevokeCertificate>,
) -> Result<Json<Certificate>, AppError> {
    let resource = req.certificate_id.clone();
    let user = require_user(&state, &caller, REVOKE_CERTIFICATE, &resource)?;
    let result = state.learning.revoke_certificate(Some(user), req);
    audited(&state, Some(user), REVOKE_CERTIFICATE, &resource, result).map(Json)
}

pub async fn bulk_check_eligibility(
    State(state): State<AppState>,
    caller: Caller,
    Validated(req): Validated<BulkCheckEligibility>,
) -> Result<Json<Value>, AppError> {
    let results = state.learning.bulk_eligibility(&req.course_id, &req.user_ids);
    audited(
        &state,
        caller.user_id(),
        BULK_CHECK_ELIGIBILITY,
        &req.course_id,
        Ok(json!({ "courseId": req.course_id, "results": results })),
    )
    .map(Json)
}
