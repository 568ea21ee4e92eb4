//! Typed request and response payloads of the learning API.
//!
//! Requests are deserialized only after the body passed its schema, so the
//! serde shapes here mirror the registry's field tables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::registry::{
    BULK_CHECK_ELIGIBILITY, CREATE_ASSESSMENT, GENERATE_CERTIFICATE, REVOKE_CERTIFICATE,
    SUBMIT_ASSESSMENT, UPDATE_PROGRESS, VERIFY_CERTIFICATE,
};

/// A request body bound to a named schema.
pub trait Operation: serde::de::DeserializeOwned + Send {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgress {
    pub course_id: String,
    pub module_id: String,
    pub percentage: f64,
    pub time_spent: Option<f64>,
}

impl Operation for UpdateProgress {
    const NAME: &'static str = UPDATE_PROGRESS;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssessment {
    pub assessment_id: String,
    pub answers: Vec<Value>,
    pub time_taken: Option<f64>,
}

impl Operation for SubmitAssessment {
    const NAME: &'static str = SUBMIT_ASSESSMENT;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    Quiz,
    Assignment,
    Exam,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub correct_answer: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessment {
    pub course_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AssessmentKind,
    pub passing_score: Option<f64>,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub duration: Option<f64>,
}

impl Operation for CreateAssessment {
    const NAME: &'static str = CREATE_ASSESSMENT;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCertificate {
    pub course_id: String,
    pub user_id: Option<String>,
}

impl Operation for GenerateCertificate {
    const NAME: &'static str = GENERATE_CERTIFICATE;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCertificate {
    pub certificate_id: String,
}

impl Operation for VerifyCertificate {
    const NAME: &'static str = VERIFY_CERTIFICATE;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeCertificate {
    pub certificate_id: String,
    pub reason: String,
}

impl Operation for RevokeCertificate {
    const NAME: &'static str = REVOKE_CERTIFICATE;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCheckEligibility {
    pub course_id: String,
    pub user_ids: Vec<String>,
}

impl Operation for BulkCheckEligibility {
    const NAME: &'static str = BULK_CHECK_ELIGIBILITY;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub course_id: String,
    pub module_id: String,
    pub module_percentage: f64,
    pub course_percentage: f64,
    pub time_spent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AssessmentKind,
    pub passing_score: f64,
    pub questions: Vec<Question>,
    pub duration: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub assessment_id: String,
    pub score: f64,
    pub passed: bool,
    pub best_score: f64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub user_id: String,
    pub course_id: String,
    pub eligible: bool,
    pub completed_modules: usize,
    pub total_modules: usize,
    pub passed_assessments: usize,
    pub total_assessments: usize,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revocation {
    pub reason: String,
    pub revoked_at: String,
    pub revoked_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub issued_at: String,
    pub final_score: Option<f64>,
    pub revocation: Option<Revocation>,
}

impl Certificate {
    pub fn is_revoked(&self) -> bool {
        self.revocation.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub valid: bool,
    pub certificate: Certificate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSummary {
    pub tracked_enrollments: usize,
    pub assessments: usize,
    pub certificates_issued: usize,
    pub certificates_revoked: usize,
}
