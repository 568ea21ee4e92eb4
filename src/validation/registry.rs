//! Operation name → schema lookup.
//!
//! Built once at startup and shared read-only. A missing schema means the
//! operation is not validated at all.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::validation::rules::FieldRule;
use crate::validation::schema::Schema;

pub const UPDATE_PROGRESS: &str = "updateProgress";
pub const SUBMIT_ASSESSMENT: &str = "submitAssessment";
pub const CREATE_ASSESSMENT: &str = "createAssessment";
pub const GENERATE_CERTIFICATE: &str = "generateCertificate";
pub const VERIFY_CERTIFICATE: &str = "verifyCertificate";
pub const REVOKE_CERTIFICATE: &str = "revokeCertificate";
pub const BULK_CHECK_ELIGIBILITY: &str = "bulkCheckEligibility";

const CERTIFICATE_ID_PATTERN: &str = r"^CERT-[A-Za-z0-9]{8,64}$";
const MAX_BULK_USERS: usize = 100;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid pattern for {operation}.{field}: {source}")]
    Pattern {
        operation: &'static str,
        field: &'static str,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, Schema>,
}

impl SchemaRegistry {
    pub fn new(schemas: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            schemas: schemas.into_iter().map(|s| (s.operation(), s)).collect(),
        }
    }

    /// The schemas of the learning API.
    pub fn builtin() -> Result<Self, SchemaError> {
        let cert_id = |operation: &'static str| {
            Regex::new(CERTIFICATE_ID_PATTERN).map_err(|source| SchemaError::Pattern {
                operation,
                field: "certificateId",
                source,
            })
        };

        let schemas = [
            Schema::builder(UPDATE_PROGRESS)
                .field("courseId", FieldRule::string().required())
                .field("moduleId", FieldRule::string().required())
                .field("percentage", FieldRule::number().required().min(0.0).max(100.0))
                .field("timeSpent", FieldRule::number().min(0.0))
                .build(),
            Schema::builder(SUBMIT_ASSESSMENT)
                .field("assessmentId", FieldRule::string().required())
                .field(
                    "answers",
                    FieldRule::array().required().custom(
                        non_empty_array,
                        Some("answers must contain at least one answer"),
                    ),
                )
                .field("timeTaken", FieldRule::number().min(0.0))
                .build(),
            Schema::builder(CREATE_ASSESSMENT)
                .field("courseId", FieldRule::string().required())
                .field(
                    "title",
                    FieldRule::string().required().min_length(3).max_length(200),
                )
                .field(
                    "type",
                    FieldRule::string()
                        .required()
                        .one_of(["quiz", "assignment", "exam"]),
                )
                .field("passingScore", FieldRule::number().min(0.0).max(100.0))
                .field(
                    "questions",
                    FieldRule::array().custom(
                        well_formed_questions,
                        Some("questions must be objects with a correctAnswer"),
                    ),
                )
                .field("duration", FieldRule::number().min(1.0))
                .build(),
            Schema::builder(GENERATE_CERTIFICATE)
                .field("courseId", FieldRule::string().required())
                .field("userId", FieldRule::string())
                .build(),
            Schema::builder(VERIFY_CERTIFICATE)
                .field(
                    "certificateId",
                    FieldRule::string()
                        .required()
                        .pattern(cert_id(VERIFY_CERTIFICATE)?),
                )
                .build(),
            Schema::builder(REVOKE_CERTIFICATE)
                .field(
                    "certificateId",
                    FieldRule::string()
                        .required()
                        .pattern(cert_id(REVOKE_CERTIFICATE)?),
                )
                .field(
                    "reason",
                    FieldRule::string().required().min_length(10).max_length(500),
                )
                .build(),
            Schema::builder(BULK_CHECK_ELIGIBILITY)
                .field("courseId", FieldRule::string().required())
                .field(
                    "userIds",
                    FieldRule::array().required().custom(
                        bounded_user_ids,
                        Some("userIds must contain between 1 and 100 user ids"),
                    ),
                )
                .build(),
        ];

        Ok(Self::new(schemas))
    }

    pub fn lookup(&self, operation: &str) -> Option<&Schema> {
        self.schemas.get(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas.keys().copied()
    }
}

fn non_empty_array(value: &Value) -> bool {
    value.as_array().is_some_and(|a| !a.is_empty())
}

fn well_formed_questions(value: &Value) -> bool {
    value.as_array().is_some_and(|questions| {
        questions
            .iter()
            .all(|q| q.get("correctAnswer").is_some_and(|a| !a.is_null()))
    })
}

fn bounded_user_ids(value: &Value) -> bool {
    value.as_array().is_some_and(|ids| {
        (1..=MAX_BULK_USERS).contains(&ids.len())
            && ids.iter().all(|id| id.as_str().is_some_and(|s| !s.is_empty()))
    })
}
