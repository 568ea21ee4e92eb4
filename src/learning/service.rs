//! In-memory course progress, assessments and certificates.
//!
//! Lock discipline: no method holds guards on two maps at once except
//! `generate_certificate`, which holds the `issued` entry while inserting
//! into `certificates`. Nothing takes those two in the opposite order.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::clock::rfc3339_now;
use crate::error::AppError;
use crate::learning::types::{
    Assessment, Certificate, CreateAssessment, Eligibility, GenerateCertificate, LearningSummary,
    ProgressSnapshot, Revocation, RevokeCertificate, SubmissionResult, SubmitAssessment,
    UpdateProgress, Verification,
};

const DEFAULT_PASSING_SCORE: f64 = 70.0;
const COMPLETE: f64 = 100.0;

type UserCourse = (String, String);

#[derive(Debug, Default, Clone)]
struct CourseProgress {
    modules: BTreeMap<String, f64>,
    time_spent: f64,
}

impl CourseProgress {
    fn average(&self) -> f64 {
        if self.modules.is_empty() {
            return 0.0;
        }
        self.modules.values().sum::<f64>() / self.modules.len() as f64
    }
}

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    best_score: f64,
    attempts: u32,
}

#[derive(Debug, Default)]
pub struct LearningService {
    progress: DashMap<UserCourse, CourseProgress>,
    assessments: DashMap<String, Assessment>,
    attempts: DashMap<(String, String), AttemptRecord>,
    certificates: DashMap<String, Certificate>,
    issued: DashMap<UserCourse, String>,
}

impl LearningService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record module completion. Completion never goes backwards; time spent accumulates.
    pub fn update_progress(&self, user_id: &str, req: UpdateProgress) -> ProgressSnapshot {
        let mut progress = self
            .progress
            .entry((user_id.to_owned(), req.course_id.clone()))
            .or_default();

        let module = progress.modules.entry(req.module_id.clone()).or_insert(0.0);
        *module = module.max(req.percentage);
        let module_percentage = *module;
        progress.time_spent = (progress.time_spent + req.time_spent.unwrap_or(0.0)).min(f64::MAX);

        ProgressSnapshot {
            course_id: req.course_id,
            module_id: req.module_id,
            module_percentage,
            course_percentage: round2(progress.average()),
            time_spent: progress.time_spent,
        }
    }

    pub fn create_assessment(&self, req: CreateAssessment) -> Assessment {
        let assessment = Assessment {
            id: Uuid::new_v4().to_string(),
            course_id: req.course_id,
            title: req.title,
            kind: req.kind,
            passing_score: req.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
            questions: req.questions,
            duration: req.duration,
            created_at: rfc3339_now(),
        };
        self.assessments
            .insert(assessment.id.clone(), assessment.clone());
        assessment
    }

    pub fn submit_assessment(
        &self,
        user_id: &str,
        req: SubmitAssessment,
    ) -> Result<SubmissionResult, AppError> {
        let (score, passing_score) = {
            let assessment = self.assessments.get(&req.assessment_id).ok_or_else(|| {
                AppError::domain_with(
                    StatusCode::NOT_FOUND,
                    "Assessment not found",
                    json!({ "assessmentId": req.assessment_id }),
                )
            })?;
            (score_answers(&assessment, &req.answers), assessment.passing_score)
        };

        let mut record = self
            .attempts
            .entry((user_id.to_owned(), req.assessment_id.clone()))
            .or_insert(AttemptRecord {
                best_score: 0.0,
                attempts: 0,
            });
        record.attempts += 1;
        record.best_score = record.best_score.max(score);

        Ok(SubmissionResult {
            assessment_id: req.assessment_id,
            score,
            passed: score >= passing_score,
            best_score: record.best_score,
            attempts: record.attempts,
        })
    }

    /// A user is eligible once every tracked module is complete (at least
    /// one must be tracked) and every assessment of the course is passed.
    pub fn eligibility(&self, user_id: &str, course_id: &str) -> Eligibility {
        let (completed_modules, total_modules) = self
            .progress
            .get(&(user_id.to_owned(), course_id.to_owned()))
            .map(|p| {
                let done = p.modules.values().filter(|&&pct| pct >= COMPLETE).count();
                (done, p.modules.len())
            })
            .unwrap_or((0, 0));

        let course_assessments: Vec<(String, f64)> = self
            .assessments
            .iter()
            .filter(|a| a.course_id == course_id)
            .map(|a| (a.id.clone(), a.passing_score))
            .collect();

        let mut passed_assessments = 0;
        let mut scores = Vec::new();
        for (assessment_id, passing_score) in &course_assessments {
            if let Some(record) = self
                .attempts
                .get(&(user_id.to_owned(), assessment_id.clone()))
            {
                scores.push(record.best_score);
                if record.best_score >= *passing_score {
                    passed_assessments += 1;
                }
            }
        }

        let average_score =
            (!scores.is_empty()).then(|| round2(scores.iter().sum::<f64>() / scores.len() as f64));

        Eligibility {
            user_id: user_id.to_owned(),
            course_id: course_id.to_owned(),
            eligible: total_modules > 0
                && completed_modules == total_modules
                && passed_assessments == course_assessments.len(),
            completed_modules,
            total_modules,
            passed_assessments,
            total_assessments: course_assessments.len(),
            average_score,
        }
    }

    pub fn bulk_eligibility(&self, course_id: &str, user_ids: &[String]) -> Vec<Eligibility> {
        user_ids
            .iter()
            .map(|user_id| self.eligibility(user_id, course_id))
            .collect()
    }

    /// Issue a certificate, or return the active one already issued.
    pub fn generate_certificate(
        &self,
        caller: Option<&str>,
        req: GenerateCertificate,
    ) -> Result<Certificate, AppError> {
        let user_id = match (req.user_id.as_deref(), caller) {
            (Some(user), _) | (None, Some(user)) => user.to_owned(),
            (None, None) => {
                return Err(AppError::domain(
                    StatusCode::UNAUTHORIZED,
                    "Authentication required",
                ))
            }
        };

        match self.issued.entry((user_id.clone(), req.course_id.clone())) {
            Entry::Occupied(slot) => self
                .certificates
                .get(slot.get())
                .map(|c| c.value().clone())
                .ok_or_else(|| AppError::internal("issued certificate index is out of sync")),
            Entry::Vacant(slot) => {
                let eligibility = self.eligibility(&user_id, &req.course_id);
                if !eligibility.eligible {
                    return Err(AppError::domain_with(
                        StatusCode::FORBIDDEN,
                        "User is not eligible for a certificate",
                        json!(eligibility),
                    ));
                }

                let certificate = Certificate {
                    id: format!("CERT-{}", Uuid::new_v4().simple()).to_uppercase(),
                    user_id,
                    course_id: req.course_id,
                    issued_at: rfc3339_now(),
                    final_score: eligibility.average_score,
                    revocation: None,
                };
                self.certificates
                    .insert(certificate.id.clone(), certificate.clone());
                slot.insert(certificate.id.clone());
                Ok(certificate)
            }
        }
    }

    pub fn verify_certificate(&self, certificate_id: &str) -> Result<Verification, AppError> {
        let certificate = self
            .certificates
            .get(certificate_id)
            .map(|c| c.value().clone())
            .ok_or_else(|| certificate_not_found(certificate_id))?;

        Ok(Verification {
            valid: !certificate.is_revoked(),
            certificate,
        })
    }

    pub fn revoke_certificate(
        &self,
        revoked_by: Option<&str>,
        req: RevokeCertificate,
    ) -> Result<Certificate, AppError> {
        let revoked = {
            let mut certificate = self
                .certificates
                .get_mut(&req.certificate_id)
                .ok_or_else(|| certificate_not_found(&req.certificate_id))?;

            if certificate.is_revoked() {
                return Err(AppError::domain_with(
                    StatusCode::CONFLICT,
                    "Certificate already revoked",
                    json!({ "certificateId": req.certificate_id }),
                ));
            }

            certificate.revocation = Some(Revocation {
                reason: req.reason,
                revoked_at: rfc3339_now(),
                revoked_by: revoked_by.map(str::to_owned),
            });
            certificate.clone()
        };

        self.issued.remove_if(
            &(revoked.user_id.clone(), revoked.course_id.clone()),
            |_, id| *id == revoked.id,
        );
        Ok(revoked)
    }

    pub fn summary(&self) -> LearningSummary {
        LearningSummary {
            tracked_enrollments: self.progress.len(),
            assessments: self.assessments.len(),
            certificates_issued: self.certificates.len(),
            certificates_revoked: self
                .certificates
                .iter()
                .filter(|c| c.is_revoked())
                .count(),
        }
    }
}

fn certificate_not_found(certificate_id: &str) -> AppError {
    AppError::domain_with(
        StatusCode::NOT_FOUND,
        "Certificate not found",
        json!({ "certificateId": certificate_id }),
    )
}

/// Percentage of answers matching the question key, by position.
fn score_answers(assessment: &Assessment, answers: &[Value]) -> f64 {
    let total = assessment.questions.len();
    if total == 0 {
        return COMPLETE;
    }
    let correct = assessment
        .questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| answers_match(&q.correct_answer, a))
        .count();
    round2(correct as f64 / total as f64 * 100.0)
}

fn answers_match(expected: &Value, given: &Value) -> bool {
    match (expected, given) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x.trim().eq_ignore_ascii_case(y.trim()),
        _ => expected == given,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
