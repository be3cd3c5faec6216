//! Bulk reconciliation: sweeps every eligible attempt and makes sure a
//! certificate exists for it. Covers records missed by the submit-path
//! trigger (outages, data fixes, threshold changes) and supports forced
//! re-derivation and a destructive recreate.

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::repositories::{certificates, exam_attempts, violations};
use crate::services::certificate_issue::{self, IssueError};

#[derive(Debug, Clone, Default)]
pub(crate) struct ReconcileOptions {
    pub course_id: Option<String>,
    pub user_id: Option<String>,
    /// Re-derive snapshot columns for attempts that already have a
    /// certificate. Artifact, notes and active flag are preserved.
    pub force_update: bool,
    /// Delete every certificate first. Callers must confirm with the
    /// operator before setting this.
    pub recreate: bool,
}

#[derive(Debug)]
pub(crate) struct ReconcileFailure {
    pub attempt_id: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub(crate) struct ReconcileStats {
    pub eligible: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub failures: Vec<ReconcileFailure>,
}

pub(crate) async fn reconcile(
    pool: &PgPool,
    threshold: f64,
    options: &ReconcileOptions,
) -> Result<ReconcileStats, sqlx::Error> {
    let mut stats = ReconcileStats::default();

    if options.recreate {
        stats.deleted = certificates::delete_all(pool).await?;
        tracing::warn!(deleted = stats.deleted, "deleted all certificates before recreate");
    }

    let contexts = exam_attempts::list_eligible_contexts(
        pool,
        threshold,
        options.course_id.as_deref(),
        options.user_id.as_deref(),
    )
    .await?;
    stats.eligible = contexts.len() as u64;

    for context in &contexts {
        let result = if options.force_update {
            force_one(pool, threshold, context).await
        } else {
            create_one(pool, threshold, context).await
        };

        match result {
            Ok(Outcome::Created) => stats.created += 1,
            Ok(Outcome::Updated) => stats.updated += 1,
            Ok(Outcome::Skipped) => stats.skipped += 1,
            Err(err) => {
                tracing::error!(
                    attempt_id = %context.attempt_id,
                    error = %err,
                    "reconciliation failed for attempt"
                );
                stats.failures.push(ReconcileFailure {
                    attempt_id: context.attempt_id.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        eligible = stats.eligible,
        created = stats.created,
        updated = stats.updated,
        skipped = stats.skipped,
        errors = stats.failures.len(),
        "certificate reconciliation finished"
    );

    Ok(stats)
}

enum Outcome {
    Created,
    Updated,
    Skipped,
}

async fn create_one(
    pool: &PgPool,
    threshold: f64,
    context: &exam_attempts::AttemptContextRow,
) -> Result<Outcome, IssueError> {
    match certificate_issue::issue_from_context(pool, threshold, context).await? {
        certificate_issue::IssueOutcome::Created(_) => Ok(Outcome::Created),
        certificate_issue::IssueOutcome::AlreadyExists(_) => Ok(Outcome::Skipped),
        // The eligibility filter already ran in SQL; reaching this means
        // the attempt changed between the query and the derivation.
        certificate_issue::IssueOutcome::Ineligible(reason) => {
            tracing::debug!(attempt_id = %context.attempt_id, %reason, "attempt lost eligibility");
            Ok(Outcome::Skipped)
        }
    }
}

async fn force_one(
    pool: &PgPool,
    threshold: f64,
    context: &exam_attempts::AttemptContextRow,
) -> Result<Outcome, IssueError> {
    let attempt_violations = violations::list_by_attempt(pool, &context.attempt_id).await?;
    let data = match certificate_issue::build_snapshot(context, &attempt_violations, threshold) {
        Ok(data) => data,
        Err(err) if err.is_ineligible() => return Ok(Outcome::Skipped),
        Err(err) => return Err(err),
    };

    let id = Uuid::new_v4().to_string();
    let now = primitive_now_utc();
    let (_, created) =
        certificates::upsert(pool, &id, &context.attempt_id, &data, now).await?;
    Ok(if created { Outcome::Created } else { Outcome::Updated })
}
