//! Postgres-backed case store (spec.md §6.2 logical layout: `case`,
//! `case_version`, `case_amendment`, `validation_record`,
//! `validation_finding`). `append_version` commits all four tables in one
//! transaction so a version is never observable before its amendment row
//! and validation record (spec.md §4.6).

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::error::StoreError;
use crate::model::{
    Amendment, CaseFilter, CaseStatus, CaseSummary, CaseVersion, FindingStatus, Severity,
    ValidationFinding, ValidationRecord, ValidationStatus, ValidationTotals,
};
use crate::store::{AppendVersionRequest, CaseStore};

pub struct PostgresCaseStore {
    pool: PgPool,
}

impl PostgresCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn transient(e: sqlx::Error) -> StoreError {
    StoreError::Transient(e.to_string())
}

fn row_to_version(row: &sqlx::postgres::PgRow) -> Result<CaseVersion, StoreError> {
    Ok(CaseVersion {
        name: row.try_get("name").map_err(transient)?,
        version: row.try_get::<i64, _>("version").map_err(transient)? as u64,
        hash: row.try_get("hash").map_err(transient)?,
        dsl_snapshot: row.try_get("dsl_snapshot").map_err(transient)?,
        actor: row.try_get("actor").map_err(transient)?,
        created_at: row.try_get("created_at").map_err(transient)?,
    })
}

fn status_to_db(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Pending => "pending",
        CaseStatus::Approved => "approved",
        CaseStatus::Declined => "declined",
        CaseStatus::Review => "review",
    }
}

fn status_from_db(raw: &str) -> Result<CaseStatus, StoreError> {
    match raw {
        "pending" => Ok(CaseStatus::Pending),
        "approved" => Ok(CaseStatus::Approved),
        "declined" => Ok(CaseStatus::Declined),
        "review" => Ok(CaseStatus::Review),
        other => Err(StoreError::Transient(format!(
            "unrecognized case status {:?} in case row",
            other
        ))),
    }
}

#[async_trait]
impl CaseStore for PostgresCaseStore {
    #[instrument(skip(self))]
    async fn get_latest(&self, name: &str) -> Result<CaseVersion, StoreError> {
        let row = sqlx::query(
            "SELECT name, version, hash, dsl_snapshot, actor, created_at FROM case_version \
             WHERE name = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(transient)?
        .ok_or_else(|| StoreError::NotFound {
            kind: "case",
            key: name.to_string(),
        })?;
        row_to_version(&row)
    }

    #[instrument(skip(self))]
    async fn get_version(&self, name: &str, version: u64) -> Result<CaseVersion, StoreError> {
        let row = sqlx::query(
            "SELECT name, version, hash, dsl_snapshot, actor, created_at FROM case_version \
             WHERE name = $1 AND version = $2",
        )
        .bind(name)
        .bind(version as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(transient)?
        .ok_or_else(|| StoreError::NotFound {
            kind: "case_version",
            key: format!("{}@{}", name, version),
        })?;
        row_to_version(&row)
    }

    #[instrument(skip(self))]
    async fn list_versions(&self, name: &str) -> Result<Vec<CaseVersion>, StoreError> {
        let rows = sqlx::query(
            "SELECT name, version, hash, dsl_snapshot, actor, created_at FROM case_version \
             WHERE name = $1 ORDER BY version ASC",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;
        rows.iter().map(row_to_version).collect()
    }

    #[instrument(skip(self))]
    async fn list_cases(&self, filter: Option<CaseFilter>) -> Result<Vec<CaseSummary>, StoreError> {
        let filter = filter.unwrap_or_default();
        let status_filter = filter.status.map(status_to_db);
        let rows = sqlx::query(
            "SELECT name, status, last_updated FROM case \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR name LIKE $2 || '%') \
             ORDER BY name ASC",
        )
        .bind(status_filter)
        .bind(filter.name_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;
        rows.iter()
            .map(|row| {
                Ok(CaseSummary {
                    name: row.try_get("name").map_err(transient)?,
                    status: status_from_db(&row.try_get::<String, _>("status").map_err(transient)?)?,
                    last_updated: row.try_get("last_updated").map_err(transient)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_amendments(&self, name: &str) -> Result<Vec<Amendment>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, from_version, to_version, step, created_at FROM case_amendment \
             WHERE name = $1 ORDER BY created_at ASC",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(transient)?;
        rows.iter()
            .map(|row| {
                Ok(Amendment {
                    id: row.try_get("id").map_err(transient)?,
                    name: row.try_get("name").map_err(transient)?,
                    from_version: row.try_get::<i64, _>("from_version").map_err(transient)? as u64,
                    to_version: row.try_get::<i64, _>("to_version").map_err(transient)? as u64,
                    step: row.try_get("step").map_err(transient)?,
                    created_at: row.try_get("created_at").map_err(transient)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, request))]
    async fn append_version(
        &self,
        request: AppendVersionRequest,
    ) -> Result<CaseVersion, StoreError> {
        let mut tx = self.pool.begin().await.map_err(transient)?;

        let latest_version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) FROM case_version WHERE name = $1 FOR UPDATE",
        )
        .bind(&request.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(transient)?;

        if let Some(amendment) = &request.amendment {
            if amendment.from_version as i64 != latest_version {
                return Err(StoreError::Conflict {
                    name: request.name.clone(),
                    prev_version: amendment.from_version,
                });
            }
        }
        let new_version = latest_version + 1;

        let row = sqlx::query(
            "INSERT INTO case_version (name, version, hash, dsl_snapshot, actor, created_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             RETURNING name, version, hash, dsl_snapshot, actor, created_at",
        )
        .bind(&request.name)
        .bind(new_version)
        .bind(&request.hash)
        .bind(&request.dsl_snapshot)
        .bind(&request.actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(transient)?;
        let version = row_to_version(&row)?;

        if let Some(amendment) = &request.amendment {
            sqlx::query(
                "INSERT INTO case_amendment (id, name, from_version, to_version, step, created_at) \
                 VALUES ($1, $2, $3, $4, $5, now())",
            )
            .bind(uuid::Uuid::new_v4())
            .bind(&request.name)
            .bind(amendment.from_version as i64)
            .bind(new_version)
            .bind(&amendment.step)
            .execute(&mut *tx)
            .await
            .map_err(transient)?;
        }

        insert_validation(&mut tx, &request.validation_record, &request.findings).await?;

        sqlx::query(
            "INSERT INTO case (name, status, last_updated) VALUES ($1, $2, now()) \
             ON CONFLICT (name) DO UPDATE SET status = $2, last_updated = now()",
        )
        .bind(&request.name)
        .bind(status_to_db(request.status))
        .execute(&mut *tx)
        .await
        .map_err(transient)?;

        tx.commit().await.map_err(transient)?;
        Ok(version)
    }

    #[instrument(skip(self, record, findings))]
    async fn record_validation(
        &self,
        record: ValidationRecord,
        findings: Vec<ValidationFinding>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(transient)?;
        insert_validation(&mut tx, &record, &findings).await?;
        tx.commit().await.map_err(transient)?;
        Ok(())
    }
}

async fn insert_validation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    record: &ValidationRecord,
    findings: &[ValidationFinding],
) -> Result<(), StoreError> {
    let status = match record.status {
        ValidationStatus::Pass => "PASS",
        ValidationStatus::Fail => "FAIL",
    };
    sqlx::query(
        "INSERT INTO validation_record \
         (id, case_name, version, actor, status, grammar_version, ontology_version, totals_json, error_message, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())",
    )
    .bind(record.id)
    .bind(&record.case_name)
    .bind(record.version as i64)
    .bind(&record.actor)
    .bind(status)
    .bind(&record.grammar_version)
    .bind(&record.ontology_version)
    .bind(serde_json::to_value(totals_with_metadata(&record.totals, &record.metadata)).unwrap())
    .bind(&record.error_message)
    .execute(&mut **tx)
    .await
    .map_err(transient)?;

    for finding in findings {
        let finding_status = match finding.status {
            FindingStatus::Pass => "PASS",
            FindingStatus::Warn => "WARN",
            FindingStatus::Fail => "FAIL",
        };
        let severity = match finding.severity {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        sqlx::query(
            "INSERT INTO validation_finding \
             (id, validation_record, check_type, check_name, status, message, entity_ref, severity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(finding.id)
        .bind(finding.validation_record)
        .bind(&finding.check_type)
        .bind(&finding.check_name)
        .bind(finding_status)
        .bind(&finding.message)
        .bind(&finding.entity_ref)
        .bind(severity)
        .execute(&mut **tx)
        .await
        .map_err(transient)?;
    }
    Ok(())
}

fn totals_with_metadata(
    totals: &ValidationTotals,
    metadata: &serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "total": totals.total,
        "passed": totals.passed,
        "failed": totals.failed,
        "metadata": metadata,
    })
}
