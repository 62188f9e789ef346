//! Repository for the append-only `audit_logs` table.
//!
//! Entries form a SHA-256 hash chain: each entry's `integrity_hash` covers
//! the previous entry's hash plus its own canonical text.

use hrflow_core::audit::compute_integrity_hash;
use hrflow_core::types::DbId;
use hrflow_core::workflow::sink::AuditRecord;
use sqlx::PgPool;

use crate::models::audit::AuditLog;

const COLUMNS: &str = "\
    id, company_id, actor_id, actor_name, actor_role, action_type, log_category, \
    resource_type, resource_id, changes, integrity_hash, created_at";

/// Advisory lock key serialising chain appends.
const CHAIN_LOCK_KEY: i64 = 0x4852_464c_4155_4454;

pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append one entry to the hash chain.
    pub async fn append(pool: &PgPool, record: &AuditRecord) -> Result<AuditLog, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHAIN_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let prev_hash: Option<String> = sqlx::query_scalar(
            "SELECT integrity_hash FROM audit_logs ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let canonical = AuditLog::canonical_entry(
            record.company_id,
            record.actor_id,
            &record.action_type,
            &record.resource_type,
            record.resource_id,
            &record.changes,
            record.created_at,
        );
        let hash = compute_integrity_hash(prev_hash.as_deref(), &canonical);

        let query = format!(
            "INSERT INTO audit_logs \
                (company_id, actor_id, actor_name, actor_role, action_type, log_category, \
                 resource_type, resource_id, changes, integrity_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, AuditLog>(&query)
            .bind(record.company_id)
            .bind(record.actor_id)
            .bind(&record.actor_name)
            .bind(&record.actor_role)
            .bind(&record.action_type)
            .bind(&record.category)
            .bind(&record.resource_type)
            .bind(record.resource_id)
            .bind(&record.changes)
            .bind(&hash)
            .bind(record.created_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Entries for one resource, oldest first.
    pub async fn list_for_resource(
        pool: &PgPool,
        resource_type: &str,
        resource_id: DbId,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs \
             WHERE resource_type = $1 AND resource_id = $2 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(resource_type)
            .bind(resource_id)
            .fetch_all(pool)
            .await
    }

    /// Walk the whole chain and return the id of the first entry whose hash
    /// does not match, or `None` if the chain is intact.
    pub async fn verify_chain(pool: &PgPool) -> Result<Option<DbId>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audit_logs ORDER BY id ASC");
        let entries = sqlx::query_as::<_, AuditLog>(&query)
            .fetch_all(pool)
            .await?;
        Ok(first_broken_link(&entries))
    }
}

/// First entry whose stored hash differs from the recomputed one.
pub fn first_broken_link(entries: &[AuditLog]) -> Option<DbId> {
    let mut prev: Option<&str> = None;
    for entry in entries {
        let expected = compute_integrity_hash(prev, &entry.canonical());
        if expected != entry.integrity_hash {
            return Some(entry.id);
        }
        prev = Some(entry.integrity_hash.as_str());
    }
    None
}
