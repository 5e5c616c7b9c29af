use chrono::{DateTime, Utc};
use rusqlite::{Connection, params, types::Value};
use uuid::Uuid;

use crate::duration::PlanDuration;
use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{LICENSE_COLS, LICENSE_FROM, PLAN_COLS, query_all, query_one, to_millis};

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// True when `err` is a UNIQUE constraint violation (e.g. a duplicate
/// license value or plan alias).
pub fn is_unique_violation(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Database(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ============ Plans ============

pub fn create_plan(
    conn: &Connection,
    alias: Option<&str>,
    duration: PlanDuration,
    now: DateTime<Utc>,
) -> Result<Plan> {
    let id = gen_id();

    let inserted = conn.execute(
        "INSERT INTO plans (id, alias, duration_quantity, duration_unit, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, alias, duration.quantity, duration.unit.as_ref(), to_millis(now)],
    );
    if let Err(e) = inserted {
        let err = AppError::from(e);
        if is_unique_violation(&err) {
            return Err(AppError::AliasTaken(alias.unwrap_or_default().to_string()));
        }
        return Err(err);
    }

    Ok(Plan {
        id,
        alias: alias.map(String::from),
        duration,
        created_at: now,
    })
}

/// Resolve a plan by its id or its alias.
pub fn get_plan(conn: &Connection, id_or_alias: &str) -> Result<Option<Plan>> {
    query_one(
        conn,
        &format!("SELECT {} FROM plans WHERE id = ?1 OR alias = ?1", PLAN_COLS),
        params![id_or_alias],
    )
}

pub fn list_plans(conn: &Connection) -> Result<Vec<Plan>> {
    query_all(
        conn,
        &format!("SELECT {} FROM plans ORDER BY created_at DESC, id", PLAN_COLS),
        [],
    )
}

// ============ License keys ============

/// Insert a freshly issued license. A duplicate `value` surfaces as a
/// database error; see [`is_unique_violation`].
pub fn create_license_key(
    conn: &Connection,
    value: &str,
    service_id: &str,
    plan: Option<&Plan>,
    now: DateTime<Utc>,
) -> Result<LicenseKey> {
    let id = gen_id();

    conn.execute(
        "INSERT INTO license_keys (id, value, service_id, plan_id, extra, created_at)
         VALUES (?1, ?2, ?3, ?4, '{}', ?5)",
        params![&id, value, service_id, plan.map(|p| &p.id), to_millis(now)],
    )?;

    Ok(LicenseKey {
        id,
        value: value.to_string(),
        service_id: service_id.to_string(),
        plan: plan.cloned(),
        identifier: None,
        activated_at: None,
        expires_at: None,
        extra: Extra::new(),
        created_at: now,
    })
}

pub fn get_license_key_by_id(conn: &Connection, id: &str) -> Result<Option<LicenseKey>> {
    query_one(
        conn,
        &format!("SELECT {} FROM {} WHERE l.id = ?1", LICENSE_COLS, LICENSE_FROM),
        params![id],
    )
}

pub fn get_license_key_by_value(conn: &Connection, value: &str) -> Result<Option<LicenseKey>> {
    query_one(
        conn,
        &format!("SELECT {} FROM {} WHERE l.value = ?1", LICENSE_COLS, LICENSE_FROM),
        params![value],
    )
}

/// Activated licenses bound to `identifier` within `service_id` that have
/// not expired at `now`, excluding `exclude_id`.
///
/// Ordered latest expiry first, then oldest record, then id, so the first
/// row is always the same for the same data.
pub fn list_unexpired_for_identifier(
    conn: &Connection,
    identifier: &str,
    service_id: &str,
    now: DateTime<Utc>,
    exclude_id: &str,
) -> Result<Vec<LicenseKey>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM {}
             WHERE l.identifier = ?1 AND l.service_id = ?2
               AND l.activated_at IS NOT NULL AND l.expires_at >= ?3
               AND l.id != ?4
             ORDER BY l.expires_at DESC, l.created_at ASC, l.id ASC",
            LICENSE_COLS, LICENSE_FROM
        ),
        params![identifier, service_id, to_millis(now), exclude_id],
    )
}

/// Compare-and-set the expiry of a superseded license.
///
/// Returns false if the stored expiry is no longer `expected`.
pub fn truncate_expiry(
    conn: &Connection,
    id: &str,
    expected: DateTime<Utc>,
    new_expires_at: DateTime<Utc>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE license_keys SET expires_at = ?1 WHERE id = ?2 AND expires_at = ?3",
        params![to_millis(new_expires_at), id, to_millis(expected)],
    )?;
    Ok(affected > 0)
}

/// Persist the activation fields of `license`, but only if the stored record
/// is still unbound. Returns false if another activation got there first.
pub fn mark_activated(conn: &Connection, license: &LicenseKey) -> Result<bool> {
    let extra = serde_json::to_string(&license.extra)?;
    let affected = conn.execute(
        "UPDATE license_keys
         SET identifier = ?1, activated_at = ?2, expires_at = ?3, extra = ?4
         WHERE id = ?5 AND identifier IS NULL AND activated_at IS NULL",
        params![
            &license.identifier,
            license.activated_at.map(to_millis),
            license.expires_at.map(to_millis),
            extra,
            &license.id
        ],
    )?;
    Ok(affected > 0)
}

/// Page through licenses matching `filter`. `now` anchors the derived
/// status filter. Returns the page and the total number of matches.
pub fn list_license_keys(
    conn: &Connection,
    filter: &LicenseFilter,
    sort: LicenseSort,
    limit: i64,
    offset: i64,
    now: DateTime<Utc>,
) -> Result<(Vec<LicenseKey>, i64)> {
    let mut conditions: Vec<&'static str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    match filter.status {
        Some(LicenseStatus::Issued) => conditions.push("l.activated_at IS NULL"),
        Some(LicenseStatus::Active) => {
            conditions
                .push("l.activated_at IS NOT NULL AND (l.expires_at IS NULL OR l.expires_at >= ?)");
            values.push(to_millis(now).into());
        }
        Some(LicenseStatus::Expired) => {
            conditions.push("l.activated_at IS NOT NULL AND l.expires_at < ?");
            values.push(to_millis(now).into());
        }
        None => {}
    }
    if let Some(service_id) = &filter.service_id {
        conditions.push("l.service_id = ?");
        values.push(service_id.clone().into());
    }
    if let Some(plan_id) = &filter.plan_id {
        conditions.push("l.plan_id = ?");
        values.push(plan_id.clone().into());
    }
    if let Some(identifier) = &filter.identifier {
        conditions.push("l.identifier = ?");
        values.push(identifier.clone().into());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM license_keys l {}", where_clause),
        rusqlite::params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let direction = if sort.descending { "DESC" } else { "ASC" };
    let sql = format!(
        "SELECT {} FROM {} {} ORDER BY l.{} {}, l.id ASC LIMIT ? OFFSET ?",
        LICENSE_COLS,
        LICENSE_FROM,
        where_clause,
        sort.field.column(),
        direction
    );
    values.push(limit.into());
    values.push(offset.into());

    let items = query_all(conn, &sql, rusqlite::params_from_iter(values))?;
    Ok((items, total))
}
