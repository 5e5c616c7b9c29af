use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, Row, types::Type};

use crate::duration::{DurationUnit, PlanDuration};
use crate::error::Result;
use crate::models::{Extra, LicenseKey, Plan};

pub const PLAN_COLS: &str = "id, alias, duration_quantity, duration_unit, created_at";

/// License columns joined with the owning plan (`l` and `p` aliases).
pub const LICENSE_COLS: &str = "l.id, l.value, l.service_id, l.identifier, l.activated_at, \
     l.expires_at, l.extra, l.created_at, \
     p.id, p.alias, p.duration_quantity, p.duration_unit, p.created_at";

pub const LICENSE_FROM: &str = "license_keys l LEFT JOIN plans p ON p.id = l.plan_id";

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: impl Params,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(T::from_row(row)?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| T::from_row(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, err.into())
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        conversion_error(idx, Type::Integer, format!("timestamp {} out of range", millis))
    })
}

fn opt_timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => timestamp_at(row, idx).map(Some),
        None => Ok(None),
    }
}

/// Read a plan whose columns start at `offset`.
fn plan_at(row: &Row, offset: usize) -> rusqlite::Result<Plan> {
    let quantity: u32 = row.get(offset + 2)?;
    let unit_raw: String = row.get(offset + 3)?;
    let unit = DurationUnit::from_str(&unit_raw)
        .map_err(|e| conversion_error(offset + 3, Type::Text, e))?;
    let duration = PlanDuration::new(quantity, unit)
        .map_err(|e| conversion_error(offset + 2, Type::Integer, e))?;

    Ok(Plan {
        id: row.get(offset)?,
        alias: row.get(offset + 1)?,
        duration,
        created_at: timestamp_at(row, offset + 4)?,
    })
}

impl FromRow for Plan {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        plan_at(row, 0)
    }
}

impl FromRow for LicenseKey {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let extra_raw: String = row.get(6)?;
        let extra: Extra =
            serde_json::from_str(&extra_raw).map_err(|e| conversion_error(6, Type::Text, e))?;

        let plan = match row.get::<_, Option<String>>(8)? {
            Some(_) => Some(plan_at(row, 8)?),
            None => None,
        };

        Ok(LicenseKey {
            id: row.get(0)?,
            value: row.get(1)?,
            service_id: row.get(2)?,
            plan,
            identifier: row.get(3)?,
            activated_at: opt_timestamp_at(row, 4)?,
            expires_at: opt_timestamp_at(row, 5)?,
            extra,
            created_at: timestamp_at(row, 7)?,
        })
    }
}
