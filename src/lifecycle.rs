//! License lifecycle: issuing keys, activating them and validating them.
//!
//! A license moves from issued (no identifier, no activation time, no
//! expiry) to activated (all three set). "Expired" is only a reading of
//! `expires_at` against the clock.
//!
//! Activating a license for an identifier that still holds unexpired time in
//! the same service *chains*: the new window starts where the old one ends,
//! and the old license is cut off at the activation time. Both writes happen
//! in one IMMEDIATE transaction, so concurrent activations serialize and a
//! failed activation leaves both records untouched.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::keygen::KeyGenerator;
use crate::models::{Extra, LicenseKey};

/// Current time at the precision the store keeps (milliseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Issue a new, unactivated license for `service_id`.
///
/// `plan` is a plan id or alias; when given it must resolve. Generated
/// values that collide with an existing license are retried up to
/// `attempts` times.
pub fn issue(
    conn: &Connection,
    keys: &dyn KeyGenerator,
    attempts: u32,
    service_id: &str,
    plan: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LicenseKey> {
    let now = now.trunc_subsecs(3);

    let plan = match plan {
        Some(id_or_alias) => {
            Some(queries::get_plan(conn, id_or_alias)?.ok_or(AppError::InvalidPlan)?)
        }
        None => None,
    };

    for attempt in 1..=attempts {
        let value = keys.generate(service_id);
        match queries::create_license_key(conn, &value, service_id, plan.as_ref(), now) {
            Ok(license) => {
                tracing::info!(
                    license_id = %license.id,
                    service_id,
                    plan_id = plan.as_ref().map(|p| p.id.as_str()),
                    "License issued"
                );
                return Ok(license);
            }
            Err(e) if queries::is_unique_violation(&e) => {
                tracing::warn!(attempt, service_id, "License value collision, regenerating");
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal(format!(
        "no unique license value after {} attempts",
        attempts
    )))
}

/// Outcome of a successful activation.
#[derive(Debug, Clone)]
pub struct Activation {
    pub license: LicenseKey,
    /// Expiry of the superseded license the new window was chained onto.
    pub chained_from: Option<DateTime<Utc>>,
    /// Ids of licenses whose expiry was cut to the activation time.
    pub superseded: Vec<String>,
}

/// Bind the license with `value` to `identifier` and start its clock.
///
/// If the identifier already holds unexpired licenses in the same service,
/// the new window starts at the latest of their expiries and all of them are
/// truncated to `now`. Nothing is written unless every step succeeds.
pub fn activate(
    conn: &mut Connection,
    value: &str,
    identifier: &str,
    extra: Option<Extra>,
    now: DateTime<Utc>,
) -> Result<Activation> {
    let now = now.trunc_subsecs(3);

    // IMMEDIATE takes the write lock up front: the "still issued" check and
    // the candidate search can't be raced by another activation.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut license =
        queries::get_license_key_by_value(&tx, value)?.ok_or(AppError::LicenseNotFound)?;
    let plan = license.plan.clone().ok_or(AppError::NoPlanToLicense)?;
    if !license.is_issued() {
        return Err(AppError::LicenseAlreadyActive);
    }

    let candidates = queries::list_unexpired_for_identifier(
        &tx,
        identifier,
        &license.service_id,
        now,
        &license.id,
    )?;
    if candidates.len() > 1 {
        tracing::warn!(
            identifier,
            service_id = %license.service_id,
            count = candidates.len(),
            "Several unexpired licenses for one identifier, chaining from the latest"
        );
    }

    let chained_from = candidates.first().and_then(|c| c.expires_at);
    let start = chained_from.unwrap_or(now);
    // Overflow here is a fault of the stored plan, not of the caller.
    let expires_at = plan
        .duration
        .add_to(start)
        .map_err(|e| AppError::Internal(format!("plan {}: {}", plan.id, e)))?;

    let mut superseded = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let Some(expected) = candidate.expires_at else {
            continue;
        };
        if !queries::truncate_expiry(&tx, &candidate.id, expected, now)? {
            return Err(AppError::Internal(format!(
                "license {} changed during activation",
                candidate.id
            )));
        }
        superseded.push(candidate.id.clone());
    }

    license.identifier = Some(identifier.to_string());
    license.activated_at = Some(now);
    license.expires_at = Some(expires_at);
    if let Some(extra) = extra {
        license.extra.extend(extra);
    }

    if !queries::mark_activated(&tx, &license)? {
        return Err(AppError::LicenseAlreadyActive);
    }
    tx.commit()?;

    tracing::info!(
        license_id = %license.id,
        identifier,
        %expires_at,
        chained = chained_from.is_some(),
        superseded = ?superseded,
        "License activated"
    );

    Ok(Activation {
        license,
        chained_from,
        superseded,
    })
}

/// Check an activated license against the caller's identifier at `now`.
///
/// Checks run in a fixed order and stop at the first failure: activation,
/// then identifier, then expiry.
pub fn check_validity(license: &LicenseKey, identifier: &str, now: DateTime<Utc>) -> Result<()> {
    if license.activated_at.is_none() {
        return Err(AppError::LicenseNotActive);
    }
    if license.identifier.as_deref() != Some(identifier) {
        return Err(AppError::IdentifierMismatch);
    }
    if let Some(expires_at) = license.expires_at
        && expires_at < now
    {
        return Err(AppError::LicenseExpired);
    }
    Ok(())
}

/// Load the license with `value` and run [`check_validity`] on it.
pub fn validate(
    conn: &Connection,
    value: &str,
    identifier: &str,
    now: DateTime<Utc>,
) -> Result<LicenseKey> {
    let license = queries::get_license_key_by_value(conn, value)?.ok_or(AppError::LicenseNotFound)?;
    check_validity(&license, identifier, now)?;
    Ok(license)
}
