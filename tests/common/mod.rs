//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use serde_json::Value;
use tower::ServiceExt;

pub use keysmith::db::{self, AppState, DbPool, queries};
pub use keysmith::keygen::{KeyGenerator, RandomKeyGenerator};
pub use keysmith::lifecycle;
pub use keysmith::models::*;

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn test_pool() -> DbPool {
    db::create_memory_pool().expect("in-memory pool")
}

pub fn create_test_app_state() -> AppState {
    AppState {
        db: test_pool(),
        keys: Arc::new(RandomKeyGenerator),
        key_generation_attempts: 5,
    }
}

pub fn create_test_plan(conn: &Connection, alias: &str, duration: &str) -> Plan {
    queries::create_plan(conn, Some(alias), duration.parse().unwrap(), at(2024, 1, 1))
        .expect("create plan")
}

/// Issue a license under `plan` at `created_at`.
pub fn issue_license(
    conn: &Connection,
    service_id: &str,
    plan: Option<&Plan>,
    created_at: DateTime<Utc>,
) -> LicenseKey {
    lifecycle::issue(
        conn,
        &RandomKeyGenerator,
        5,
        service_id,
        plan.map(|p| p.id.as_str()),
        created_at,
    )
    .expect("issue license")
}

pub fn reload(conn: &Connection, license: &LicenseKey) -> LicenseKey {
    queries::get_license_key_by_id(conn, &license.id)
        .unwrap()
        .expect("license exists")
}

/// Hands out a fixed sequence of values, then repeats the last one.
pub struct SequenceGenerator {
    values: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl SequenceGenerator {
    pub fn new(values: &[&str]) -> Self {
        Self {
            values: Mutex::new(values.iter().map(|v| v.to_string()).collect()),
            last: Mutex::new(values.last().copied().unwrap_or_default().to_string()),
        }
    }
}

impl KeyGenerator for SequenceGenerator {
    fn generate(&self, _service_id: &str) -> String {
        match self.values.lock().unwrap().pop_front() {
            Some(v) => v,
            None => self.last.lock().unwrap().clone(),
        }
    }
}

// ============ HTTP helpers ============

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("Response should be valid JSON")
    };
    (status, json)
}
