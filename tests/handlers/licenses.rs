//! License endpoint tests

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::*;

async fn create_plan(app: &axum::Router, alias: &str, duration: &str) -> Value {
    let (status, plan) = send(
        app,
        json_request("POST", "/plans", json!({"alias": alias, "duration": duration})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    plan
}

async fn create_license(app: &axum::Router, body: Value) -> Value {
    let (status, license) = send(app, json_request("POST", "/licenses", body)).await;
    assert_eq!(status, StatusCode::OK, "{license}");
    license
}

fn activate(value: &str, body: Value) -> axum::http::Request<axum::body::Body> {
    json_request("POST", &format!("/licenses/{}/activate", value), body)
}

fn validate(value: &str, identifier: &str) -> axum::http::Request<axum::body::Body> {
    json_request(
        "POST",
        &format!("/licenses/{}/validate", value),
        json!({"identifier": identifier}),
    )
}

#[tokio::test]
async fn test_create_license_requires_service_id() {
    let app = keysmith::app(create_test_app_state());

    for body in [json!({}), json!({"serviceId": ""}), json!({"serviceId": "   "})] {
        let (status, err) = send(&app, json_request("POST", "/licenses", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "MISSING_PARAMETERS");
    }
}

#[tokio::test]
async fn test_create_license_with_unknown_plan() {
    let app = keysmith::app(create_test_app_state());

    let (status, err) = send(
        &app,
        json_request("POST", "/licenses", json!({"serviceId": "svc", "plan": "gold"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "INVALID_PLAN");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = keysmith::app(create_test_app_state());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/licenses")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, err) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_issue_activate_validate_flow() {
    let app = keysmith::app(create_test_app_state());
    create_plan(&app, "monthly", "1 months").await;

    let license = create_license(&app, json!({"serviceId": "svc", "plan": "monthly"})).await;
    assert_eq!(license["status"], "issued");
    assert_eq!(license["serviceId"], "svc");
    assert_eq!(license["plan"]["alias"], "monthly");
    assert!(license["identifier"].is_null());
    assert!(license["expiresAt"].is_null());
    let value = license["value"].as_str().unwrap().to_string();

    let (status, err) = send(&app, validate(&value, "dev-1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "LICENSE_NOT_ACTIVE");

    let (status, active) = send(
        &app,
        activate(&value, json!({"identifier": "dev-1", "extra": {"seats": 3, "os": "linux"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["status"], "active");
    assert_eq!(active["identifier"], "dev-1");
    assert!(active["activatedAt"].is_string());
    assert!(active["expiresAt"].is_string());
    assert_eq!(active["extra"], json!({"os": "linux", "seats": 3}));

    let (status, err) = send(&app, activate(&value, json!({"identifier": "dev-2"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "LICENSE_ALREADY_ACTIVE");

    let (status, err) = send(&app, validate(&value, "dev-2")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "IDENTIFIER_MISMATCH");

    let (status, valid) = send(&app, validate(&value, "dev-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(valid["id"], license["id"]);
    assert_eq!(valid["status"], "active");
}

#[tokio::test]
async fn test_activation_errors() {
    let app = keysmith::app(create_test_app_state());
    let no_plan = create_license(&app, json!({"serviceId": "svc"})).await;
    let value = no_plan["value"].as_str().unwrap();

    let (status, err) = send(&app, activate(value, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "MISSING_PARAMETERS");

    let (status, err) = send(&app, activate("NOPE-NOPE", json!({"identifier": "dev-1"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "LICENSE_NOT_FOUND");

    let (status, err) = send(&app, activate(value, json!({"identifier": "dev-1"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "NO_PLAN_TO_LICENSE");

    let (status, err) = send(&app, validate("NOPE-NOPE", "dev-1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "LICENSE_NOT_FOUND");
}

#[tokio::test]
async fn test_plan_overflow_on_activation_is_server_error() {
    let app = keysmith::app(create_test_app_state());
    create_plan(&app, "forever", "4294967295 years").await;
    let license = create_license(&app, json!({"serviceId": "svc", "plan": "forever"})).await;
    let value = license["value"].as_str().unwrap();

    let (status, err) = send(&app, activate(value, json!({"identifier": "dev-1"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_chained_activation_over_http() {
    let app = keysmith::app(create_test_app_state());
    create_plan(&app, "monthly", "30 days").await;

    let first = create_license(&app, json!({"serviceId": "svc", "plan": "monthly"})).await;
    let second = create_license(&app, json!({"serviceId": "svc", "plan": "monthly"})).await;

    let first_value = first["value"].as_str().unwrap();
    let second_value = second["value"].as_str().unwrap();

    let (_, a) = send(&app, activate(first_value, json!({"identifier": "dev-1"}))).await;
    let (status, b) = send(&app, activate(second_value, json!({"identifier": "dev-1"}))).await;
    assert_eq!(status, StatusCode::OK);

    let a_expiry: chrono::DateTime<chrono::Utc> = a["expiresAt"].as_str().unwrap().parse().unwrap();
    let b_expiry: chrono::DateTime<chrono::Utc> = b["expiresAt"].as_str().unwrap().parse().unwrap();
    assert_eq!(b_expiry, a_expiry + chrono::TimeDelta::days(30));

    // The first license now ends where the second began
    let first_id = first["id"].as_str().unwrap();
    let (_, a) = send(&app, get_request(&format!("/licenses/{}", first_id))).await;
    assert_eq!(a["expiresAt"], b["activatedAt"]);
}

#[tokio::test]
async fn test_get_license_by_id_or_value() {
    let app = keysmith::app(create_test_app_state());
    let license = create_license(&app, json!({"serviceId": "svc"})).await;

    let id = license["id"].as_str().unwrap();
    let value = license["value"].as_str().unwrap();

    let (status, by_id) = send(&app, get_request(&format!("/licenses/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["value"], value);

    let (status, by_value) = send(&app, get_request(&format!("/licenses/{}", value))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_value["id"], id);

    let unknown = "/licenses/6f1c4c0e-5b0f-4f0a-9d55-0d2f7c3b1a11";
    let (status, err) = send(&app, get_request(unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "LICENSE_NOT_FOUND");
}

#[tokio::test]
async fn test_list_licenses() {
    let app = keysmith::app(create_test_app_state());
    create_plan(&app, "monthly", "30 days").await;

    for _ in 0..3 {
        create_license(&app, json!({"serviceId": "svc", "plan": "monthly"})).await;
    }
    let other = create_license(&app, json!({"serviceId": "other"})).await;

    let (status, page) = send(&app, get_request("/licenses?serviceId=svc&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (_, page) = send(&app, get_request("/licenses?serviceId=svc&limit=2&page=2")).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (_, page) = send(&app, get_request("/licenses?plan=monthly&status=issued")).await;
    assert_eq!(page["total"], 3);

    let (_, page) = send(&app, get_request("/licenses?plan=gold")).await;
    assert_eq!(page["total"], 0);

    let (_, page) = send(&app, get_request("/licenses?status=active")).await;
    assert_eq!(page["total"], 0);

    let (_, page) = send(&app, get_request("/licenses?serviceId=other&sort=createdAt")).await;
    assert_eq!(page["items"][0]["id"], other["id"]);

    let (status, err) = send(&app, get_request("/licenses?status=revoked")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "BAD_REQUEST");

    let (status, _) = send(&app, get_request("/licenses?sort=-value")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get_request("/licenses?limit=many")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
